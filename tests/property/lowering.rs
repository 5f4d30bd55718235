//! Differential property tests: a lowered method body must be observably
//! equivalent to the unlowered one for every input, where "observable"
//! means the returned value, the trap taken, and the final heap.
//!
//! Each case builds the same method twice and two identically constructed
//! worlds, runs one body unlowered and one lowered, and compares outcomes.
//! Object references compare by allocation order, which the identical
//! construction makes stable.

use proptest::prelude::*;

use ceres::il::{KnownSymbol, MethodBuilder, NodeId};
use ceres::interp::{self, EvalError, Value, World};
use ceres::{Compilation, LoweringOpts};

fn acmp_method(negated: bool) -> (Compilation, NodeId, NodeId) {
    let mut b = MethodBuilder::new("Prop.acmp(LObj;LObj;)I");
    let x = b.parm("x");
    let y = b.parm("y");
    let sym = if negated {
        KnownSymbol::ObjectInequalityComparison
    } else {
        KnownSymbol::ObjectEqualityComparison
    };
    let cmp = b.call_known(sym, &[x, y]);
    b.ret(cmp);
    (b.finish(), x, y)
}

fn load_method() -> (Compilation, NodeId, NodeId) {
    let mut b = MethodBuilder::new("Prop.get([LObj;I)LObj;");
    let array = b.parm("a");
    let index = b.iparm("i");
    let load = b.call_known(KnownSymbol::LoadArrayElement, &[index, array]);
    b.ret(load);
    (b.finish(), array, index)
}

fn store_method() -> (Compilation, NodeId, NodeId, NodeId) {
    let mut b = MethodBuilder::new("Prop.set([LObj;ILObj;)V");
    let array = b.parm("a");
    let index = b.iparm("i");
    let value = b.parm("v");
    b.call_known(KnownSymbol::StoreArrayElement, &[value, index, array]);
    b.ret_void();
    (b.finish(), array, index, value)
}

/// Deterministic heap setup shared by the lowered and unlowered runs.
#[derive(Debug, Clone, Copy)]
struct ArrayScenario {
    len: usize,
    value_type: bool,
    /// Slot 0 holds an element of the component class when in bounds.
    fill_first: bool,
    null_array: bool,
    index: i64,
}

fn arb_array_scenario() -> impl Strategy<Value = ArrayScenario> {
    (0usize..4, any::<bool>(), any::<bool>(), prop::bool::weighted(0.2), -2i64..6).prop_map(
        |(len, value_type, fill_first, null_array, index)| ArrayScenario {
            len,
            value_type,
            fill_first,
            null_array,
            index,
        },
    )
}

fn build_array_world(s: ArrayScenario) -> (World, Value) {
    let mut world = World::new();
    let component = if s.value_type { world.add_value_class() } else { world.add_class(0) };
    let array_class = world.add_array_class(component);
    let array = world.new_array(array_class, s.len);
    if s.fill_first && s.len > 0 {
        let elem = world.new_object(component, vec![11]);
        world.set_element(array, 0, elem);
    }
    let arg = if s.null_array { Value::Null } else { array };
    (world, arg)
}

type Outcome = Result<Option<Value>, EvalError>;

fn outcomes_match(unlowered: &Outcome, lowered: &Outcome) -> bool {
    unlowered == lowered
}

proptest! {
    #[test]
    fn lowered_load_matches_unlowered(s in arb_array_scenario()) {
        let (base, array, index) = load_method();
        let (mut lowered, l_array, l_index) = load_method();
        prop_assert_eq!(ceres::perform(&mut lowered, &LoweringOpts::default()).unwrap(), 1);
        lowered.verify().unwrap();

        let (mut w1, arg1) = build_array_world(s);
        let (mut w2, arg2) = build_array_world(s);
        let r1 = interp::run(&base, &mut w1, &[(array, arg1), (index, Value::Int(s.index))]);
        let r2 = interp::run(&lowered, &mut w2, &[(l_array, arg2), (l_index, Value::Int(s.index))]);
        prop_assert!(outcomes_match(&r1, &r2), "unlowered {r1:?} lowered {r2:?}");

        // The fastpath only calls out for value-typed components.
        if !s.value_type {
            prop_assert_eq!(w2.helper_total(), 0);
        }
    }

    #[test]
    fn lowered_store_matches_unlowered(
        s in arb_array_scenario(),
        value_kind in 0u8..3,
    ) {
        let (base, array, index, value) = store_method();
        let (mut lowered, l_array, l_index, l_value) = store_method();
        prop_assert_eq!(ceres::perform(&mut lowered, &LoweringOpts::default()).unwrap(), 1);
        lowered.verify().unwrap();

        let (mut w1, arg1) = build_array_world(s);
        let (mut w2, arg2) = build_array_world(s);
        // 0: null, 1: instance of the component class (the world's first
        // class), 2: instance of an unrelated class.
        let make_value = |world: &mut World| match value_kind {
            0 => Value::Null,
            1 => world.new_object(interp::ClassId(0), vec![3]),
            _ => {
                let stranger = world.add_class(0);
                world.new_object(stranger, vec![3])
            }
        };
        let v1 = make_value(&mut w1);
        let v2 = make_value(&mut w2);

        let r1 = interp::run(
            &base,
            &mut w1,
            &[(array, arg1), (index, Value::Int(s.index)), (value, v1)],
        );
        let r2 = interp::run(
            &lowered,
            &mut w2,
            &[(l_array, arg2), (l_index, Value::Int(s.index)), (l_value, v2)],
        );
        prop_assert!(outcomes_match(&r1, &r2), "unlowered {r1:?} lowered {r2:?}");

        // Successful stores leave identical heaps.
        if r1.is_ok() && !s.null_array {
            for i in 0..s.len {
                prop_assert_eq!(w1.element(arg1, i), w2.element(arg2, i));
            }
        }
    }

    #[test]
    fn lowered_comparison_matches_unlowered(pair in 0u8..7, negated in any::<bool>()) {
        let (base, x, y) = acmp_method(negated);
        let (mut lowered, lx, ly) = acmp_method(negated);
        prop_assert_eq!(ceres::perform(&mut lowered, &LoweringOpts::default()).unwrap(), 1);
        lowered.verify().unwrap();

        let build = |world: &mut World| -> (Value, Value) {
            let plain = world.add_class(0);
            let vt = world.add_value_class();
            match pair {
                0 => {
                    let o = world.new_object(plain, vec![1]);
                    (o, o)
                }
                1 => (world.new_object(plain, vec![1]), world.new_object(plain, vec![1])),
                2 => (Value::Null, world.new_object(plain, vec![1])),
                3 => (world.new_object(vt, vec![2]), Value::Null),
                4 => (world.new_object(vt, vec![2]), world.new_object(vt, vec![2])),
                5 => (world.new_object(vt, vec![2]), world.new_object(vt, vec![3])),
                _ => (world.new_object(vt, vec![2]), world.new_object(plain, vec![2])),
            }
        };

        let mut w1 = World::new();
        let (a1, b1) = build(&mut w1);
        let mut w2 = World::new();
        let (a2, b2) = build(&mut w2);

        let r1 = interp::run(&base, &mut w1, &[(x, a1), (y, b1)]);
        let r2 = interp::run(&lowered, &mut w2, &[(lx, a2), (ly, b2)]);
        prop_assert!(outcomes_match(&r1, &r2), "unlowered {r1:?} lowered {r2:?}");
    }

    #[test]
    fn lowering_is_idempotent_for_random_toggles(
        acmp_fast in any::<bool>(),
        load_fast in any::<bool>(),
        store_fast in any::<bool>(),
        compressed in any::<bool>(),
    ) {
        let mut b = MethodBuilder::new("Prop.mixed(LObj;LObj;[LObj;ILObj;)I");
        let xp = b.parm("x");
        let yp = b.parm("y");
        let ap = b.parm("a");
        let ip = b.iparm("i");
        let vp = b.parm("v");
        let cmp = b.call_known(KnownSymbol::ObjectEqualityComparison, &[xp, yp]);
        let _ = b.call_known(KnownSymbol::LoadArrayElement, &[ip, ap]);
        b.call_known(KnownSymbol::StoreArrayElement, &[vp, ip, ap]);
        b.checked_element_store(ap, ip, vp);
        b.ret(cmp);
        let mut comp = b.finish();
        comp.uses_compressed_refs = compressed;

        let opts = LoweringOpts {
            enable_acmp_fastpath: acmp_fast,
            enable_load_fastpath: load_fast,
            enable_store_fastpath: store_fast,
            ..Default::default()
        };
        prop_assert_eq!(ceres::perform(&mut comp, &opts).unwrap(), 4);
        comp.verify().unwrap();

        let dump = ceres::pretty::dump(&comp);
        prop_assert_eq!(ceres::perform(&mut comp, &opts).unwrap(), 0);
        prop_assert_eq!(ceres::pretty::dump(&comp), dump);
    }
}
