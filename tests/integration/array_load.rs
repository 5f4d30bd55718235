//! Lowering of array element loads.

use ceres::interp::{self, EvalError, Trap, Value};
use ceres::{pretty, LoweringOpts};

mod common;

fn no_fastpath() -> LoweringOpts {
    LoweringOpts { enable_load_fastpath: false, ..Default::default() }
}

#[test]
fn fold_recreates_call_as_checked_direct_load() {
    let (mut comp, _, _) = common::load_method();
    let blocks_before = comp.num_blocks();
    assert_eq!(common::lower(&mut comp, &no_fastpath()), 1);

    let dump = pretty::dump(&comp);
    assert!(dump.contains("NULLCHK"), "{dump}");
    assert!(dump.contains("BNDCHK"), "{dump}");
    assert!(dump.contains("aloadi"), "{dump}");
    assert!(!dump.contains("loadArrayElement"), "{dump}");
    // Straight-line rewrite: the block structure is untouched.
    assert_eq!(comp.num_blocks(), blocks_before);
    assert_eq!(
        comp.counters.total_with_prefix("vt-helper/inlinecheck/aaload/"),
        1
    );
    // The fresh array shadow invalidates alias info.
    assert!(comp.alias_info_stale);
}

#[test]
fn fold_releases_the_call_argument_edges() {
    let (mut comp, array, index) = common::load_method();
    assert_eq!(comp.node(array).ref_count(), 1);
    assert_eq!(comp.node(index).ref_count(), 1);
    common::lower(&mut comp, &no_fastpath());

    // The recreated load dropped its direct argument edges; the operands are
    // now held only by the new trees (array by the null check's pass-through,
    // the array-length and the address add; index by the bound check and the
    // widening).
    assert_eq!(comp.node(array).ref_count(), 3);
    assert_eq!(comp.node(index).ref_count(), 2);
}

#[test]
fn fold_checks_null_before_bounds() {
    let (mut comp, array, index) = common::load_method();
    common::lower(&mut comp, &no_fastpath());

    let mut aw = common::array_world(2, false);
    let r = interp::run(&comp, &mut aw.world, &[(array, Value::Null), (index, Value::Int(5))]);
    assert_eq!(r, Err(EvalError::Trap(Trap::NullPointer)));

    let arr = aw.array;
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(5))]);
    assert_eq!(r, Err(EvalError::Trap(Trap::BoundCheck)));
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(-1))]);
    assert_eq!(r, Err(EvalError::Trap(Trap::BoundCheck)));
    assert_eq!(aw.world.helper_total(), 0);
}

#[test]
fn fold_reads_the_stored_element() {
    let (mut comp, array, index) = common::load_method();
    common::lower(&mut comp, &no_fastpath());

    let mut aw = common::array_world(3, false);
    let elem = aw.world.new_object(aw.component, vec![42]);
    aw.world.set_element(aw.array, 1, elem);
    let arr = aw.array;

    // Unfilled slot reads back null; the filled slot reads the element.
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(0))]).unwrap();
    assert_eq!(r, Some(Value::Null));
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(1))]).unwrap();
    assert_eq!(r, Some(elem));
    assert_eq!(aw.world.helper_total(), 0);
}

#[test]
fn promised_bounds_elide_the_bound_check() {
    let (mut comp, _, _) = common::load_method();
    comp.skip_bound_checks = true;
    common::lower(&mut comp, &no_fastpath());
    let dump = pretty::dump(&comp);
    assert!(!dump.contains("BNDCHK"), "{dump}");
    assert!(dump.contains("NULLCHK"), "{dump}");
}

#[test]
fn fastpath_splits_blocks_around_residual_call() {
    let (mut comp, _, _) = common::load_method();
    let blocks_before = comp.num_blocks();
    assert_eq!(common::lower_default(&mut comp), 1);

    let dump = pretty::dump(&comp);
    assert!(dump.contains("ificmpeq"), "{dump}");
    assert!(dump.contains("loadArrayElementHelper"), "{dump}");
    assert!(dump.contains("<arrayComponentType>"), "{dump}");
    assert!(dump.contains("goto"), "{dump}");
    assert!(comp.num_blocks() > blocks_before);
}

#[test]
fn identity_component_loads_inline() {
    let (mut comp, array, index) = common::load_method();
    common::lower_default(&mut comp);

    let mut aw = common::array_world(3, false);
    let elem = aw.world.new_object(aw.component, vec![1]);
    aw.world.set_element(aw.array, 2, elem);
    let arr = aw.array;
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(2))]).unwrap();
    assert_eq!(r, Some(elem));
    assert_eq!(aw.world.helper_total(), 0, "inline path must not call out");
}

#[test]
fn value_component_takes_the_helper() {
    let (mut comp, array, index) = common::load_method();
    common::lower_default(&mut comp);

    let mut aw = common::array_world(3, true);
    let elem = aw.world.new_object(aw.component, vec![1]);
    aw.world.set_element(aw.array, 0, elem);
    let arr = aw.array;
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(0))]).unwrap();
    assert_eq!(r, Some(elem));
    assert_eq!(aw.world.helper_calls.get("loadArrayElementHelper"), Some(&1));
}

#[test]
fn fastpath_keeps_trap_behavior() {
    let (mut comp, array, index) = common::load_method();
    common::lower_default(&mut comp);

    let mut aw = common::array_world(2, false);
    let arr = aw.array;
    let r = interp::run(&comp, &mut aw.world, &[(array, Value::Null), (index, Value::Int(0))]);
    assert_eq!(r, Err(EvalError::Trap(Trap::NullPointer)));
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(2))]);
    assert_eq!(r, Err(EvalError::Trap(Trap::BoundCheck)));

    // Out of bounds on a value-typed array traps on the helper path.
    let mut vw = common::array_world(2, true);
    let varr = vw.array;
    let r = interp::run(&comp, &mut vw.world, &[(array, varr), (index, Value::Int(9))]);
    assert_eq!(r, Err(EvalError::Trap(Trap::BoundCheck)));
}

#[test]
fn compressed_references_get_an_anchor() {
    let (mut comp, array, index) = common::load_method();
    comp.uses_compressed_refs = true;
    common::lower_default(&mut comp);
    let dump = pretty::dump(&comp);
    assert!(dump.contains("compressedRefs"), "{dump}");
    assert!(dump.contains("(stride 4)"), "{dump}");

    let mut aw = common::array_world(2, false);
    let elem = aw.world.new_object(aw.component, vec![5]);
    aw.world.set_element(aw.array, 1, elem);
    let arr = aw.array;
    let r = interp::run(&comp, &mut aw.world, &[(array, arr), (index, Value::Int(1))]).unwrap();
    assert_eq!(r, Some(elem));
}
