//! Lowering of reference identity comparisons.

use ceres::interp::{self, Value};
use ceres::{pretty, LoweringOpts};

mod common;

#[test]
fn fastpath_builds_guard_chain_around_helper() {
    let (mut comp, _, _) = common::acmp_method(false);
    let applied = common::lower_default(&mut comp);
    assert_eq!(applied, 1);

    let dump = pretty::dump(&comp);
    // Three reference guards, the two class-flag guards, and the residual
    // call relocated out of line with a goto back to the merge point.
    assert_eq!(dump.matches("ifacmpeq").count(), 3, "{dump}");
    assert_eq!(dump.matches("ificmpeq").count(), 1, "{dump}");
    assert_eq!(dump.matches("ificmpne").count(), 1, "{dump}");
    assert!(dump.contains("acmpHelper"), "{dump}");
    assert!(dump.contains("goto"), "{dump}");
    assert!(dump.contains("(extension of previous block)"), "{dump}");

    assert_eq!(
        comp.counters.total_with_prefix("vt-helper/inlinecheck/acmp/"),
        1
    );
    assert!(!comp.cfg.structure_valid());
}

#[test]
fn identical_references_compare_equal_without_helper() {
    let (mut comp, x, y) = common::acmp_method(false);
    common::lower_default(&mut comp);

    let mut w = common::two_class_world();
    let o = w.world.new_object(w.plain, vec![7]);
    let r = interp::run(&comp, &mut w.world, &[(x, o), (y, o)]).unwrap();
    assert_eq!(r, Some(Value::Int(1)));
    assert_eq!(w.world.helper_total(), 0);
}

#[test]
fn null_operand_compares_unequal_without_helper() {
    let (mut comp, x, y) = common::acmp_method(false);
    common::lower_default(&mut comp);

    let mut w = common::two_class_world();
    let o = w.world.new_object(w.plain, vec![7]);
    let r = interp::run(&comp, &mut w.world, &[(x, Value::Null), (y, o)]).unwrap();
    assert_eq!(r, Some(Value::Int(0)));
    let r = interp::run(&comp, &mut w.world, &[(x, o), (y, Value::Null)]).unwrap();
    assert_eq!(r, Some(Value::Int(0)));
    assert_eq!(w.world.helper_total(), 0);
}

#[test]
fn distinct_identity_objects_skip_helper() {
    let (mut comp, x, y) = common::acmp_method(false);
    common::lower_default(&mut comp);

    let mut w = common::two_class_world();
    let a = w.world.new_object(w.plain, vec![1]);
    let b = w.world.new_object(w.plain, vec![1]);
    let r = interp::run(&comp, &mut w.world, &[(x, a), (y, b)]).unwrap();
    assert_eq!(r, Some(Value::Int(0)));
    assert_eq!(w.world.helper_total(), 0);
}

#[test]
fn value_and_identity_operands_skip_helper() {
    // lhs is a value-type instance but rhs is not; the second class-flag
    // guard proves the helper unnecessary.
    let (mut comp, x, y) = common::acmp_method(false);
    common::lower_default(&mut comp);

    let mut w = common::two_class_world();
    let v = w.world.new_object(w.value, vec![1]);
    let o = w.world.new_object(w.plain, vec![1]);
    let r = interp::run(&comp, &mut w.world, &[(x, v), (y, o)]).unwrap();
    assert_eq!(r, Some(Value::Int(0)));
    assert_eq!(w.world.helper_total(), 0);
}

#[test]
fn two_value_objects_reach_the_helper() {
    let (mut comp, x, y) = common::acmp_method(false);
    common::lower_default(&mut comp);

    let mut w = common::two_class_world();
    let a = w.world.new_object(w.value, vec![3, 4]);
    let b = w.world.new_object(w.value, vec![3, 4]);
    let r = interp::run(&comp, &mut w.world, &[(x, a), (y, b)]).unwrap();
    assert_eq!(r, Some(Value::Int(1)), "equal content compares equal");
    assert_eq!(w.world.helper_calls.get("acmpHelper"), Some(&1));

    let c = w.world.new_object(w.value, vec![3, 5]);
    let r = interp::run(&comp, &mut w.world, &[(x, a), (y, c)]).unwrap();
    assert_eq!(r, Some(Value::Int(0)), "different content compares unequal");
    assert_eq!(w.world.helper_calls.get("acmpHelper"), Some(&2));
}

#[test]
fn inequality_flips_every_result() {
    let (mut comp, x, y) = common::acmp_method(true);
    common::lower_default(&mut comp);

    let mut w = common::two_class_world();
    let o = w.world.new_object(w.plain, vec![1]);
    let p = w.world.new_object(w.plain, vec![1]);
    assert_eq!(
        interp::run(&comp, &mut w.world, &[(x, o), (y, o)]).unwrap(),
        Some(Value::Int(0))
    );
    assert_eq!(
        interp::run(&comp, &mut w.world, &[(x, o), (y, p)]).unwrap(),
        Some(Value::Int(1))
    );
    assert_eq!(
        interp::run(&comp, &mut w.world, &[(x, Value::Null), (y, o)]).unwrap(),
        Some(Value::Int(1))
    );
    assert_eq!(w.world.helper_total(), 0);

    let a = w.world.new_object(w.value, vec![9]);
    let b = w.world.new_object(w.value, vec![9]);
    assert_eq!(
        interp::run(&comp, &mut w.world, &[(x, a), (y, b)]).unwrap(),
        Some(Value::Int(0))
    );
    assert_eq!(w.world.helper_calls.get("acmpneHelper"), Some(&1));
}

#[test]
fn disabled_fastpath_substitutes_pointer_compare() {
    let (mut comp, x, y) = common::acmp_method(false);
    let blocks_before = comp.num_blocks();
    let opts = LoweringOpts { enable_acmp_fastpath: false, ..Default::default() };
    assert_eq!(common::lower(&mut comp, &opts), 1);

    // Pure opcode substitution: no helper call left, no new blocks.
    let dump = pretty::dump(&comp);
    assert!(dump.contains("acmpeq"), "{dump}");
    assert!(!dump.contains("call"), "{dump}");
    assert_eq!(comp.num_blocks(), blocks_before);
    // The operands are held only by their positions under the compare.
    assert_eq!(comp.node(x).ref_count(), 1);
    assert_eq!(comp.node(y).ref_count(), 1);

    let mut w = common::two_class_world();
    let o = w.world.new_object(w.plain, vec![1]);
    let p = w.world.new_object(w.plain, vec![1]);
    assert_eq!(
        interp::run(&comp, &mut w.world, &[(x, o), (y, o)]).unwrap(),
        Some(Value::Int(1))
    );
    assert_eq!(
        interp::run(&comp, &mut w.world, &[(x, o), (y, p)]).unwrap(),
        Some(Value::Int(0))
    );
    assert_eq!(w.world.helper_total(), 0);
}

#[test]
fn unlowered_body_always_calls_the_helper() {
    let (comp, x, y) = common::acmp_method(false);

    let mut w = common::two_class_world();
    let o = w.world.new_object(w.plain, vec![1]);
    let r = interp::run(&comp, &mut w.world, &[(x, o), (y, o)]).unwrap();
    assert_eq!(r, Some(Value::Int(1)));
    assert_eq!(w.world.helper_total(), 1);
}
