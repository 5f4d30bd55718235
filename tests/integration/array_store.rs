//! Lowering of array element stores.

use ceres::interp::{self, EvalError, Trap, Value};
use ceres::{pretty, LoweringOpts};

mod common;

fn no_fastpath() -> LoweringOpts {
    LoweringOpts { enable_store_fastpath: false, ..Default::default() }
}

#[test]
fn fold_recreates_call_as_checked_direct_store() {
    let (mut comp, _, _, _) = common::store_method(false);
    let blocks_before = comp.num_blocks();
    assert_eq!(common::lower(&mut comp, &no_fastpath()), 1);

    let dump = pretty::dump(&comp);
    assert!(dump.contains("astorei"), "{dump}");
    assert!(dump.contains("ArrayStoreCHK"), "{dump}");
    assert!(dump.contains("BNDCHK"), "{dump}");
    // One null check for the array, one for the possibly null value.
    assert_eq!(dump.matches("NULLCHK").count(), 2, "{dump}");
    assert!(!dump.contains("storeArrayElement"), "{dump}");
    assert_eq!(comp.num_blocks(), blocks_before);
    assert_eq!(
        comp.counters.total_with_prefix("vt-helper/inlinecheck/aastore/"),
        1
    );
}

#[test]
fn fold_writes_the_element() {
    let (mut comp, array, index, value) = common::store_method(true);
    common::lower(&mut comp, &no_fastpath());

    let mut aw = common::array_world(3, false);
    let elem = aw.world.new_object(aw.component, vec![8]);
    let arr = aw.array;
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(2)), (value, elem)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 2), Some(elem));
    assert_eq!(aw.world.helper_total(), 0);
}

#[test]
fn fastpath_splits_blocks_around_residual_call() {
    let (mut comp, _, _, _) = common::store_method(false);
    let blocks_before = comp.num_blocks();
    assert_eq!(common::lower_default(&mut comp), 1);

    let dump = pretty::dump(&comp);
    assert!(dump.contains("ificmpeq"), "{dump}");
    assert!(dump.contains("storeArrayElementHelper"), "{dump}");
    assert!(dump.contains("ArrayStoreCHK"), "{dump}");
    assert!(dump.contains("goto"), "{dump}");
    assert!(comp.num_blocks() > blocks_before);
}

#[test]
fn identity_component_stores_inline() {
    let (mut comp, array, index, value) = common::store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(3, false);
    let elem = aw.world.new_object(aw.component, vec![8]);
    let arr = aw.array;
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(0)), (value, elem)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 0), Some(elem));
    assert_eq!(aw.world.helper_total(), 0, "inline path must not call out");

    // Null stores into an identity array are legal.
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(0)), (value, Value::Null)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 0), Some(Value::Null));
    assert_eq!(aw.world.helper_total(), 0);
}

#[test]
fn inline_store_keeps_the_type_check() {
    let (mut comp, array, index, value) = common::store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(2, false);
    let stranger_class = aw.world.add_class(0);
    let stranger = aw.world.new_object(stranger_class, vec![0]);
    let arr = aw.array;
    let r = interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(0)), (value, stranger)],
    );
    assert_eq!(r, Err(EvalError::Trap(Trap::ArrayStore)));
}

#[test]
fn value_component_takes_the_helper() {
    let (mut comp, array, index, value) = common::store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(3, true);
    let elem = aw.world.new_object(aw.component, vec![8]);
    let arr = aw.array;
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(1)), (value, elem)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 1), Some(elem));
    assert_eq!(aw.world.helper_calls.get("storeArrayElementHelper"), Some(&1));
}

#[test]
fn null_into_value_array_traps_before_the_helper() {
    let (mut comp, array, index, value) = common::store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(3, true);
    let arr = aw.array;
    let r = interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(1)), (value, Value::Null)],
    );
    assert_eq!(r, Err(EvalError::Trap(Trap::NullPointer)));
    assert_eq!(aw.world.helper_total(), 0, "the null check runs ahead of the call");
}

#[test]
fn fastpath_keeps_trap_behavior() {
    let (mut comp, array, index, value) = common::store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(2, false);
    let elem = aw.world.new_object(aw.component, vec![0]);
    let arr = aw.array;
    let r = interp::run(
        &comp,
        &mut aw.world,
        &[(array, Value::Null), (index, Value::Int(0)), (value, elem)],
    );
    assert_eq!(r, Err(EvalError::Trap(Trap::NullPointer)));
    let r = interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(2)), (value, elem)],
    );
    assert_eq!(r, Err(EvalError::Trap(Trap::BoundCheck)));
}

#[test]
fn statically_non_null_value_needs_no_value_null_check() {
    let (mut comp, _, _, _) = common::store_method(true);
    common::lower_default(&mut comp);
    let dump = pretty::dump(&comp);
    // Only the array null check remains.
    assert_eq!(dump.matches("NULLCHK").count(), 1, "{dump}");
}

#[test]
fn promised_store_checks_skip_the_type_check() {
    let (mut comp, _, _, _) = common::store_method(false);
    comp.skip_store_checks = true;
    common::lower_default(&mut comp);
    let dump = pretty::dump(&comp);
    assert!(!dump.contains("ArrayStoreCHK"), "{dump}");
    assert!(dump.contains("astorei"), "{dump}");
}
