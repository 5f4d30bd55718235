//! Guarding of pre-existing array store check trees.

use ceres::interp::{self, EvalError, Trap, Value};
use ceres::{pretty, LoweringOpts};

mod common;

#[test]
fn check_gets_a_component_flag_guard() {
    let (mut comp, _, _, _) = common::checked_store_method(false);
    let blocks_before = comp.num_blocks();
    assert_eq!(common::lower_default(&mut comp), 1);

    let dump = pretty::dump(&comp);
    assert!(dump.contains("ificmpeq"), "{dump}");
    assert!(dump.contains("<arrayComponentType>"), "{dump}");
    assert!(dump.contains("NULLCHK"), "{dump}");
    assert!(dump.contains("(extension of previous block)"), "{dump}");
    assert!(comp.num_blocks() > blocks_before);
    assert_eq!(
        comp.counters.total_with_prefix("vt-helper/inlinecheck/arraystorechk/"),
        1
    );
}

#[test]
fn identity_array_stores_still_work() {
    let (mut comp, array, index, value) = common::checked_store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(3, false);
    let elem = aw.world.new_object(aw.component, vec![5]);
    let arr = aw.array;
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(1)), (value, elem)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 1), Some(elem));

    // Null into an identity array stays legal.
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(1)), (value, Value::Null)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 1), Some(Value::Null));
}

#[test]
fn wrong_class_still_traps_the_store_check() {
    let (mut comp, array, index, value) = common::checked_store_method(false);
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
fn null_into_value_array_traps() {
    // Without the guard a null slips through the generic store check; the
    // guarded null check rejects it for value-typed component classes.
    let (mut comp, array, index, value) = common::checked_store_method(false);
    common::lower_default(&mut comp);

    let mut aw = common::array_world(2, true);
    let arr = aw.array;
    let r = interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(0)), (value, Value::Null)],
    );
    assert_eq!(r, Err(EvalError::Trap(Trap::NullPointer)));

    // A proper value instance still stores.
    let elem = aw.world.new_object(aw.component, vec![1]);
    interp::run(
        &comp,
        &mut aw.world,
        &[(array, arr), (index, Value::Int(0)), (value, elem)],
    )
    .unwrap();
    assert_eq!(aw.world.element(arr, 0), Some(elem));
}

#[test]
fn statically_non_null_value_is_not_a_site() {
    let (mut comp, _, _, _) = common::checked_store_method(true);
    assert_eq!(common::lower_default(&mut comp), 0);
}

#[test]
fn promised_store_checks_are_not_sites() {
    let (mut comp, _, _, _) = common::checked_store_method(false);
    comp.skip_store_checks = true;
    assert_eq!(common::lower_default(&mut comp), 0);
}

#[test]
fn guarded_check_is_never_reoffered() {
    let (mut comp, _, _, _) = common::checked_store_method(false);
    assert_eq!(common::lower_default(&mut comp), 1);
    let dump = pretty::dump(&comp);
    assert_eq!(common::lower(&mut comp, &LoweringOpts::default()), 0);
    assert_eq!(pretty::dump(&comp), dump);
}
