//! Straight-line lowering: the zero-guard rendition used when the guarded
//! fastpath for an operation kind is turned off.
//!
//! The call node is recreated in place as the direct indirect load or store
//! so every position commoning it observes the new operation; the required
//! checks become prefix treetops and no block boundary moves.

use tracing::debug;

use crate::compilation::Compilation;
use crate::diagnostics::LowerError;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;
use crate::il::symref::KnownSymbol;
use crate::il::treetop::TreeTopId;
use crate::lower::classify::LoweringRequest;

/// Turns an identity-comparison call into the pointer-compare opcode. Pure
/// opcode substitution, no structural change.
pub(crate) fn substitute_compare(comp: &mut Compilation, req: &LoweringRequest, negated: bool) {
    let call = req.node;
    let lhs = comp.node(call).child(0);
    let rhs = comp.node(call).child(1);
    let op = if negated { Opcode::ACmpNe } else { Opcode::ACmpEq };
    debug!(node = comp.node(call).global_index, "recreating comparison call as {}", op.name());
    comp.recreate(call, op, &[lhs, rhs], None);
}

pub(crate) fn fold_array_load(
    comp: &mut Compilation,
    req: &LoweringRequest,
) -> Result<(), LowerError> {
    reject_spine_checks(comp, req.node)?;
    let call = req.node;
    let index = comp.node(call).child(0);
    let array = comp.node(call).child(1);

    emit_check_prefix(comp, req.tt, array, index, req.requires_bound_check, call);

    let addr = comp.calculate_element_address(array, index);
    let shadow = comp.create_array_shadow();
    comp.recreate(call, Opcode::ALoadIndirect, &[addr], Some(shadow));
    debug!(node = comp.node(call).global_index, "recreated element load in place");

    if comp.uses_compressed_refs {
        let anchor = comp.create(Opcode::CompressedRefsAnchor, &[call]);
        comp.copy_byte_code_info(call, anchor);
        comp.create_treetop_after(req.tt, anchor);
    }
    Ok(())
}

pub(crate) fn fold_array_store(
    comp: &mut Compilation,
    req: &LoweringRequest,
) -> Result<(), LowerError> {
    reject_spine_checks(comp, req.node)?;
    let call = req.node;
    let value = comp.node(call).child(0);
    let index = comp.node(call).child(1);
    let array = comp.node(call).child(2);

    emit_check_prefix(comp, req.tt, array, index, req.requires_bound_check, call);

    if req.requires_null_check {
        let pass = comp.create(Opcode::PassThrough, &[value]);
        let sr = comp.symrefs.known(KnownSymbol::NullCheck);
        let chk = comp.create_with_symref(Opcode::NullChk, &[pass], sr);
        comp.copy_byte_code_info(call, chk);
        comp.create_treetop_before(req.tt, chk);
    }

    let addr = comp.calculate_element_address(array, index);
    let shadow = comp.create_array_shadow();
    comp.recreate(call, Opcode::AStoreIndirect, &[addr, value, array], Some(shadow));
    debug!(node = comp.node(call).global_index, "recreated element store in place");

    if req.requires_store_check {
        // The treetop anchor becomes the check so the store stays rooted in
        // the same list position.
        let root = comp.tt_node(req.tt);
        let sr = comp.symrefs.known(KnownSymbol::TypeCheckArrayStore);
        comp.recreate(root, Opcode::ArrayStoreChk, &[call], Some(sr));
        comp.node_mut(root).guarded = true;
        comp.copy_byte_code_info(call, root);
    }

    if comp.uses_compressed_refs {
        let anchor = comp.create(Opcode::CompressedRefsAnchor, &[call]);
        comp.copy_byte_code_info(call, anchor);
        comp.create_treetop_after(req.tt, anchor);
    }
    Ok(())
}

/// Array shapes that need discontiguous-spine checks are outside what this
/// engine can lower; hitting one is a bug in the surrounding configuration.
pub(crate) fn reject_spine_checks(comp: &Compilation, site: NodeId) -> Result<(), LowerError> {
    if comp.needs_spine_checks {
        Err(LowerError::inconsistency_at(
            "array access lowering cannot emit spine checks".to_string(),
            site.0,
        ))
    } else {
        Ok(())
    }
}

/// `NULLCHK` on the array, then the bound check, immediately before `tt`.
fn emit_check_prefix(
    comp: &mut Compilation,
    tt: TreeTopId,
    array: NodeId,
    index: NodeId,
    bound_check: bool,
    site: NodeId,
) {
    let pass = comp.create(Opcode::PassThrough, &[array]);
    let null_sr = comp.symrefs.known(KnownSymbol::NullCheck);
    let nullchk = comp.create_with_symref(Opcode::NullChk, &[pass], null_sr);
    comp.copy_byte_code_info(site, nullchk);
    comp.create_treetop_before(tt, nullchk);

    if bound_check {
        let len = comp.create(Opcode::ArrayLength, &[array]);
        comp.node_mut(len).value = comp.element_stride();
        let sr = comp.symrefs.known(KnownSymbol::BoundCheck);
        let chk = comp.create_with_symref(Opcode::BndChk, &[len, index], sr);
        comp.copy_byte_code_info(site, chk);
        comp.create_treetop_before(tt, chk);
    }
}
