//! Guarded fastpath lowering.
//!
//! Each transformation here splits the block around a recognized helper
//! call, inserts a chain of guards that prove the inline path legal at run
//! time, isolates the residual call, and reconverges every path on a single
//! merge block. Register-dependency lists are reconciled on every new edge
//! so the allocator's merge contract holds: same arity, same registers, with
//! only the result slot substituted per path.

use tracing::debug;

use crate::compilation::Compilation;
use crate::diagnostics::LowerError;
use crate::il::block::BlockId;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;
use crate::il::symref::KnownSymbol;
use crate::il::treetop::TreeTopId;
use crate::il::VALUE_TYPE_CLASS_FLAG;
use crate::lower::classify::LoweringRequest;
use crate::lower::regdeps;
use crate::lower::rewrite::reject_spine_checks;

// ---- shared machinery ----

/// Splits `block` at `split_point` for a fastpath guard: the new block is an
/// extension of `block` (the guard is not a real control-flow entry for it),
/// and `block` gets the guard's taken edge to `target`.
fn split_for_fastpath(
    comp: &mut Compilation,
    block: BlockId,
    split_point: TreeTopId,
    target: BlockId,
) -> BlockId {
    let nb = comp.split(block, split_point);
    comp.block_mut(nb).is_extension = true;
    comp.cfg.add_edge(block, target);
    nb
}

/// Moves the call's treetop to the end of `block`, along with any stores of
/// the call's result that un-commoning appended after it, so a later split
/// at the call isolates exactly the call and its result stores.
fn move_node_to_end_of_block(
    comp: &mut Compilation,
    block: BlockId,
    tt: TreeTopId,
    node: NodeId,
) {
    let exit = comp.block(block).exit;
    let mut iter = comp.next_tt(tt);
    if iter == Some(exit) {
        return;
    }
    debug!(
        node = comp.node(node).global_index,
        "moving helper call treetop to the end of block_{}", comp.block(block).number
    );
    comp.unlink(tt);
    let mut chain = vec![tt];
    while let Some(cur) = iter {
        if cur == exit {
            break;
        }
        let next = comp.next_tt(cur);
        let root = comp.tt_node(cur);
        let op = comp.node(root).op;
        let is_store = op.is_reg_store() || matches!(op, Opcode::IStore | Opcode::AStore);
        if is_store && comp.node(root).num_children() > 0 && comp.node(root).child(0) == node {
            comp.unlink(cur);
            chain.push(cur);
        }
        iter = next;
    }
    for t in chain {
        comp.insert_before(exit, t);
    }
}

/// Anchors `node` under its own treetop inserted before `at`.
fn anchor_before(comp: &mut Compilation, at: TreeTopId, node: NodeId) -> TreeTopId {
    let anchor = comp.create(Opcode::TreeTop, &[node]);
    comp.create_treetop_before(at, anchor)
}

/// The value under an anchor treetop, possibly rewritten by un-commoning.
fn anchored_value(comp: &Compilation, anchor_tt: TreeTopId) -> NodeId {
    comp.node(comp.tt_node(anchor_tt)).child(0)
}

/// Builds `iand(iloadi <classFlags>, iconst flag)` reaching the class flags
/// through the object's type pointer, optionally indirecting through the
/// array component type first.
fn class_flags_test(
    comp: &mut Compilation,
    site: NodeId,
    object: NodeId,
    via_component_type: bool,
) -> NodeId {
    let vft_sr = comp.symrefs.known(KnownSymbol::Vft);
    let vft = comp.create_with_symref(Opcode::ALoadIndirect, &[object], vft_sr);
    comp.copy_byte_code_info(site, vft);
    let cls = if via_component_type {
        let comp_sr = comp.symrefs.known(KnownSymbol::ArrayComponentType);
        let c = comp.create_with_symref(Opcode::ALoadIndirect, &[vft], comp_sr);
        comp.copy_byte_code_info(site, c);
        c
    } else {
        vft
    };
    let flags_sr = comp.symrefs.known(KnownSymbol::ClassFlags);
    let flags = comp.create_with_symref(Opcode::ILoadIndirect, &[cls], flags_sr);
    comp.copy_byte_code_info(site, flags);
    let mask = comp.iconst(VALUE_TYPE_CLASS_FLAG);
    let test = comp.create(Opcode::IAnd, &[flags, mask]);
    comp.copy_byte_code_info(site, test);
    test
}

/// Copies `source` (a `GlRegDeps`) onto `branch` with an optional
/// substitution, returning the new list so it can serve as the reference for
/// the next guard in the chain.
fn attach_branch_deps(
    comp: &mut Compilation,
    branch: NodeId,
    source: Option<NodeId>,
    substitute: Option<NodeId>,
) -> Option<NodeId> {
    let src = source?;
    Some(regdeps::copy_branch_regdeps_and_substitute(comp, branch, src, substitute))
}

// ---- identity comparison ----

/// Lowers an identity-comparison helper call into a guard chain.
///
/// Guards, in order: identical references (result is known), lhs null, rhs
/// null (two distinct references where either is null cannot be the same
/// value), lhs not a value type, rhs a value type. Only when both operands
/// are non-null value-type instances does control reach the residual helper
/// call, relocated out of line at the end of the method with a goto back to
/// the merge block.
pub(crate) fn fastpath_acmp(
    comp: &mut Compilation,
    req: &LoweringRequest,
    negated: bool,
) -> Result<(), LowerError> {
    let node = req.node;
    let tt = req.tt;
    comp.cfg.invalidate_structure();

    // Anchor the call after the split point so the result lands in a
    // register or temp, and the operands before it so their values stay
    // live into every guard.
    let call_anchor = comp.create(Opcode::TreeTop, &[node]);
    let anchored_call_tt = comp.create_treetop_after(tt, call_anchor);
    let lhs = comp.node(node).child(0);
    let rhs = comp.node(node).child(1);
    let lhs_anchor_tt = anchor_before(comp, tt, lhs);
    let rhs_anchor_tt = anchor_before(comp, tt, rhs);

    let mut call_block = comp.enclosing_block(tt)?;
    let target_block = comp.split_post_gra(call_block, anchored_call_tt)?;
    let target_entry = comp.block(target_block).entry;
    debug!(
        node = comp.node(node).global_index,
        "split block_{} for comparison; merge is block_{}",
        comp.block(call_block).number,
        comp.block(target_block).number
    );

    move_node_to_end_of_block(comp, call_block, tt, node);

    let anchored = anchored_value(comp, anchored_call_tt);
    let mut exit_deps = comp.block_exit_deps(call_block);

    // Result constants: the identity guard proves "equal", the null guards
    // prove "not equal"; inequality flips both.
    let (identity_result, null_result) = if negated { (0, 1) } else { (1, 0) };

    // Guard 1: identical references.
    let const_identity = comp.iconst(identity_result);
    let store_identity =
        regdeps::create_store_node_for_anchored_node(comp, anchored, const_identity)?;
    comp.create_treetop_before(tt, store_identity);
    let dep_identity = if exit_deps.is_some() && comp.node(store_identity).op.is_reg_store() {
        let d = comp.create(Opcode::PassThrough, &[const_identity]);
        comp.node_mut(d).reg = comp.node(store_identity).reg;
        Some(d)
    } else {
        None
    };
    let anchored_lhs = anchored_value(comp, lhs_anchor_tt);
    let anchored_rhs = anchored_value(comp, rhs_anchor_tt);
    let g_identity = comp.create_if(Opcode::IfAcmpEq, anchored_lhs, anchored_rhs, Some(target_entry));
    comp.copy_byte_code_info(node, g_identity);
    exit_deps = attach_branch_deps(comp, g_identity, exit_deps, dep_identity).or(exit_deps);
    comp.create_treetop_before(tt, g_identity);
    call_block = split_for_fastpath(comp, call_block, tt, target_block);

    // Guard 2: lhs null. Restate the result constant first.
    let const_null = comp.iconst(null_result);
    let store_null = regdeps::create_store_node_for_anchored_node(comp, anchored, const_null)?;
    comp.create_treetop_before(tt, store_null);
    let dep_null = if exit_deps.is_some() && comp.node(store_null).op.is_reg_store() {
        let d = comp.create(Opcode::PassThrough, &[const_null]);
        comp.node_mut(d).reg = comp.node(store_null).reg;
        Some(d)
    } else {
        None
    };
    let null_ref = comp.aconst(0);
    let g_lhs_null = comp.create_if(Opcode::IfAcmpEq, anchored_lhs, null_ref, Some(target_entry));
    comp.copy_byte_code_info(node, g_lhs_null);
    exit_deps = attach_branch_deps(comp, g_lhs_null, exit_deps, dep_null).or(exit_deps);
    comp.create_treetop_before(tt, g_lhs_null);
    call_block = split_for_fastpath(comp, call_block, tt, target_block);

    // Guard 3: rhs null. The substitution already happened, so a plain copy.
    let g_rhs_null = comp.create_if(Opcode::IfAcmpEq, anchored_rhs, null_ref, Some(target_entry));
    comp.copy_byte_code_info(node, g_rhs_null);
    exit_deps = attach_branch_deps(comp, g_rhs_null, exit_deps, None).or(exit_deps);
    comp.create_treetop_before(tt, g_rhs_null);
    call_block = split_for_fastpath(comp, call_block, tt, target_block);

    // Guard 4: lhs is not a value type, so distinct references suffice.
    let flag_zero = if null_result == 0 { const_null } else { comp.iconst(0) };
    let lhs_test = class_flags_test(comp, node, anchored_lhs, false);
    let g_lhs_vt = comp.create_if(Opcode::IfIcmpEq, lhs_test, flag_zero, Some(target_entry));
    comp.copy_byte_code_info(node, g_lhs_vt);
    attach_branch_deps(comp, g_lhs_vt, exit_deps, None);
    comp.create_treetop_before(tt, g_lhs_vt);
    call_block = split_for_fastpath(comp, call_block, tt, target_block);

    // Isolate the call in its own block. Not an extension: everything must
    // be un-commoned so the block can move.
    let prev_block = call_block;
    let helper_block = comp.split_post_gra(call_block, tt)?;
    comp.relocate_block_to_end(helper_block);
    comp.cfg.add_edge(prev_block, target_block);
    debug!(
        "moved residual comparison call block_{} out of line",
        comp.block(helper_block).number
    );

    // Guard 5: rhs is a value type means the helper must run. Fallthrough
    // and target are swapped relative to the other guards, so the register
    // dependencies swap too: the branch takes the block's current exit list
    // and the exit gets a fresh copy.
    let rhs_test = class_flags_test(comp, node, anchored_rhs, false);
    let helper_entry = comp.block(helper_block).entry;
    let g_rhs_vt = comp.create_if(Opcode::IfIcmpNe, rhs_test, flag_zero, Some(helper_entry));
    comp.copy_byte_code_info(node, g_rhs_vt);
    let prev_exit_node = comp.tt_node(comp.block(prev_block).exit);
    if comp.node(prev_exit_node).num_children() > 0 {
        let exit_list = comp.node(prev_exit_node).child(0);
        comp.push_child(g_rhs_vt, exit_list);
        if let Some(src) = exit_deps {
            let fresh = comp.create(Opcode::GlRegDeps, &[]);
            regdeps::copy_exit_regdeps_and_substitute(comp, fresh, src, None);
            comp.set_child(prev_exit_node, 0, fresh);
        }
    }
    comp.append_to_block(prev_block, g_rhs_vt);
    // The edge from prev_block to the call block predates the move, so no
    // new edge is needed here.

    // Goto from the out-of-line call back to the merge block, carrying the
    // dependencies the split left on the call block's exit.
    let goto = comp.create(Opcode::Goto, &[]);
    comp.set_branch_destination(goto, target_entry);
    comp.copy_byte_code_info(node, goto);
    let helper_exit_node = comp.tt_node(comp.block(helper_block).exit);
    if comp.node(helper_exit_node).num_children() > 0 {
        let deps = comp.node(helper_exit_node).child(0);
        comp.push_child(goto, deps);
        comp.remove_child(helper_exit_node, 0);
    }
    comp.append_to_block(helper_block, goto);

    Ok(())
}

// ---- array element load ----

pub(crate) fn fastpath_array_load(
    comp: &mut Compilation,
    req: &LoweringRequest,
) -> Result<(), LowerError> {
    reject_spine_checks(comp, req.node)?;
    let node = req.node;
    let tt = req.tt;
    comp.cfg.invalidate_structure();
    let original_block = comp.enclosing_block(tt)?;

    let index = comp.node(node).child(0);
    let array = comp.node(node).child(1);

    // 1. Anchor the call after the split point and the operands before it.
    let call_anchor = comp.create(Opcode::TreeTop, &[node]);
    let anchored_call_tt = comp.create_treetop_after(tt, call_anchor);
    let index_anchor_tt = anchor_before(comp, tt, index);
    let array_anchor = comp.create(Opcode::TreeTop, &[array]);
    comp.create_treetop_after(index_anchor_tt, array_anchor);

    // 2. Build the inline element load and its checks between the call and
    // the call anchor.
    let addr = comp.calculate_element_address(array, index);
    let shadow = comp.create_array_shadow();
    let inline_load = comp.create_with_symref(Opcode::ALoadIndirect, &[addr], shadow);
    comp.copy_byte_code_info(node, inline_load);

    let pass = comp.create(Opcode::PassThrough, &[array]);
    let null_sr = comp.symrefs.known(KnownSymbol::NullCheck);
    let nullchk = comp.create_with_symref(Opcode::NullChk, &[pass], null_sr);
    comp.copy_byte_code_info(node, nullchk);
    comp.create_treetop_before(anchored_call_tt, nullchk);

    if req.requires_bound_check {
        let len = comp.create(Opcode::ArrayLength, &[array]);
        comp.node_mut(len).value = comp.element_stride();
        let bnd_sr = comp.symrefs.known(KnownSymbol::BoundCheck);
        let bndchk = comp.create_with_symref(Opcode::BndChk, &[len, index], bnd_sr);
        comp.copy_byte_code_info(node, bndchk);
        comp.create_treetop_before(anchored_call_tt, bndchk);
    }

    let load_anchor = if comp.uses_compressed_refs {
        comp.create(Opcode::CompressedRefsAnchor, &[inline_load])
    } else {
        comp.create(Opcode::TreeTop, &[inline_load])
    };
    comp.copy_byte_code_info(node, load_anchor);
    comp.create_treetop_before(anchored_call_tt, load_anchor);

    // 3. Split after the call; the checks and inline load end up in the
    // block every path reconverges through.
    let split_at = comp
        .next_tt(tt)
        .ok_or_else(|| LowerError::inconsistency("call treetop at the end of the method"))?;
    let block_after_helper = comp.split_post_gra(original_block, split_at)?;
    debug!(
        node = comp.node(node).global_index,
        "inline element load isolated in block_{}",
        comp.block(block_after_helper).number
    );

    // 4. Gather the call and the stores of its result at the block end.
    move_node_to_end_of_block(comp, original_block, tt, node);

    // 5. Isolate the residual call as an extension block.
    let helper_block = comp.split(original_block, tt);
    comp.block_mut(helper_block).is_extension = true;

    // 6. On the inline path the result slot first gets a null placeholder;
    // the guard below branches over the helper, and the inline load then
    // overwrites it.
    let anchored = anchored_value(comp, anchored_call_tt);
    let placeholder = comp.aconst(0);
    let store_placeholder =
        regdeps::create_store_node_for_anchored_node(comp, anchored, placeholder)?;
    comp.append_to_block(original_block, store_placeholder);

    // 7. Guard on the array's component-type class flags.
    let test = class_flags_test(comp, node, array, true);
    let zero = comp.iconst(0);
    let guard = comp.create_if(Opcode::IfIcmpEq, test, zero, None);
    comp.copy_byte_code_info(node, guard);
    copy_deps_based_on_anchored_node(comp, helper_block, guard, anchored, store_placeholder);
    comp.append_to_block(original_block, guard);

    // 8. Store the inline load's result into the same slot and split it
    // apart from the call anchor.
    let store_inline = regdeps::create_store_node_for_anchored_node(comp, anchored, inline_load)?;
    comp.create_treetop_before(anchored_call_tt, store_inline);
    let block_after_load = comp.split_post_gra(block_after_helper, anchored_call_tt)?;

    // 9. Wire the edges.
    let inline_entry = comp.block(block_after_helper).entry;
    comp.set_branch_destination(guard, inline_entry);

    let goto = comp.create(Opcode::Goto, &[]);
    let merge_entry = comp.block(block_after_load).entry;
    comp.set_branch_destination(goto, merge_entry);
    comp.copy_byte_code_info(node, goto);
    let helper_exit_node = comp.tt_node(comp.block(helper_block).exit);
    regdeps::copy_register_dependency_list(comp, helper_exit_node, goto);
    comp.append_to_block(helper_block, goto);

    comp.cfg.add_edge(original_block, block_after_helper);
    comp.cfg.remove_edge(helper_block, block_after_helper);
    comp.cfg.add_edge(helper_block, block_after_load);
    Ok(())
}

/// Builds the guard's dependency list from the helper block's exit list,
/// replacing the entry for the result register with a pass-through of the
/// placeholder the inline path just stored.
fn copy_deps_based_on_anchored_node(
    comp: &mut Compilation,
    from_block: BlockId,
    to_node: NodeId,
    anchored: NodeId,
    store: NodeId,
) {
    let from_exit = comp.tt_node(comp.block(from_block).exit);
    if comp.node(from_exit).num_children() == 0 {
        return;
    }
    let deps = comp.create(Opcode::GlRegDeps, &[]);
    let mut result_reg = None;
    if comp.node(anchored).op.is_reg_load() {
        let d = comp.create(Opcode::PassThrough, &[comp.node(store).child(0)]);
        comp.node_mut(d).reg = comp.node(store).reg;
        result_reg = comp.node(store).reg;
        comp.push_child(deps, d);
    }
    let source = comp.node(from_exit).child(0);
    let entries: Vec<NodeId> = comp.node(source).children().to_vec();
    for dep in entries {
        if result_reg.is_some() && comp.node(dep).reg == result_reg {
            continue;
        }
        let copied = regdeps::copy_register_dependency(comp, dep);
        comp.push_child(deps, copied);
    }
    comp.push_child(to_node, deps);
}

// ---- array element store ----

pub(crate) fn fastpath_array_store(
    comp: &mut Compilation,
    req: &LoweringRequest,
) -> Result<(), LowerError> {
    reject_spine_checks(comp, req.node)?;
    let node = req.node;
    let tt = req.tt;
    comp.cfg.invalidate_structure();
    let original_block = comp.enclosing_block(tt)?;

    let value = comp.node(node).child(0);
    let index = comp.node(node).child(1);
    let array = comp.node(node).child(2);

    // 1. Anchor the operands before the call.
    let array_anchor_tt = anchor_before(comp, tt, array);
    let index_anchor = comp.create(Opcode::TreeTop, &[index]);
    let index_anchor_tt = comp.create_treetop_after(array_anchor_tt, index_anchor);
    let value_anchor = comp.create(Opcode::TreeTop, &[value]);
    comp.create_treetop_after(index_anchor_tt, value_anchor);

    // 2. Build the inline checked store after the call.
    let tt_after = comp
        .next_tt(tt)
        .ok_or_else(|| LowerError::inconsistency("call treetop at the end of the method"))?;

    let pass = comp.create(Opcode::PassThrough, &[array]);
    let null_sr = comp.symrefs.known(KnownSymbol::NullCheck);
    let nullchk = comp.create_with_symref(Opcode::NullChk, &[pass], null_sr);
    comp.copy_byte_code_info(node, nullchk);
    comp.create_treetop_before(tt_after, nullchk);

    if req.requires_bound_check {
        let len = comp.create(Opcode::ArrayLength, &[array]);
        comp.node_mut(len).value = comp.element_stride();
        let bnd_sr = comp.symrefs.known(KnownSymbol::BoundCheck);
        let bndchk = comp.create_with_symref(Opcode::BndChk, &[len, index], bnd_sr);
        comp.copy_byte_code_info(node, bndchk);
        comp.create_treetop_before(tt_after, bndchk);
    }

    let addr = comp.calculate_element_address(array, index);
    let shadow = comp.create_array_shadow();
    let inline_store =
        comp.create_with_symref(Opcode::AStoreIndirect, &[addr, value, array], shadow);
    comp.copy_byte_code_info(node, inline_store);
    let inline_root = if req.requires_store_check {
        let chk_sr = comp.symrefs.known(KnownSymbol::TypeCheckArrayStore);
        let chk = comp.create_with_symref(Opcode::ArrayStoreChk, &[inline_store], chk_sr);
        comp.node_mut(chk).guarded = true;
        comp.copy_byte_code_info(node, chk);
        chk
    } else {
        inline_store
    };
    let mut last_inline_tt = comp.create_treetop_before(tt_after, inline_root);
    if comp.uses_compressed_refs {
        let anchor = comp.create(Opcode::CompressedRefsAnchor, &[inline_store]);
        comp.copy_byte_code_info(node, anchor);
        last_inline_tt = comp.create_treetop_before(tt_after, anchor);
    }

    // 3. Split after the call.
    let split_at = comp
        .next_tt(tt)
        .ok_or_else(|| LowerError::inconsistency("call treetop at the end of the method"))?;
    let block_after_helper = comp.split_post_gra(original_block, split_at)?;
    debug!(
        node = comp.node(node).global_index,
        "inline element store isolated in block_{}",
        comp.block(block_after_helper).number
    );

    // 4. Move the call to the block end, past any un-commoning stores.
    let exit = comp.block(original_block).exit;
    if comp.next_tt(tt) != Some(exit) {
        comp.unlink(tt);
        comp.insert_before(exit, tt);
    }

    // 5. A null value is rejected on the helper path before the call runs,
    // since null cannot be stored into a value-typed array.
    let mut tt_for_helper = tt;
    if req.requires_null_check {
        let value_pass = comp.create(Opcode::PassThrough, &[value]);
        let chk = comp.create_with_symref(Opcode::NullChk, &[value_pass], null_sr);
        comp.copy_byte_code_info(node, chk);
        tt_for_helper = comp.create_treetop_before(tt, chk);
    }
    let helper_block = comp.split(original_block, tt_for_helper);
    comp.block_mut(helper_block).is_extension = true;

    // 6. Guard on the array's component-type class flags.
    let test = class_flags_test(comp, node, array, true);
    let zero = comp.iconst(0);
    let guard = comp.create_if(Opcode::IfIcmpEq, test, zero, None);
    comp.copy_byte_code_info(node, guard);
    let helper_exit_node = comp.tt_node(comp.block(helper_block).exit);
    regdeps::copy_register_dependency_list(comp, helper_exit_node, guard);
    comp.append_to_block(original_block, guard);

    // 7. Split after the inline store to form the merge block.
    let after_inline = comp
        .next_tt(last_inline_tt)
        .ok_or_else(|| LowerError::inconsistency("inline store at the end of the method"))?;
    let block_after_store = comp.split_post_gra(block_after_helper, after_inline)?;

    // 8. Wire the edges.
    let inline_entry = comp.block(block_after_helper).entry;
    comp.set_branch_destination(guard, inline_entry);

    let goto = comp.create(Opcode::Goto, &[]);
    let merge_entry = comp.block(block_after_store).entry;
    comp.set_branch_destination(goto, merge_entry);
    comp.copy_byte_code_info(node, goto);
    let helper_exit_node = comp.tt_node(comp.block(helper_block).exit);
    regdeps::copy_register_dependency_list(comp, helper_exit_node, goto);
    comp.append_to_block(helper_block, goto);

    comp.cfg.add_edge(original_block, block_after_helper);
    comp.cfg.remove_edge(helper_block, block_after_helper);
    comp.cfg.add_edge(helper_block, block_after_store);
    Ok(())
}

// ---- existing store-check trees ----

/// Guards an existing store-check tree: when the array's component type is a
/// value type, a null stored value must trap, so a null check on the value
/// runs in a guarded extension block ahead of the generic store check.
pub(crate) fn lower_array_store_check(
    comp: &mut Compilation,
    req: &LoweringRequest,
) -> Result<(), LowerError> {
    let chk = req.node;
    let tt = req.tt;
    let store = comp.node(chk).child(0);
    let value = comp.node(store).child(1);
    let array = comp.node(store).child(2);

    comp.cfg.invalidate_structure();
    let prev_block = comp.enclosing_block(tt)?;
    debug!(
        node = comp.node(chk).global_index,
        "guarding store check in block_{}", comp.block(prev_block).number
    );

    // Anchor the array and the stored value for the guard and null check.
    let array_anchor_tt = anchor_before(comp, tt, array);
    let value_anchor = comp.create(Opcode::TreeTop, &[value]);
    comp.create_treetop_after(array_anchor_tt, value_anchor);

    let test = class_flags_test(comp, chk, array, true);
    let zero = comp.iconst(0);
    let guard = comp.create_if(Opcode::IfIcmpEq, test, zero, None);
    comp.copy_byte_code_info(chk, guard);

    let value_pass = comp.create(Opcode::PassThrough, &[value]);

    let check_block = comp.split_post_gra(prev_block, tt)?;
    comp.set_branch_destination(guard, comp.block(check_block).entry);

    let prev_exit_node = comp.tt_node(comp.block(prev_block).exit);
    regdeps::copy_register_dependency_list(comp, prev_exit_node, guard);
    comp.append_to_block(prev_block, guard);

    let null_sr = comp.symrefs.known(KnownSymbol::NullCheck);
    let nullchk = comp.create_with_symref(Opcode::NullChk, &[value_pass], null_sr);
    comp.copy_byte_code_info(chk, nullchk);
    let null_tt = comp.append_to_block(prev_block, nullchk);

    let null_block = comp.split(prev_block, null_tt);
    comp.block_mut(null_block).is_extension = true;

    comp.cfg.add_edge(prev_block, check_block);
    comp.node_mut(chk).guarded = true;
    Ok(())
}
