//! Register-dependency plumbing for block splits and guard branches.
//!
//! After global register assignment every control-flow edge into a block
//! must carry a dependency list with the same arity and register identities
//! the block's entry expects. The helpers here replicate an existing exit
//! list onto new branches and synthesized gotos, optionally substituting the
//! node that supplies one register.

use crate::compilation::Compilation;
use crate::diagnostics::LowerError;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;

/// Copies one dependency entry for use in another list.
///
/// A `PassThrough` is duplicated (its child stays commoned) because a
/// pass-through is tied to the list it sits in; a register load is simply
/// re-referenced, which keeps the value commoned across both lists.
pub(crate) fn copy_register_dependency(comp: &mut Compilation, dep: NodeId) -> NodeId {
    if comp.node(dep).op == Opcode::PassThrough {
        let child = comp.node(dep).child(0);
        let copy = comp.create(Opcode::PassThrough, &[child]);
        comp.node_mut(copy).reg = comp.node(dep).reg;
        comp.copy_byte_code_info(dep, copy);
        copy
    } else {
        dep
    }
}

/// Fills `target` (a `GlRegDeps`) with a copy of every entry in `source`.
/// When `substitute` is given and an entry names the same register, the
/// substitute node takes that entry's place; the result list has exactly the
/// source's arity either way.
pub(crate) fn copy_exit_regdeps_and_substitute(
    comp: &mut Compilation,
    target: NodeId,
    source: NodeId,
    substitute: Option<NodeId>,
) {
    let entries: Vec<NodeId> = comp.node(source).children().to_vec();
    for dep in entries {
        let replaced = match substitute {
            Some(sub) if comp.node(dep).reg.is_some() && comp.node(dep).reg == comp.node(sub).reg => sub,
            _ => copy_register_dependency(comp, dep),
        };
        comp.push_child(target, replaced);
    }
}

/// Gives `branch` its own `GlRegDeps` copied from `source_deps`, with the
/// optional per-register substitution. The list is appended after the
/// branch's comparison operands and returned so the next guard in a chain
/// can copy from it.
pub(crate) fn copy_branch_regdeps_and_substitute(
    comp: &mut Compilation,
    branch: NodeId,
    source_deps: NodeId,
    substitute: Option<NodeId>,
) -> NodeId {
    let deps = comp.create(Opcode::GlRegDeps, &[]);
    copy_exit_regdeps_and_substitute(comp, deps, source_deps, substitute);
    comp.push_child(branch, deps);
    deps
}

/// Gives `to` a fresh `GlRegDeps` copied from the list hanging off `from`
/// (a block-exit marker or other exit-point node). Does nothing when `from`
/// carries no list.
pub(crate) fn copy_register_dependency_list(
    comp: &mut Compilation,
    from: NodeId,
    to: NodeId,
) {
    if comp.node(from).num_children() == 0 {
        return;
    }
    let source = comp.node(from).child(0);
    let deps = comp.create(Opcode::GlRegDeps, &[]);
    copy_exit_regdeps_and_substitute(comp, deps, source, None);
    comp.push_child(to, deps);
}

/// Builds a store of `value` into the location an anchored value occupies.
///
/// After a post-GRA split the anchored value is visible either as a register
/// load or as a load of a compiler temp; the matching store lets another
/// path deposit its own result into the same slot before the merge. Any
/// other shape means the anchoring went wrong upstream.
pub(crate) fn create_store_node_for_anchored_node(
    comp: &mut Compilation,
    anchored: NodeId,
    value: NodeId,
) -> Result<NodeId, LowerError> {
    let store = match comp.node(anchored).op {
        Opcode::ARegLoad | Opcode::IRegLoad => {
            let op = if comp.node(anchored).op == Opcode::ARegLoad {
                Opcode::ARegStore
            } else {
                Opcode::IRegStore
            };
            let store = comp.create(op, &[value]);
            comp.node_mut(store).reg = comp.node(anchored).reg;
            store
        }
        Opcode::ALoad | Opcode::ILoad => {
            let op = if comp.node(anchored).op == Opcode::ALoad {
                Opcode::AStore
            } else {
                Opcode::IStore
            };
            let sr = comp.node(anchored).symref;
            let store = comp.create(op, &[value]);
            comp.node_mut(store).symref = sr;
            store
        }
        op => {
            return Err(LowerError::inconsistency_at(
                format!("anchored value has shape {} (need a register load or a temp load)", op.name()),
                anchored.0,
            ));
        }
    };
    comp.copy_byte_code_info(anchored, store);
    Ok(store)
}
