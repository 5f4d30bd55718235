//! Recognition of lowering sites.
//!
//! One preorder walk over the whole method body, never mutating, producing
//! lowering requests in program order. Deferring the rewrites keeps the
//! walk's position valid; the drain phase in the driver applies them.

use crate::compilation::Compilation;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;
use crate::il::symref::KnownSymbol;
use crate::il::treetop::TreeTopId;
use crate::il::walk::PreorderWalk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    /// Reference identity comparison; `negated` for the inequality form.
    IdentityCompare { negated: bool },
    ArrayLoad,
    ArrayStore,
    /// An existing store-check tree with no separate helper call.
    StoreCheckOnly,
}

impl RequestKind {
    /// Short tag used in counter names and trace lines.
    pub(crate) fn tag(self) -> &'static str {
        match self {
            RequestKind::IdentityCompare { .. } => "acmp",
            RequestKind::ArrayLoad => "aaload",
            RequestKind::ArrayStore => "aastore",
            RequestKind::StoreCheckOnly => "arraystorechk",
        }
    }
}

/// One recognized site, with the checks its lowering must materialize.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoweringRequest {
    pub tt: TreeTopId,
    pub node: NodeId,
    pub kind: RequestKind,
    pub requires_bound_check: bool,
    /// Store only: the generic array-store type check is needed.
    pub requires_store_check: bool,
    /// Store only: the stored value may be null and needs checking when the
    /// destination is a value-typed array.
    pub requires_null_check: bool,
}

/// Walks the method body and collects every site eligible for lowering.
///
/// Only the non-helper symbol forms are recognized; residual out-of-line
/// calls left by a previous run target the helper forms and never match, so
/// running the pass again finds nothing.
pub(crate) fn classify(comp: &Compilation) -> Vec<LoweringRequest> {
    let mut requests = Vec::new();
    for (tt, node) in PreorderWalk::new(comp) {
        let n = comp.node(node);
        match n.op {
            Opcode::Call => {
                let Some(known) = n.symref.and_then(|sr| comp.symrefs.known_symbol(sr)) else {
                    continue;
                };
                let kind = match known {
                    KnownSymbol::ObjectEqualityComparison => {
                        RequestKind::IdentityCompare { negated: false }
                    }
                    KnownSymbol::ObjectInequalityComparison => {
                        RequestKind::IdentityCompare { negated: true }
                    }
                    KnownSymbol::LoadArrayElement => RequestKind::ArrayLoad,
                    KnownSymbol::StoreArrayElement => RequestKind::ArrayStore,
                    _ => continue,
                };
                let is_store = kind == RequestKind::ArrayStore;
                let value_non_null =
                    is_store && comp.node(n.child(0)).is_non_null;
                requests.push(LoweringRequest {
                    tt,
                    node,
                    kind,
                    requires_bound_check: matches!(
                        kind,
                        RequestKind::ArrayLoad | RequestKind::ArrayStore
                    ) && !comp.skip_bound_checks,
                    requires_store_check: is_store && !comp.skip_store_checks,
                    requires_null_check: is_store && !value_non_null,
                });
            }
            Opcode::ArrayStoreChk => {
                if n.guarded || comp.skip_store_checks {
                    continue;
                }
                // astorei(address, value, array) under the check.
                let store = n.child(0);
                let value = comp.node(store).child(1);
                if comp.node(value).is_non_null {
                    continue;
                }
                requests.push(LoweringRequest {
                    tt,
                    node,
                    kind: RequestKind::StoreCheckOnly,
                    requires_bound_check: false,
                    requires_store_check: true,
                    requires_null_check: true,
                });
            }
            _ => {}
        }
    }
    requests
}
