//! The helper-call lowering pass.
//!
//! Rewrites calls to the recognized runtime helper operations into inline IR
//! that performs the common case directly: identity comparisons become guard
//! chains or pointer compares, array element accesses become checked direct
//! loads and stores, with the residual helper call kept on a cold path where
//! a runtime class-flag test can still force it.

mod classify;
mod fastpath;
mod regdeps;
mod rewrite;

use tracing::{debug, trace};

use crate::compilation::Compilation;
use crate::config::LoweringOpts;
use crate::diagnostics::LowerError;
use crate::il::symref::KnownSymbol;
use crate::lower::classify::RequestKind;

/// Runs the pass over one method body. Returns the number of sites lowered.
///
/// Classification walks the whole body once without mutating; the collected
/// requests are then drained in program order, each causing one local
/// IR/CFG edit. Every mutation is deferred past the walk, so no edit ever
/// invalidates the walk's position.
pub fn perform(comp: &mut Compilation, opts: &LoweringOpts) -> Result<u32, LowerError> {
    if !opts.enable_value_types {
        return Ok(0);
    }

    let requests = classify::classify(comp);
    trace!(sites = requests.len(), method = comp.signature(), "classified lowering sites");

    let mut applied = 0u32;
    for (ordinal, req) in requests.iter().enumerate() {
        let site = ordinal as u32 + 1;
        if opts.vetoed(site) {
            trace!(site, "site vetoed, leaving call untouched");
            continue;
        }
        let bci = comp.node(req.node).bci;
        match req.kind {
            RequestKind::IdentityCompare { negated } => {
                // The call becomes a VM helper call; the fastpath then tries
                // to branch around it.
                let helper = if negated {
                    KnownSymbol::AcmpneHelper
                } else {
                    KnownSymbol::AcmpHelper
                };
                let sr = comp.symrefs.known(helper);
                comp.node_mut(req.node).symref = Some(sr);
                if opts.enable_acmp_fastpath {
                    fastpath::fastpath_acmp(comp, req, negated)?;
                } else {
                    rewrite::substitute_compare(comp, req, negated);
                }
            }
            RequestKind::ArrayLoad => {
                let sr = comp.symrefs.known(KnownSymbol::LoadArrayElementHelper);
                comp.node_mut(req.node).symref = Some(sr);
                if opts.enable_load_fastpath {
                    fastpath::fastpath_array_load(comp, req)?;
                } else {
                    rewrite::fold_array_load(comp, req)?;
                }
            }
            RequestKind::ArrayStore => {
                let sr = comp.symrefs.known(KnownSymbol::StoreArrayElementHelper);
                comp.node_mut(req.node).symref = Some(sr);
                if opts.enable_store_fastpath {
                    fastpath::fastpath_array_store(comp, req)?;
                } else {
                    rewrite::fold_array_store(comp, req)?;
                }
            }
            RequestKind::StoreCheckOnly => {
                fastpath::lower_array_store_check(comp, req)?;
            }
        }
        let counter = format!(
            "vt-helper/inlinecheck/{}/({})/bc={}",
            req.kind.tag(),
            comp.signature(),
            bci
        );
        comp.counters.bump(counter);
        applied += 1;
        debug!(site, kind = req.kind.tag(), bci, "lowered helper site");
    }

    if cfg!(debug_assertions) {
        comp.verify()?;
    }
    Ok(applied)
}
