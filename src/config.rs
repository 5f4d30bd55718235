use serde::{Deserialize, Serialize};

use crate::diagnostics::LowerError;

/// Per-site veto predicate: given a transformation site's ordinal within
/// the pass, returns true to decline that rewrite. Used for bisection and
/// regression debugging; a vetoed site is left completely unchanged.
pub type VetoFn = Box<dyn Fn(u32) -> bool>;

/// Configuration for one run of the lowering pass.
///
/// The serializable fields can come from a compilation-options blob; the
/// veto predicate is process-local state and is never serialized.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringOpts {
    /// Master switch: when value-semantic types are disabled in the runtime
    /// the whole pass is a no-op.
    pub enable_value_types: bool,
    /// Guarded fastpath for identity comparisons. Off means the zero-guard
    /// opcode substitution.
    pub enable_acmp_fastpath: bool,
    /// Guarded fastpath for array element loads. Off means the straight-line
    /// fold.
    pub enable_load_fastpath: bool,
    /// Guarded fastpath for array element stores. Off means the straight-line
    /// fold, plus lowering of pre-existing store checks.
    pub enable_store_fastpath: bool,
    /// Veto every transformation site with an ordinal greater than this
    /// (1-based). `None` places no bound.
    pub last_transformation: Option<u32>,

    #[serde(skip)]
    pub veto: Option<VetoFn>,
}

impl Default for LoweringOpts {
    fn default() -> Self {
        Self {
            enable_value_types: true,
            enable_acmp_fastpath: true,
            enable_load_fastpath: true,
            enable_store_fastpath: true,
            last_transformation: None,
            veto: None,
        }
    }
}

impl std::fmt::Debug for LoweringOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoweringOpts")
            .field("enable_value_types", &self.enable_value_types)
            .field("enable_acmp_fastpath", &self.enable_acmp_fastpath)
            .field("enable_load_fastpath", &self.enable_load_fastpath)
            .field("enable_store_fastpath", &self.enable_store_fastpath)
            .field("last_transformation", &self.last_transformation)
            .field("veto", &self.veto.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl LoweringOpts {
    pub fn from_toml(text: &str) -> Result<Self, LowerError> {
        toml::from_str(text)
            .map_err(|e| LowerError::unsupported(format!("bad lowering options: {e}")))
    }

    /// True when the site with 1-based ordinal `n` must be skipped.
    pub fn vetoed(&self, n: u32) -> bool {
        if let Some(last) = self.last_transformation {
            if n > last {
                return true;
            }
        }
        match &self.veto {
            Some(f) => f(n),
            None => false,
        }
    }
}
