use thiserror::Error;

/// Errors raised by the lowering engine.
///
/// `InternalConsistency` is fatal: it signals that an invariant the engine
/// depends on does not hold (or that the runtime configuration requires
/// checks this engine does not support). The enclosing compilation must be
/// aborted; the failure is a defect, never a transient condition, so it is
/// not retried with the same input.
#[derive(Debug, Error)]
pub enum LowerError {
    #[error("internal consistency failure: {msg}")]
    InternalConsistency { msg: String, node: Option<u32> },

    #[error("unsupported configuration: {msg}")]
    UnsupportedConfiguration { msg: String },
}

impl LowerError {
    pub fn inconsistency(msg: impl Into<String>) -> Self {
        Self::InternalConsistency { msg: msg.into(), node: None }
    }

    pub fn inconsistency_at(msg: impl Into<String>, node: u32) -> Self {
        Self::InternalConsistency { msg: msg.into(), node: Some(node) }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration { msg: msg.into() }
    }
}
