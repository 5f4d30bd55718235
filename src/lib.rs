pub mod compilation;
pub mod config;
pub mod counters;
pub mod diagnostics;
pub mod il;
pub mod interp;
pub mod lower;
pub mod pretty;

pub use compilation::Compilation;
pub use config::LoweringOpts;
pub use diagnostics::LowerError;
pub use lower::perform;
