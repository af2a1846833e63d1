use thiserror::Error;

/// Failure classes for loading and invoking scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The source unit failed to compile, or threw during top-level execution.
    #[error("cannot load script: {0}")]
    Load(String),

    /// The invoked capability threw, or its promise rejected.
    #[error("script failed: {0}")]
    Invoke(String),

    /// A suspending capability's promise never settled after the job queue
    /// drained; nothing else could resolve it.
    #[error("script suspended without completing")]
    Unsettled,

    /// A value could not cross the engine boundary in either direction.
    #[error("cannot convert script value: {0}")]
    Convert(String),
}
