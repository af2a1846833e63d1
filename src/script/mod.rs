//! Script loading, capability resolution, and invocation.
//!
//! - [`ExecutionUnit`] — a fresh engine context holding one executed source unit.
//! - [`Capability`] — the four-way classification of a unit's entry points.
//! - [`ScriptError`] — failure classes for loading and invoking scripts.

pub mod capability;
pub mod console;
pub mod engine;
pub mod error;

pub use capability::{invoke, Capability};
pub use engine::ExecutionUnit;
pub use error::ScriptError;

use serde_json::Value;

/// The outcome of dispatching one source unit.
#[derive(Debug)]
pub enum Dispatch {
    /// A capability ran; this is the mutated response view.
    Completed(Value),
    /// The unit bound both entry points, so nothing was invoked.
    AmbiguousEntryPoints,
    /// The unit bound neither entry point, so nothing was invoked.
    NoEntryPoints,
}

/// Load `source`, resolve its capability, and invoke it if exactly one of the
/// recognized entry points is bound.
///
/// The engine context is not `Send`, so callers on an async runtime should run
/// this on a blocking thread.
pub fn dispatch(source: &str, request: &Value, response: Value) -> Result<Dispatch, ScriptError> {
    let mut unit = ExecutionUnit::load("script", source)?;

    match Capability::resolve(&mut unit) {
        Capability::Both => Ok(Dispatch::AmbiguousEntryPoints),
        Capability::Neither => Ok(Dispatch::NoEntryPoints),
        Capability::Compose(f) => {
            tracing::debug!("running composition function");
            invoke(&mut unit, &f, request, response).map(Dispatch::Completed)
        }
        Capability::Operate(f) => {
            tracing::debug!("running operation function");
            invoke(&mut unit, &f, request, response).map(Dispatch::Completed)
        }
    }
}
