//! Compiling and executing source units.

use boa_engine::{Context, JsObject, Source};

use super::console;
use super::error::ScriptError;

/// The namespace produced by compiling and running one source unit.
///
/// Each unit owns a fresh engine context. Nothing is shared between units, so
/// identical text is recompiled and re-executed every time, and two units never
/// observe each other's bindings or side effects.
pub struct ExecutionUnit {
    context: Context,
}

impl ExecutionUnit {
    /// Compile and execute `source` as a standalone unit named `name`.
    ///
    /// Every top-level binding the script creates remains available for
    /// lookup. A compile error and an error thrown during top-level execution
    /// are the same failure class: the unit never existed.
    pub fn load(name: &str, source: &str) -> Result<Self, ScriptError> {
        let mut context = Context::default();
        console::register(&mut context).map_err(|e| ScriptError::Load(e.to_string()))?;

        tracing::debug!(unit = name, "executing source unit");
        context
            .eval(Source::from_bytes(source))
            .map_err(|e| ScriptError::Load(e.to_string()))?;

        Ok(Self { context })
    }

    /// Look up a top-level binding, returning it only if it is invocable.
    ///
    /// Function declarations and `var` bindings land on the global object
    /// while top-level `let`/`const` live in the script's lexical environment,
    /// so the lookup is an expression probe rather than a property read.
    pub fn callable(&mut self, name: &str) -> Option<JsObject> {
        let probe = format!("typeof {name} === 'function' ? {name} : undefined");
        let value = self.context.eval(Source::from_bytes(&probe)).ok()?;
        value.as_object().filter(|o| o.is_callable()).cloned()
    }

    pub(crate) fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}
