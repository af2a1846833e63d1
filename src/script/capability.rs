//! Capability resolution and uniform invocation.

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::{JsError, JsObject, JsValue};
use serde_json::Value;

use super::engine::ExecutionUnit;
use super::error::ScriptError;

/// The entry points a source unit may bind, as found in a loaded unit.
///
/// Classification depends only on whether each recognized name is bound to
/// something invocable; arity, parameter names, and return type are not
/// inspected.
#[derive(Debug, Clone)]
pub enum Capability {
    /// Neither recognized name is bound.
    Neither,
    /// Only `compose` is bound; the handle is the invocable itself.
    Compose(JsObject),
    /// Only `operate` is bound.
    Operate(JsObject),
    /// Both names are bound, so neither may be invoked.
    Both,
}

impl Capability {
    /// Classify a loaded unit by its entry points.
    pub fn resolve(unit: &mut ExecutionUnit) -> Self {
        match (unit.callable("compose"), unit.callable("operate")) {
            (Some(_), Some(_)) => Capability::Both,
            (Some(f), None) => Capability::Compose(f),
            (None, Some(f)) => Capability::Operate(f),
            (None, None) => Capability::Neither,
        }
    }
}

/// Call a resolved capability with JSON views of the request and response.
///
/// The views are materialized as engine values and the capability is called as
/// `capability(request, response)`. An ordinary capability has mutated the
/// response by the time it returns. A suspending capability returns a promise
/// instead; the unit's job queue is then driven until the promise settles, so
/// both paths converge on the same post-condition. The mutated response view
/// is read back and returned; the capability's return value is discarded.
pub fn invoke(
    unit: &mut ExecutionUnit,
    capability: &JsObject,
    request: &Value,
    response: Value,
) -> Result<Value, ScriptError> {
    let context = unit.context_mut();

    let request = JsValue::from_json(request, context).map_err(|e| ScriptError::Convert(e.to_string()))?;
    let response = JsValue::from_json(&response, context).map_err(|e| ScriptError::Convert(e.to_string()))?;

    let returned = capability
        .call(&JsValue::undefined(), &[request, response.clone()], context)
        .map_err(|e| ScriptError::Invoke(e.to_string()))?;

    if let Some(promise) = returned
        .as_object()
        .and_then(|o| JsPromise::from_object(o.clone()).ok())
    {
        context.run_jobs();
        match promise.state() {
            PromiseState::Fulfilled(_) => {}
            PromiseState::Rejected(cause) => {
                return Err(ScriptError::Invoke(JsError::from_opaque(cause).to_string()));
            }
            PromiseState::Pending => return Err(ScriptError::Unsettled),
        }
    }

    response
        .to_json(context)
        .map_err(|e| ScriptError::Convert(e.to_string()))
}
