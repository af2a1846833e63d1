//! JSON views of the wire messages.
//!
//! Scripts never see protobuf types. The runner hands them plain JSON mirrors
//! of the request and response, and reads the (possibly mutated) response view
//! back into wire form afterwards. `connection_details` bytes cross the
//! boundary base64-encoded, following the protobuf JSON convention.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use prost_types::value::Kind;
use prost_types::{ListValue, Struct, Value as ProtoValue};
use serde_json::{json, Map, Value};

use crate::proto::{self, Resource, RunFunctionRequest, RunFunctionResponse, State};
use crate::response::DEFAULT_TTL_SECONDS;

/// A response view mutated by a script could not be read back into wire form.
#[derive(Debug, thiserror::Error)]
#[error("invalid response view: {0}")]
pub struct ViewError(String);

/// Convert a JSON value into a protobuf `Struct`.
///
/// Non-object values convert to an empty struct; a struct has no other
/// representation for them.
pub fn json_to_struct(value: &Value) -> Struct {
    let fields = match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect(),
        _ => Default::default(),
    };
    Struct { fields }
}

/// Convert a protobuf `Struct` into a JSON object.
pub fn struct_to_json(value: &Struct) -> Value {
    Value::Object(
        value
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

fn json_to_value(value: &Value) -> ProtoValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        Value::Object(_) => Kind::StructValue(json_to_struct(value)),
    };
    ProtoValue { kind: Some(kind) }
}

fn value_to_json(value: &ProtoValue) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => Value::Array(list.values.iter().map(value_to_json).collect()),
        Some(Kind::StructValue(s)) => struct_to_json(s),
    }
}

/// The read-only view of a request handed to a capability.
pub fn request_view(req: &RunFunctionRequest) -> Value {
    json!({
        "meta": {
            "tag": req.meta.as_ref().map(|m| m.tag.clone()).unwrap_or_default(),
        },
        "observed": req.observed.as_ref().map(state_view).unwrap_or_else(empty_state_view),
        "desired": req.desired.as_ref().map(state_view).unwrap_or_else(empty_state_view),
        "input": req.input.as_ref().map(struct_to_json).unwrap_or_else(|| json!({})),
        "context": req.context.as_ref().map(struct_to_json).unwrap_or_else(|| json!({})),
    })
}

/// The mutable view of a seeded response handed to a capability.
pub fn response_view(rsp: &RunFunctionResponse) -> Value {
    let ttl = rsp
        .meta
        .as_ref()
        .and_then(|m| m.ttl.as_ref())
        .map(|ttl| ttl.seconds)
        .unwrap_or(DEFAULT_TTL_SECONDS);

    json!({
        "meta": {
            "tag": rsp.meta.as_ref().map(|m| m.tag.clone()).unwrap_or_default(),
            "ttl": ttl,
        },
        "desired": rsp.desired.as_ref().map(state_view).unwrap_or_else(empty_state_view),
        "context": rsp.context.as_ref().map(struct_to_json).unwrap_or_else(|| json!({})),
        "output": rsp.output.as_ref().map(struct_to_json).unwrap_or_else(|| json!({})),
        "results": [],
    })
}

/// Read a mutated response view back into `rsp`.
///
/// All of the view is parsed before any of `rsp` is touched, so a malformed
/// view leaves the response exactly as seeded.
pub fn update_from_view(rsp: &mut RunFunctionResponse, view: &Value) -> Result<(), ViewError> {
    let tag = view
        .pointer("/meta/tag")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let ttl = view
        .pointer("/meta/ttl")
        .and_then(json_seconds)
        .unwrap_or(DEFAULT_TTL_SECONDS);

    let desired = match view.get("desired") {
        Some(v) => state_from_view(v)?,
        None => State::default(),
    };
    let context = view.get("context").map(json_to_struct).unwrap_or_default();
    let output = view
        .get("output")
        .and_then(Value::as_object)
        .filter(|fields| !fields.is_empty())
        .map(|fields| json_to_struct(&Value::Object(fields.clone())));
    let results = match view.get("results").and_then(Value::as_array) {
        Some(items) => items.iter().map(result_from_view).collect::<Result<_, _>>()?,
        None => Vec::new(),
    };

    let meta = rsp.meta.get_or_insert_with(Default::default);
    meta.ttl = Some(prost_types::Duration { seconds: ttl, nanos: 0 });
    if let Some(tag) = tag {
        meta.tag = tag;
    }
    rsp.desired = Some(desired);
    rsp.context = Some(context);
    rsp.output = output;
    rsp.results = results;
    Ok(())
}

fn empty_state_view() -> Value {
    json!({ "resources": {} })
}

fn state_view(state: &State) -> Value {
    let mut view = json!({
        "resources": state
            .resources
            .iter()
            .map(|(name, r)| (name.clone(), resource_to_view(r)))
            .collect::<Map<String, Value>>(),
    });
    if let Some(composite) = &state.composite {
        view["composite"] = resource_to_view(composite);
    }
    view
}

fn resource_to_view(resource: &Resource) -> Value {
    let mut view = json!({
        "resource": resource.resource.as_ref().map(struct_to_json).unwrap_or_else(|| json!({})),
    });
    if !resource.connection_details.is_empty() {
        view["connection_details"] = Value::Object(
            resource
                .connection_details
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(BASE64_STANDARD.encode(v))))
                .collect(),
        );
    }
    if resource.ready != 0 {
        view["ready"] = json!(resource.ready);
    }
    view
}

fn state_from_view(view: &Value) -> Result<State, ViewError> {
    let composite = view.get("composite").map(resource_from_view).transpose()?;
    let mut resources = HashMap::new();
    if let Some(entries) = view.get("resources").and_then(Value::as_object) {
        for (name, entry) in entries {
            resources.insert(name.clone(), resource_from_view(entry)?);
        }
    }
    Ok(State { composite, resources })
}

fn resource_from_view(view: &Value) -> Result<Resource, ViewError> {
    let resource = view.get("resource").map(json_to_struct);

    let mut connection_details = HashMap::new();
    if let Some(entries) = view.get("connection_details").and_then(Value::as_object) {
        for (name, entry) in entries {
            let encoded = entry
                .as_str()
                .ok_or_else(|| ViewError(format!("connection detail {name} is not a string")))?;
            let bytes = BASE64_STANDARD
                .decode(encoded)
                .map_err(|e| ViewError(format!("connection detail {name}: {e}")))?;
            connection_details.insert(name.clone(), bytes);
        }
    }

    let ready = view.get("ready").and_then(Value::as_i64).unwrap_or(0) as i32;

    Ok(Resource {
        resource,
        connection_details,
        ready,
    })
}

fn result_from_view(view: &Value) -> Result<proto::Result, ViewError> {
    let severity = view
        .get("severity")
        .and_then(Value::as_i64)
        .ok_or_else(|| ViewError("result is missing a numeric severity".to_string()))?;
    let message = view
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Ok(proto::Result {
        severity: severity as i32,
        message,
    })
}

fn json_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|seconds| seconds as i64))
}
