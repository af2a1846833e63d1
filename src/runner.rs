//! The request pipeline: decode, load, resolve, invoke, assemble.

use prost_types::value::Kind;
use tonic::{Request, Response, Status};

use crate::proto::function_runner_service_server::FunctionRunnerService;
use crate::proto::{RunFunctionRequest, RunFunctionResponse};
use crate::script::{self, Dispatch};
use crate::{resource, response};

/// Handles `RunFunction` requests.
///
/// The runner holds no state; every request gets a fresh execution unit, and
/// requests never observe one another.
#[derive(Debug, Default)]
pub struct FunctionRunner;

#[tonic::async_trait]
impl FunctionRunnerService for FunctionRunner {
    async fn run_function(
        &self,
        request: Request<RunFunctionRequest>,
    ) -> Result<Response<RunFunctionResponse>, Status> {
        let req = request.into_inner();
        let tag = req
            .meta
            .as_ref()
            .map(|m| m.tag.clone())
            .unwrap_or_default();
        tracing::info!(tag = %tag, "running function");

        let mut rsp = response::to(&req);

        let Some(source) = script_source(&req) else {
            tracing::debug!(tag = %tag, "missing script");
            response::fatal(&mut rsp, "missing script");
            return Ok(Response::new(rsp));
        };

        tracing::debug!(tag = %tag, script = %source, "running script");

        let request_view = resource::request_view(&req);
        let response_view = resource::response_view(&rsp);

        // Engine contexts are not Send, so the whole load → resolve → invoke
        // sequence runs on a blocking thread, leaving the async workers free
        // for other requests.
        let outcome = tokio::task::spawn_blocking(move || {
            script::dispatch(&source, &request_view, response_view)
        })
        .await
        .map_err(|e| Status::internal(format!("script task failed: {e}")))?;

        match outcome {
            Ok(Dispatch::Completed(view)) => {
                if let Err(e) = resource::update_from_view(&mut rsp, &view) {
                    tracing::debug!(tag = %tag, error = %e, "unusable script mutations");
                    response::fatal(&mut rsp, e.to_string());
                }
            }
            Ok(Dispatch::AmbiguousEntryPoints) => {
                let msg = "script must define only one function: compose or operate";
                tracing::debug!(tag = %tag, "{msg}");
                response::fatal(&mut rsp, msg);
            }
            Ok(Dispatch::NoEntryPoints) => {
                let msg = "script must define a compose or operate function";
                tracing::debug!(tag = %tag, "{msg}");
                response::fatal(&mut rsp, msg);
            }
            Err(e) => {
                tracing::debug!(tag = %tag, error = %e, "script failed");
                response::fatal(&mut rsp, e.to_string());
            }
        }

        Ok(Response::new(rsp))
    }
}

/// Pull the source unit out of the request input.
///
/// An absent input, an absent or null `script` field, and a `script` bound to
/// anything but a string all mean the same thing: there is nothing to run.
fn script_source(req: &RunFunctionRequest) -> Option<String> {
    match req.input.as_ref()?.fields.get("script")?.kind.as_ref()? {
        Kind::StringValue(source) => Some(source.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::json_to_struct;
    use serde_json::json;

    #[test]
    fn test_script_source_present() {
        let req = RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "script": "var x;" }))),
            ..Default::default()
        };
        assert_eq!(script_source(&req).as_deref(), Some("var x;"));
    }

    #[test]
    fn test_script_source_absent() {
        assert_eq!(script_source(&RunFunctionRequest::default()), None);

        let no_field = RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "other": 1 }))),
            ..Default::default()
        };
        assert_eq!(script_source(&no_field), None);

        let null_field = RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "script": null }))),
            ..Default::default()
        };
        assert_eq!(script_source(&null_field), None);
    }

    #[test]
    fn test_script_source_non_string() {
        let req = RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "script": 42 }))),
            ..Default::default()
        };
        assert_eq!(script_source(&req), None);
    }
}
