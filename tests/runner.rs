//! End-to-end tests for the dispatch pipeline: request in, response out.

use std::collections::HashMap;

use serde_json::json;
use tonic::Request;

use function_script::proto::function_runner_service_server::FunctionRunnerService;
use function_script::proto::{
    RequestMeta, Resource, ResponseMeta, RunFunctionRequest, RunFunctionResponse, Severity, State,
};
use function_script::resource::{json_to_struct, struct_to_json};
use function_script::FunctionRunner;

const COMPOSITION_SCRIPT: &str = r#"
function compose(req, rsp) {
    rsp.desired.resources["bucket"] = {
        resource: {
            apiVersion: "s3.aws.upbound.io/v1beta2",
            kind: "Bucket",
            spec: { forProvider: { region: "us-east-1" } },
        },
    };
}
"#;

const ASYNC_COMPOSITION_SCRIPT: &str = r#"
async function compose(req, rsp) {
    await Promise.resolve();
    rsp.desired.resources["bucket"] = {
        resource: {
            apiVersion: "s3.aws.upbound.io/v1beta2",
            kind: "Bucket",
            spec: { forProvider: { region: "us-east-1" } },
        },
    };
}
"#;

const OPERATION_SCRIPT: &str = r#"
function operate(req, rsp) {
    rsp.output.result = "success";
    rsp.output.message = "Operation completed successfully";
}
"#;

const ASYNC_OPERATION_SCRIPT: &str = r#"
async function operate(req, rsp) {
    await Promise.resolve();
    rsp.output.result = "success";
    rsp.output.message = "Operation completed successfully";
}
"#;

const BOTH_FUNCTIONS_SCRIPT: &str = r#"
function compose(req, rsp) {}
function operate(req, rsp) {}
"#;

const NO_FUNCTION_SCRIPT: &str = r#"
function someOtherFunction() {}
"#;

async fn run(req: RunFunctionRequest) -> RunFunctionResponse {
    FunctionRunner::default()
        .run_function(Request::new(req))
        .await
        .expect("request should be answered, not fail at the transport level")
        .into_inner()
}

fn script_request(script: &str) -> RunFunctionRequest {
    RunFunctionRequest {
        input: Some(json_to_struct(&json!({ "script": script }))),
        ..Default::default()
    }
}

fn default_meta() -> Option<ResponseMeta> {
    Some(ResponseMeta {
        tag: String::new(),
        ttl: Some(prost_types::Duration { seconds: 60, nanos: 0 }),
    })
}

fn bucket_response() -> RunFunctionResponse {
    RunFunctionResponse {
        meta: default_meta(),
        desired: Some(State {
            composite: None,
            resources: HashMap::from([(
                "bucket".to_string(),
                Resource {
                    resource: Some(json_to_struct(&json!({
                        "apiVersion": "s3.aws.upbound.io/v1beta2",
                        "kind": "Bucket",
                        "spec": { "forProvider": { "region": "us-east-1" } },
                    }))),
                    connection_details: HashMap::new(),
                    ready: 0,
                },
            )]),
        }),
        results: vec![],
        context: Some(prost_types::Struct::default()),
        output: None,
    }
}

fn operation_response() -> RunFunctionResponse {
    RunFunctionResponse {
        meta: default_meta(),
        desired: Some(State::default()),
        results: vec![],
        context: Some(prost_types::Struct::default()),
        output: Some(json_to_struct(&json!({
            "result": "success",
            "message": "Operation completed successfully",
        }))),
    }
}

fn single_fatal(rsp: &RunFunctionResponse) -> &str {
    assert_eq!(rsp.results.len(), 1, "want exactly one result: {rsp:?}");
    assert_eq!(rsp.results[0].severity, Severity::Fatal as i32);
    &rsp.results[0].message
}

#[tokio::test]
async fn test_composition_script() {
    let got = run(script_request(COMPOSITION_SCRIPT)).await;
    assert_eq!(got, bucket_response());
}

#[tokio::test]
async fn test_async_composition_script() {
    let got = run(script_request(ASYNC_COMPOSITION_SCRIPT)).await;
    assert_eq!(got, bucket_response());
}

#[tokio::test]
async fn test_blocking_and_suspending_scripts_are_equivalent() {
    let blocking = run(script_request(COMPOSITION_SCRIPT)).await;
    let suspending = run(script_request(ASYNC_COMPOSITION_SCRIPT)).await;
    assert_eq!(blocking, suspending);
}

#[tokio::test]
async fn test_operation_script() {
    let got = run(script_request(OPERATION_SCRIPT)).await;
    assert_eq!(got, operation_response());
}

#[tokio::test]
async fn test_async_operation_script() {
    let got = run(script_request(ASYNC_OPERATION_SCRIPT)).await;
    assert_eq!(got, operation_response());
}

#[tokio::test]
async fn test_both_functions_is_fatal() {
    let got = run(script_request(BOTH_FUNCTIONS_SCRIPT)).await;
    assert!(single_fatal(&got).contains("only one function: compose or operate"));
    assert_eq!(got.desired, Some(State::default()));
    assert_eq!(got.output, None);
}

#[tokio::test]
async fn test_no_function_is_fatal() {
    let got = run(script_request(NO_FUNCTION_SCRIPT)).await;
    assert!(single_fatal(&got).contains("compose or operate function"));
    assert_eq!(got.desired, Some(State::default()));
    assert_eq!(got.output, None);
}

#[tokio::test]
async fn test_missing_script_is_fatal() {
    for req in [
        RunFunctionRequest::default(),
        RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "other": "field" }))),
            ..Default::default()
        },
        RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "script": null }))),
            ..Default::default()
        },
        RunFunctionRequest {
            input: Some(json_to_struct(&json!({ "script": 42 }))),
            ..Default::default()
        },
    ] {
        let got = run(req).await;
        assert_eq!(single_fatal(&got), "missing script");
        assert_eq!(got.desired, Some(State::default()));
        assert_eq!(got.output, None);
    }
}

#[tokio::test]
async fn test_load_failure_is_fatal() {
    let got = run(script_request("function compose(req, rsp { }")).await;
    assert!(single_fatal(&got).starts_with("cannot load script"));
    assert_eq!(got.desired, Some(State::default()));
}

#[tokio::test]
async fn test_top_level_throw_is_fatal() {
    let got = run(script_request("throw new Error('boom');")).await;
    let message = single_fatal(&got);
    assert!(message.starts_with("cannot load script"));
    assert!(message.contains("boom"));
}

#[tokio::test]
async fn test_throwing_capability_is_fatal() {
    let got = run(script_request(
        "function compose(req, rsp) { throw new Error('broken capability'); }",
    ))
    .await;
    let message = single_fatal(&got);
    assert!(message.starts_with("script failed"));
    assert!(message.contains("broken capability"));
}

#[tokio::test]
async fn test_rejecting_capability_is_fatal() {
    let got = run(script_request(
        "async function operate(req, rsp) { throw new Error('rejected'); }",
    ))
    .await;
    assert!(single_fatal(&got).contains("rejected"));
}

#[tokio::test]
async fn test_concurrent_units_are_isolated() {
    // Each unit records whether it saw a clean namespace before defining the
    // marker; a leak between units would flip `fresh` to false.
    let script = r#"
var fresh = typeof marker === 'undefined';
var marker = true;
function operate(req, rsp) {
    rsp.output.fresh = fresh;
}
"#;

    let (a, b) = tokio::join!(run(script_request(script)), run(script_request(script)));

    for got in [a, b] {
        assert_eq!(
            got.output.as_ref().map(struct_to_json),
            Some(json!({ "fresh": true }))
        );
    }
}

#[tokio::test]
async fn test_script_can_override_ttl() {
    let got = run(script_request(
        "function compose(req, rsp) { rsp.meta.ttl = 120; }",
    ))
    .await;
    assert_eq!(got.meta.as_ref().unwrap().ttl.as_ref().unwrap().seconds, 120);
    assert!(got.results.is_empty());
}

#[tokio::test]
async fn test_tag_is_echoed() {
    let req = RunFunctionRequest {
        meta: Some(RequestMeta { tag: "tag-123".to_string() }),
        input: Some(json_to_struct(&json!({ "script": OPERATION_SCRIPT }))),
        ..Default::default()
    };
    let got = run(req).await;
    assert_eq!(got.meta.as_ref().unwrap().tag, "tag-123");
}

#[tokio::test]
async fn test_desired_and_context_are_carried_through() {
    let desired = State {
        composite: None,
        resources: HashMap::from([(
            "existing".to_string(),
            Resource {
                resource: Some(json_to_struct(&json!({ "kind": "Existing" }))),
                connection_details: HashMap::new(),
                ready: 0,
            },
        )]),
    };
    let context = json_to_struct(&json!({ "iteration": "first" }));

    // Carried on the fatal path: the seeded response is returned untouched
    // apart from the single result.
    let fatal_req = RunFunctionRequest {
        desired: Some(desired.clone()),
        context: Some(context.clone()),
        ..Default::default()
    };
    let got = run(fatal_req).await;
    assert_eq!(single_fatal(&got), "missing script");
    assert_eq!(got.desired, Some(desired.clone()));
    assert_eq!(got.context, Some(context.clone()));

    // Carried on the success path: a script that adds nothing returns the
    // accumulated state unchanged.
    let pass_req = RunFunctionRequest {
        desired: Some(desired.clone()),
        context: Some(context.clone()),
        input: Some(json_to_struct(&json!({ "script": "function compose(req, rsp) {}" }))),
        ..Default::default()
    };
    let got = run(pass_req).await;
    assert!(got.results.is_empty());
    assert_eq!(got.desired, Some(desired));
    assert_eq!(got.context, Some(context));
}

#[tokio::test]
async fn test_script_reads_request_input() {
    let req = RunFunctionRequest {
        input: Some(json_to_struct(&json!({
            "script": "function operate(req, rsp) { rsp.output.region = req.input.region; }",
            "region": "eu-west-1",
        }))),
        ..Default::default()
    };
    let got = run(req).await;
    assert_eq!(
        got.output.as_ref().map(struct_to_json),
        Some(json!({ "region": "eu-west-1" }))
    );
}

#[tokio::test]
async fn test_script_can_append_warning_results() {
    let got = run(script_request(
        r#"function compose(req, rsp) { rsp.results.push({ severity: 2, message: "heads up" }); }"#,
    ))
    .await;
    assert_eq!(got.results.len(), 1);
    assert_eq!(got.results[0].severity, Severity::Warning as i32);
    assert_eq!(got.results[0].message, "heads up");
}

#[tokio::test]
async fn test_console_logging_does_not_change_the_response() {
    let script = r#"
function operate(req, rsp) {
    console.log("about to succeed", 42);
    rsp.output.result = "success";
    rsp.output.message = "Operation completed successfully";
}
"#;
    let got = run(script_request(script)).await;
    assert_eq!(got, operation_response());
}
