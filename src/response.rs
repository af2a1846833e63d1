//! Seeding and annotating responses.
//!
//! A response is always derived from its request before any script runs: the
//! diagnostic tag is echoed, the desired state and context are carried over so
//! runners can be chained, and the time-to-live gets its default. Scripts then
//! mutate that seed; fatal paths annotate it instead.

use crate::proto::{ResponseMeta, RunFunctionRequest, RunFunctionResponse, Severity};

/// How long a response may be considered valid unless a script says otherwise.
pub const DEFAULT_TTL_SECONDS: i64 = 60;

/// Seed the default response for `req`.
pub fn to(req: &RunFunctionRequest) -> RunFunctionResponse {
    RunFunctionResponse {
        meta: Some(ResponseMeta {
            tag: req.meta.as_ref().map(|m| m.tag.clone()).unwrap_or_default(),
            ttl: Some(prost_types::Duration {
                seconds: DEFAULT_TTL_SECONDS,
                nanos: 0,
            }),
        }),
        desired: Some(req.desired.clone().unwrap_or_default()),
        results: Vec::new(),
        context: Some(req.context.clone().unwrap_or_default()),
        output: None,
    }
}

/// Append a fatal result. A response carrying one means the request failed.
pub fn fatal(rsp: &mut RunFunctionResponse, message: impl Into<String>) {
    push(rsp, Severity::Fatal, message);
}

/// Append a warning result.
pub fn warning(rsp: &mut RunFunctionResponse, message: impl Into<String>) {
    push(rsp, Severity::Warning, message);
}

/// Append a purely informational result.
pub fn normal(rsp: &mut RunFunctionResponse, message: impl Into<String>) {
    push(rsp, Severity::Normal, message);
}

fn push(rsp: &mut RunFunctionResponse, severity: Severity, message: impl Into<String>) {
    rsp.results.push(crate::proto::Result {
        severity: severity as i32,
        message: message.into(),
    });
}
