//! # function-script — a function runner for inline scripts
//!
//! `function-script` serves one unary gRPC operation, `RunFunction`. Each
//! request carries a complete JavaScript source unit in its input; the runner
//! executes it in a fresh, isolated engine context, finds which of the two
//! recognized entry points (`compose`, `operate`) it defines, invokes the
//! matching one with `(request, response)`, and answers with the response the
//! script mutated in place.
//!
//! The pipeline per request is strictly linear:
//!
//! - **decode** — pull the `script` string out of the request input
//! - **load** — compile and run the source in a fresh [`ExecutionUnit`]
//! - **resolve** — classify the unit's entry points into a [`Capability`]
//! - **invoke** — call the capability, blocking or suspending, uniformly
//! - **assemble** — return the mutated response, or one fatal result
//!
//! Nothing survives a request: no compiled artifacts, no globals, no caches.
//! Two concurrent requests running identical text never observe each other.
//!
//! A minimal composition script:
//!
//! ```text
//! function compose(req, rsp) {
//!     rsp.desired.resources["bucket"] = {
//!         resource: { apiVersion: "v1", kind: "Bucket" },
//!     };
//! }
//! ```
//!
//! Suspending scripts work the same way, via `async function compose(...)`.
//! Anticipated failures (missing script, ambiguous or absent entry points,
//! load and invocation errors) are answered as a single fatal [`proto::Result`]
//! on an otherwise-default response, never as a transport error.

pub mod proto {
    //! Generated wire types for the `fnscript.v1` RPC surface.
    #![allow(missing_docs)]
    tonic::include_proto!("fnscript.v1");
}

pub mod resource;
pub mod response;
pub mod runner;
pub mod script;
pub mod server;

pub use runner::FunctionRunner;
pub use script::{Capability, ExecutionUnit, ScriptError};
