//! gRPC transport setup: credentials, message limits, serving.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};

use crate::proto::function_runner_service_server::FunctionRunnerServiceServer;
use crate::runner::FunctionRunner;

/// Transport configuration for [`serve`].
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Address at which to listen for gRPC connections.
    pub address: SocketAddr,
    /// Directory holding `tls.crt`, `tls.key`, and `ca.crt`.
    pub tls_certs_dir: Option<PathBuf>,
    /// Serve without credentials. Required when no certs dir is given.
    pub insecure: bool,
    /// Maximum size of received messages, in bytes.
    pub max_recv_message_size: usize,
    /// Maximum size of sent messages, in bytes.
    pub max_send_message_size: usize,
}

/// Failures bringing the transport up.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("no mTLS credentials; pass --insecure to serve without them")]
    MissingCredentials,

    #[error("cannot read {path}: {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
}

/// Serve `runner` until the process is interrupted.
pub async fn serve(runner: FunctionRunner, config: ServeConfig) -> Result<(), ServeError> {
    let service = FunctionRunnerServiceServer::new(runner)
        .max_decoding_message_size(config.max_recv_message_size)
        .max_encoding_message_size(config.max_send_message_size);

    let mut builder = Server::builder();
    if config.insecure {
        tracing::warn!("serving without mTLS credentials");
    } else {
        let dir = config
            .tls_certs_dir
            .as_deref()
            .ok_or(ServeError::MissingCredentials)?;
        builder = builder.tls_config(load_credentials(dir)?)?;
    }

    tracing::info!(address = %config.address, "listening for gRPC connections");
    builder
        .add_service(service)
        .serve_with_shutdown(config.address, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Load mTLS credentials from `dir`: `tls.crt` and `tls.key` form the server
/// identity, `ca.crt` is the root clients must present certificates under.
fn load_credentials(dir: &Path) -> Result<ServerTlsConfig, ServeError> {
    let read = |name: &str| {
        let path = dir.join(name);
        std::fs::read(&path).map_err(|source| ServeError::ReadCredentials { path, source })
    };

    let identity = Identity::from_pem(read("tls.crt")?, read("tls.key")?);
    let client_ca = Certificate::from_pem(read("ca.crt")?);

    Ok(ServerTlsConfig::new()
        .identity(identity)
        .client_ca_root(client_ca))
}
