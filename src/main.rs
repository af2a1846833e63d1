//! The function runner's CLI.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use function_script::server::{serve, ServeConfig};
use function_script::FunctionRunner;

/// A function runner that executes inline scripts.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Emit debug logs.
    #[arg(short, long)]
    debug: bool,

    /// Address at which to listen for gRPC connections.
    #[arg(long, default_value = "0.0.0.0:9443")]
    address: SocketAddr,

    /// Serve using mTLS certificates from this directory.
    #[arg(long, env = "TLS_SERVER_CERTS_DIR")]
    tls_certs_dir: Option<PathBuf>,

    /// Run without mTLS credentials. If you supply this flag --tls-certs-dir
    /// is ignored.
    #[arg(long)]
    insecure: bool,

    /// Maximum size of received messages in MB.
    #[arg(long, default_value_t = 4)]
    max_recv_message_size: usize,

    /// Maximum size of sent messages in MB.
    #[arg(long, default_value_t = 4)]
    max_send_message_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.debug { "debug" } else { "info" })
            }),
        )
        .init();

    serve(
        FunctionRunner::default(),
        ServeConfig {
            address: cli.address,
            tls_certs_dir: if cli.insecure { None } else { cli.tls_certs_dir },
            insecure: cli.insecure,
            max_recv_message_size: cli.max_recv_message_size * 1024 * 1024,
            max_send_message_size: cli.max_send_message_size * 1024 * 1024,
        },
    )
    .await
    .context("cannot run function")
}
