//! Server binary: parse flags, bind, serve until interrupted.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quotegate_server::{Server, ServerConfig};

/// PoW-gated quote server.
#[derive(Debug, Parser)]
#[command(name = "quotegate-server")]
struct Args {
    /// TCP address to listen on.
    #[arg(long, default_value = ":8000")]
    addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        addr: args.addr,
        ..ServerConfig::default()
    };

    let server = Arc::new(
        Server::bind(config)
            .await
            .context("failed to bind listener")?,
    );
    info!(addr = %server.local_addr()?, "quotegate listening");

    let listener = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.serve().await }
    });

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    server.shutdown();
    listener.await.context("listener task failed")?;

    Ok(())
}
