//! Client binary: one-shot quote requests, or a sustained load generator
//! for exercising the server's adaptive difficulty.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quotegate_client::Client;

/// Quote client with an optional attack mode.
#[derive(Debug, Parser)]
#[command(name = "quotegate-client")]
struct Args {
    /// Server address.
    #[arg(long, default_value = "localhost:8000")]
    server_addr: String,

    /// Repeat the exchange forever across worker tasks.
    #[arg(long)]
    attack: bool,

    /// Pause between requests per worker, in milliseconds.
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Number of concurrent workers in attack mode.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Suppress quote output.
    #[arg(long)]
    silent: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let client = Client::new(args.server_addr.clone());

    if !args.attack {
        match client.request_quote().await {
            Ok(quote) => {
                if !args.silent {
                    println!("Quote of the day: {quote}");
                }
            }
            Err(error) => {
                error!(%error, "request failed");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let served = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    for worker in 0..args.concurrency {
        let client = client.clone();
        let served = Arc::clone(&served);
        let interval = Duration::from_millis(args.interval_ms);
        let silent = args.silent;
        tokio::spawn(async move {
            loop {
                match client.request_quote().await {
                    Ok(quote) => {
                        served.fetch_add(1, Ordering::Relaxed);
                        if !silent {
                            info!(worker, %quote, "served");
                        }
                    }
                    Err(error) => error!(worker, %error, "request failed"),
                }
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
        });
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let total = served.load(Ordering::Relaxed);
                let per_second = total as f64 / started.elapsed().as_secs_f64();
                info!(total, per_second, "throughput");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping");
                break;
            }
        }
    }

    Ok(())
}
