//! # Swap Node
//!
//! Loads configuration, installs the tracing subscriber, wires the swap
//! coordinator and runs until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use swap_node::{load_config, Cli, SwapNode};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("invalid log level")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(&cli, |key| std::env::var(key).ok())
        .context("failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.log_level)?;

    let run_demo = config.demo.enabled;
    let node = SwapNode::new(config).context("failed to wire swap node")?;
    let logger = node.start();

    if run_demo {
        let order = node.run_demo().await.context("demo swap failed")?;
        info!(swap_id = %order.id, status = %order.status, "[swap] Demo swap finished");
    }

    // Keep the node running
    info!("Swap node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    node.shutdown().await;
    logger.await.context("event logger panicked")?;

    Ok(())
}
