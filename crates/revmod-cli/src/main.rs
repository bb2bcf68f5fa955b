use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use revmod_core::{Config, GitCliStore, ModuleService};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::RevmodCli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = RevmodCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let config = Config::from_env(cli.overrides()).map_err(|err| eyre!("{err:#}"))?;
    let store = GitCliStore::new(config.root()).with_git(config.git());
    let service = ModuleService::new(Arc::new(store));

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .map_err(|err| eyre!("failed to bind {}: {err}", config.addr()))?;
    info!(
        addr = %listener.local_addr()?,
        root = %config.root().display(),
        "serving modules"
    );

    revmod_core::serve(listener, service, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "revmod={level},revmod_core={level},revmod_domain={level}"
        ))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
