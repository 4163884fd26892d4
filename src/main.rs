use std::io;
use std::sync::{Arc, Mutex};

use clap::Parser;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::build_info::{BUILD_TIME, PROJECT_NAME, PROJECT_VERSION};
use crate::cli::Cli;
use crate::config::config::Config;
use crate::config::paths::WorldPaths;
use crate::drive::DriveConnector;
use crate::drive::guard::NetworkLimits;
use crate::setup_logger::setup_logger;
use crate::shell::Shell;

pub mod backup;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod setup_logger;
pub mod shell;
#[cfg(test)]
pub mod testutil;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_guard = Arc::new(Mutex::new(Some(setup_logger().await?)));

    info!(
        name = PROJECT_NAME,
        version = PROJECT_VERSION,
        built = BUILD_TIME,
        "Starting"
    );

    let mut config = Config::from_env()?;
    config.apply_cli(&cli);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone(), log_guard.clone());

    let limits = NetworkLimits::new(
        config.request_timeout,
        config.transfer_timeout,
        cancel.clone(),
    );
    let connector = DriveConnector::new(
        config.credentials_path.clone(),
        config.token_path.clone(),
        limits,
    );

    let stdin = io::stdin();
    let mut shell = Shell::new(
        stdin.lock(),
        io::stdout(),
        connector,
        WorldPaths::from_config(&config),
        config.drive_folder_id.clone(),
        cancel,
    );
    shell.run().await?;

    info!("Exiting");
    release_log_guard(&log_guard);
    Ok(())
}

/// First ctrl-c cancels the running action and ends the menu, the second
/// flushes the log file and exits.
fn spawn_interrupt_handler<G: Send + 'static>(
    cancel: CancellationToken,
    log_guard: Arc<Mutex<Option<G>>>,
) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, cancelling (press ctrl-c again to quit now)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt, exiting");
            release_log_guard(&log_guard);
            std::process::exit(130);
        }
    });
}

/// Drops the logger guard, which flushes buffered lines to the log file.
/// `process::exit` skips destructors, so this must run before it.
fn release_log_guard<G>(slot: &Mutex<Option<G>>) {
    let guard = match slot.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    drop(guard);
}
