//! Daemon subcommands

pub mod analyze;
pub mod decoys;
pub mod start;
pub mod status;
pub mod validate;

use std::sync::Arc;

use sentinel_core::{Collaborators, Orchestrator, SystemConfig};
use serde::Serialize;

use crate::error::DaemonResult;

/// Start an orchestrator wired to the reference collaborators.
pub(crate) async fn start_orchestrator(config: SystemConfig) -> DaemonResult<Arc<Orchestrator>> {
    let collaborators = Collaborators::reference(&config)?;
    Ok(Orchestrator::start(config, collaborators).await?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> DaemonResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
