//! Run the orchestrator until interrupted

use sentinel_types::SystemMode;

use super::{shutdown_signal, start_orchestrator};
use crate::config::DaemonConfig;
use crate::error::DaemonResult;

pub async fn execute(mut config: DaemonConfig, mode: Option<SystemMode>) -> DaemonResult<()> {
    if let Some(mode) = mode {
        config.system.mode = mode;
    }

    println!(
        r#"
  Sentinel - security event orchestrator
  Version: {}
  Mode: {}
  Defense level: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.system.mode,
        config.system.defense_level,
    );

    let orchestrator = start_orchestrator(config.system).await?;
    tracing::info!(system_id = %orchestrator.system_id(), "Press Ctrl+C to stop");

    shutdown_signal().await;
    orchestrator.shutdown().await?;

    let status = orchestrator.status().await;
    tracing::info!(
        events_processed = status.metrics.events_processed,
        threats_detected = status.metrics.threats_detected,
        events_failed = status.metrics.events_failed,
        uptime_seconds = status.uptime_seconds,
        "Sentinel stopped"
    );
    Ok(())
}
