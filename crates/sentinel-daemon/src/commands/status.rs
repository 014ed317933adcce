//! Print a status report for a freshly started system

use super::{print_json, start_orchestrator};
use crate::config::DaemonConfig;
use crate::error::DaemonResult;

pub async fn execute(config: DaemonConfig) -> DaemonResult<()> {
    let orchestrator = start_orchestrator(config.system).await?;
    let status = orchestrator.status().await;
    orchestrator.shutdown().await?;
    print_json(&status)
}
