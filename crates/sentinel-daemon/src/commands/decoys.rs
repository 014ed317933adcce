//! Decoy deployment

use sentinel_core::collaborators::{Decoy, DecoyProfile, DecoyRegistry, Ipv4Network};
use sentinel_core::{DeceptionNetwork, DeceptionStats};
use serde::Serialize;

use super::print_json;
use crate::config::DaemonConfig;
use crate::error::DaemonResult;

#[derive(Debug, Serialize)]
pub struct DeploymentReport {
    pub network: String,
    pub deployed: Vec<Decoy>,
    pub statistics: DeceptionStats,
}

/// Deploy `count` decoys into `network`, rotating through every profile.
pub async fn deploy(network: Ipv4Network, count: usize) -> DaemonResult<DeploymentReport> {
    let registry = DecoyRegistry::new(network);
    let mut deployed = Vec::with_capacity(count);
    for profile in DecoyProfile::ROTATION.iter().cycle().take(count) {
        deployed.push(registry.add_decoy(*profile, None).await?);
    }

    Ok(DeploymentReport {
        network: network.to_string(),
        deployed,
        statistics: registry.statistics().await,
    })
}

pub async fn execute(config: DaemonConfig, network: Option<&str>, count: usize) -> DaemonResult<()> {
    let network: Ipv4Network = network
        .unwrap_or(config.system.deception.network.as_str())
        .parse()?;

    let report = deploy(network, count).await?;
    tracing::info!(
        network = %report.network,
        deployed = report.deployed.len(),
        "Decoys deployed"
    );
    print_json(&report)
}
