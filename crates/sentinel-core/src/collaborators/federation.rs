//! Single-process federation node.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use sentinel_types::ThreatAssessment;
use tracing::{debug, info};

use super::FederationNode;
use crate::config::FederationConfig;
use crate::error::{SentinelError, SentinelResult};

/// Federation node over a static peer list.
///
/// Shared threats are counted, not transmitted.
#[derive(Debug, Default)]
pub struct LocalFederationNode {
    peers: Vec<String>,
    joined: AtomicBool,
    shared: AtomicU64,
}

impl LocalFederationNode {
    pub fn new(peers: Vec<String>) -> Self {
        Self {
            peers,
            ..Self::default()
        }
    }

    pub fn from_config(config: &FederationConfig) -> Self {
        Self::new(config.peers.clone())
    }

    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    /// Number of threats shared since creation.
    pub fn shared_count(&self) -> u64 {
        self.shared.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FederationNode for LocalFederationNode {
    async fn join(&self) -> SentinelResult<()> {
        self.joined.store(true, Ordering::SeqCst);
        info!(peers = self.peers.len(), "Joined federation");
        Ok(())
    }

    async fn leave(&self) -> SentinelResult<()> {
        if self.joined.swap(false, Ordering::SeqCst) {
            info!("Left federation");
        }
        Ok(())
    }

    async fn share_threat_intelligence(&self, assessment: &ThreatAssessment) -> SentinelResult<()> {
        if !self.is_joined() {
            return Err(SentinelError::collaborator(
                "federation",
                "node has not joined the federation",
            ));
        }
        self.shared.fetch_add(1, Ordering::Relaxed);
        debug!(threat_id = %assessment.threat_id, peers = self.peers.len(), "Shared threat");
        Ok(())
    }

    async fn connected_peers(&self) -> usize {
        if self.is_joined() {
            self.peers.len()
        } else {
            0
        }
    }
}
