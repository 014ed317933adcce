//! External collaborators consulted by the event pipeline.
//!
//! The orchestrator never looks inside these services; it only calls them
//! through the narrow traits below, each call bounded by the collaborator
//! timeout:
//! - Deception: did this traffic touch a decoy?
//! - Scoring: how anomalous is this event and how severe?
//! - Response: what should be done about a threat, and do it
//! - Federation: share critical threats with peers
//!
//! Reference implementations are provided so a system can run end to end
//! without external services.

mod deception;
mod federation;
mod response;
mod scorer;

pub use deception::{Decoy, DecoyProfile, DecoyRegistry, Ipv4Network};
pub use federation::LocalFederationNode;
pub use response::RuleBasedResponseEngine;
pub use scorer::RuleBasedScorer;

use std::sync::Arc;

use async_trait::async_trait;
use sentinel_types::{
    DefenseLevel, ResponseOutcome, ResponsePlan, ThreatAssessment, ThreatLevel, ValidatedEvent,
};
use serde::{Deserialize, Serialize};

use crate::config::SystemConfig;
use crate::error::SentinelResult;
use crate::monitor::{ResourceMonitor, SimulatedResourceMonitor};

/// Score reported by a threat scorer for one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatScore {
    pub anomaly_score: f64,
    pub threat_level: ThreatLevel,
}

/// Self-reported deception network counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeceptionStats {
    pub active: bool,
    pub active_decoys: usize,
    pub interactions_detected: u64,
}

/// Self-reported threat scorer counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorerStats {
    pub patterns_learned: usize,
    /// Fraction of the scorer's memory in use (0.0-1.0).
    pub memory_usage: f64,
}

/// Self-reported response engine counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStats {
    pub responses_executed: u64,
    pub posture: DefenseLevel,
}

/// Decoy network able to recognise traffic aimed at deception assets.
#[async_trait]
pub trait DeceptionNetwork: Send + Sync {
    async fn detect_interaction(
        &self,
        source_ip: &str,
        dest_ip: Option<&str>,
        dest_port: u16,
        protocol: &str,
    ) -> SentinelResult<bool>;

    /// Enable or disable interaction detection.
    async fn set_active(&self, active: bool);

    async fn statistics(&self) -> DeceptionStats;
}

/// Anomaly scorer for validated events.
#[async_trait]
pub trait ThreatScorer: Send + Sync {
    async fn analyze(&self, event: &ValidatedEvent) -> SentinelResult<ThreatScore>;

    /// Scale the scorer's severity thresholds (lower is more sensitive).
    async fn set_threshold_multiplier(&self, multiplier: f64);

    async fn statistics(&self) -> ScorerStats;
}

/// Proposes and executes defensive responses.
#[async_trait]
pub trait ResponseEngine: Send + Sync {
    async fn evaluate_threat(&self, assessment: &ThreatAssessment) -> SentinelResult<ResponsePlan>;

    async fn execute_response(&self, plan: &ResponsePlan) -> SentinelResult<ResponseOutcome>;

    /// Called whenever the defense level changes.
    async fn on_posture_change(&self, _level: DefenseLevel) {}

    async fn statistics(&self) -> ResponseStats;
}

/// Membership in a threat-intelligence federation.
#[async_trait]
pub trait FederationNode: Send + Sync {
    async fn join(&self) -> SentinelResult<()>;

    async fn leave(&self) -> SentinelResult<()>;

    /// Best-effort broadcast of a threat to peers.
    async fn share_threat_intelligence(&self, assessment: &ThreatAssessment)
        -> SentinelResult<()>;

    async fn connected_peers(&self) -> usize;
}

/// The full set of services an orchestrator is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub deception: Arc<dyn DeceptionNetwork>,
    pub scorer: Arc<dyn ThreatScorer>,
    pub response: Arc<dyn ResponseEngine>,
    /// `None` when federation is disabled.
    pub federation: Option<Arc<dyn FederationNode>>,
    pub resource_monitor: Arc<dyn ResourceMonitor>,
}

impl Collaborators {
    /// Wire the built-in reference collaborators from configuration.
    pub fn reference(config: &SystemConfig) -> SentinelResult<Self> {
        let federation: Option<Arc<dyn FederationNode>> = if config.federation.enabled {
            Some(Arc::new(LocalFederationNode::from_config(&config.federation)))
        } else {
            None
        };

        Ok(Self {
            deception: Arc::new(DecoyRegistry::from_config(&config.deception)?),
            scorer: Arc::new(RuleBasedScorer::from_config(&config.learning)),
            response: Arc::new(RuleBasedResponseEngine::new(
                config.response.max_escalation,
                config.defense_level,
            )),
            federation,
            resource_monitor: Arc::new(SimulatedResourceMonitor::new()),
        })
    }

    pub fn with_deception(mut self, deception: Arc<dyn DeceptionNetwork>) -> Self {
        self.deception = deception;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ThreatScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_response(mut self, response: Arc<dyn ResponseEngine>) -> Self {
        self.response = response;
        self
    }

    pub fn with_federation(mut self, federation: Option<Arc<dyn FederationNode>>) -> Self {
        self.federation = federation;
        self
    }

    pub fn with_resource_monitor(mut self, monitor: Arc<dyn ResourceMonitor>) -> Self {
        self.resource_monitor = monitor;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("federation", &self.federation.is_some())
            .finish_non_exhaustive()
    }
}
