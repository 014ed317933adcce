//! Threat assessments and the response descriptors attached to them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::ValidatedEvent;
use crate::ids::ThreatId;
use crate::levels::ThreatLevel;

/// The scored verdict for one validated event.
///
/// Assessments are immutable once built; attaching a response produces a new
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// Content-addressed id derived from the validated event
    pub threat_id: ThreatId,

    /// The validated event that was scored
    pub event: ValidatedEvent,

    /// Anomaly score reported by the threat scorer
    pub anomaly_score: f64,

    /// Severity reported by the threat scorer
    pub threat_level: ThreatLevel,

    /// Whether the traffic touched a decoy asset
    pub is_decoy_interaction: bool,

    /// When the assessment was composed
    pub timestamp: DateTime<Utc>,

    /// Wall-clock time from validation start to composition
    pub processing_time_seconds: f64,

    /// Execution outcome, present when a response ran autonomously
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_executed: Option<ResponseOutcome>,

    /// The proposed response, present when a response ran autonomously
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_details: Option<ResponsePlan>,
}

impl ThreatAssessment {
    pub fn new(
        event: ValidatedEvent,
        anomaly_score: f64,
        threat_level: ThreatLevel,
        is_decoy_interaction: bool,
        processing_time_seconds: f64,
    ) -> Self {
        Self {
            threat_id: ThreatId::derive(&event),
            event,
            anomaly_score,
            threat_level,
            is_decoy_interaction,
            timestamp: Utc::now(),
            processing_time_seconds,
            response_executed: None,
            response_details: None,
        }
    }

    /// Attach an executed response.
    pub fn with_response(mut self, plan: ResponsePlan, outcome: ResponseOutcome) -> Self {
        self.response_details = Some(plan);
        self.response_executed = Some(outcome);
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.threat_level.is_elevated()
    }

    /// Age of the assessment relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

/// A single defensive action proposed by a response engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResponseAction {
    /// Keep watching, take no action
    Monitor,

    /// Raise an alert to operators
    Alert { message: String },

    /// Throttle traffic from a source
    RateLimit { target: String },

    /// Drop traffic from a source
    BlockIp { ip: String },

    /// Redirect a source to the deception network
    RedirectToDecoy { ip: String },

    /// Cut a host off the network
    IsolateHost { host: String },
}

impl ResponseAction {
    /// Escalation rank of the action (higher is more disruptive).
    pub fn escalation(&self) -> u8 {
        match self {
            ResponseAction::Monitor => 0,
            ResponseAction::Alert { .. } => 1,
            ResponseAction::RateLimit { .. } | ResponseAction::RedirectToDecoy { .. } => 2,
            ResponseAction::BlockIp { .. } => 3,
            ResponseAction::IsolateHost { .. } => 4,
        }
    }
}

/// The response proposed for one threat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub threat_id: ThreatId,
    pub threat_level: ThreatLevel,
    pub escalation_level: u8,
    pub actions: Vec<ResponseAction>,
    pub rationale: String,
}

/// What happened when a plan was executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutcome {
    pub success: bool,
    pub executed: Vec<ResponseAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ResponseOutcome {
    pub fn succeeded(executed: Vec<ResponseAction>) -> Self {
        Self {
            success: true,
            executed,
            message: None,
            executed_at: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            executed: Vec::new(),
            message: Some(message.into()),
            executed_at: Utc::now(),
        }
    }
}
