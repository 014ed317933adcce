//! Event processing pipeline.
//!
//! One event flows through validation, decoy detection, scoring, history
//! and, for elevated threats, response and federation sharing. Every
//! collaborator call is bounded by the collaborator timeout. Failures never
//! escape: they are returned as [`ProcessingFailure`] records carrying the
//! caller's original event.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sentinel_types::{is_external_ip, Event, ThreatAssessment, ValidatedEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, field, info, instrument, warn, Span};

use crate::collaborators::{Collaborators, FederationNode};
use crate::config::SystemConfig;
use crate::error::{ErrorKind, SentinelError, SentinelResult};
use crate::history::HistoryStore;

/// Record returned instead of an assessment when processing fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingFailure {
    pub error_kind: ErrorKind,
    pub error: String,
    /// The event exactly as the caller submitted it.
    pub original_event: Event,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingFailure {
    pub fn new(error: &SentinelError, original_event: Event) -> Self {
        Self {
            error_kind: error.kind(),
            error: error.to_string(),
            original_event,
            timestamp: Utc::now(),
        }
    }
}

/// Result of processing one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessOutcome {
    Assessed(ThreatAssessment),
    Failed(ProcessingFailure),
}

impl ProcessOutcome {
    pub fn assessment(&self) -> Option<&ThreatAssessment> {
        match self {
            ProcessOutcome::Assessed(assessment) => Some(assessment),
            ProcessOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ProcessingFailure> {
        match self {
            ProcessOutcome::Assessed(_) => None,
            ProcessOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProcessOutcome::Failed(_))
    }
}

/// Run `call` with a time bound, mapping expiry to `CollaboratorTimeout`.
pub(crate) async fn bounded<T, F>(
    collaborator: &'static str,
    limit: Duration,
    call: F,
) -> SentinelResult<T>
where
    F: Future<Output = SentinelResult<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| {
            Err(SentinelError::CollaboratorTimeout {
                collaborator,
                timeout_ms: limit.as_millis() as u64,
            })
        })
}

/// Stateless processing logic over shared collaborators and history.
#[derive(Debug)]
pub struct EventPipeline {
    collaborators: Collaborators,
    history: Arc<HistoryStore>,
    timeout: Duration,
    autonomous: bool,
}

impl EventPipeline {
    pub fn new(
        collaborators: Collaborators,
        history: Arc<HistoryStore>,
        config: &SystemConfig,
    ) -> Self {
        Self {
            collaborators,
            history,
            timeout: config.collaborator_timeout(),
            autonomous: config.autonomous_response(),
        }
    }

    pub fn is_autonomous(&self) -> bool {
        self.autonomous
    }

    /// Process one event. Never fails; errors come back as failure records.
    #[instrument(skip_all, fields(event_id = field::Empty))]
    pub async fn process(&self, event: &Event) -> ProcessOutcome {
        let started = Instant::now();

        match self.assess(event, started).await {
            Ok(assessment) => {
                self.history.record_processed(started.elapsed()).await;
                ProcessOutcome::Assessed(assessment)
            }
            Err(err) => {
                error!(error = %err, kind = ?err.kind(), "Event processing failed");
                self.history.record_failure().await;
                ProcessOutcome::Failed(ProcessingFailure::new(&err, event.clone()))
            }
        }
    }

    async fn assess(&self, event: &Event, started: Instant) -> SentinelResult<ThreatAssessment> {
        let validated = event.validate();
        Span::current().record("event_id", validated.event_id().as_str());

        let is_decoy_interaction = self.check_decoy(&validated).await?;

        let score = bounded(
            "threat scorer",
            self.timeout,
            self.collaborators.scorer.analyze(&validated),
        )
        .await?;
        if !score.anomaly_score.is_finite() {
            return Err(SentinelError::collaborator(
                "threat scorer",
                format!("non-finite anomaly score {}", score.anomaly_score),
            ));
        }

        let assessment = ThreatAssessment::new(
            validated,
            score.anomaly_score,
            score.threat_level,
            is_decoy_interaction,
            started.elapsed().as_secs_f64(),
        );
        debug!(
            threat_id = %assessment.threat_id,
            anomaly_score = assessment.anomaly_score,
            threat_level = %assessment.threat_level,
            is_decoy_interaction,
            "Event assessed"
        );

        self.history.append(assessment.clone()).await;
        if !self.history.append_if_threat(&assessment).await {
            return Ok(assessment);
        }

        warn!(
            threat_id = %assessment.threat_id,
            threat_level = %assessment.threat_level,
            source_ip = %assessment.event.source_ip(),
            "Threat detected"
        );

        let assessment = self.respond(assessment).await?;

        if assessment.threat_level.is_shareable() {
            if let Some(federation) = &self.collaborators.federation {
                self.share(Arc::clone(federation), assessment.clone());
            }
        }

        Ok(assessment)
    }

    /// Decoy lookup, skipped for internal or missing source addresses.
    ///
    /// Non-string addresses arrive as their JSON text and count as external.
    async fn check_decoy(&self, event: &ValidatedEvent) -> SentinelResult<bool> {
        let source_ip = event.source_ip();
        if !is_external_ip(&source_ip) {
            return Ok(false);
        }

        bounded(
            "deception network",
            self.timeout,
            self.collaborators.deception.detect_interaction(
                &source_ip,
                event.dest_ip(),
                event.dest_port(),
                event.protocol(),
            ),
        )
        .await
    }

    async fn respond(&self, assessment: ThreatAssessment) -> SentinelResult<ThreatAssessment> {
        let response = &self.collaborators.response;
        let plan = bounded(
            "response engine",
            self.timeout,
            response.evaluate_threat(&assessment),
        )
        .await?;

        if !self.autonomous {
            info!(
                threat_id = %plan.threat_id,
                escalation = plan.escalation_level,
                "Response proposed, awaiting approval"
            );
            return Ok(assessment);
        }

        let outcome = bounded(
            "response engine",
            self.timeout,
            response.execute_response(&plan),
        )
        .await?;
        info!(
            threat_id = %plan.threat_id,
            escalation = plan.escalation_level,
            success = outcome.success,
            "Autonomous response executed"
        );

        Ok(assessment.with_response(plan, outcome))
    }

    /// Fire-and-forget share; failures are only logged.
    fn share(&self, federation: Arc<dyn FederationNode>, assessment: ThreatAssessment) {
        let limit = self.timeout;
        tokio::spawn(async move {
            let shared = bounded(
                "federation",
                limit,
                federation.share_threat_intelligence(&assessment),
            )
            .await;
            match shared {
                Ok(()) => debug!(threat_id = %assessment.threat_id, "Threat shared with federation"),
                Err(err) => warn!(
                    threat_id = %assessment.threat_id,
                    error = %err,
                    "Failed to share threat with federation"
                ),
            }
        });
    }
}
