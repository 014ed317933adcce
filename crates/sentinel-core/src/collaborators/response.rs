//! Rule-based response engine.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sentinel_types::{
    DefenseLevel, ResponseAction, ResponseOutcome, ResponsePlan, ThreatAssessment, ThreatLevel,
};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use super::{ResponseEngine, ResponseStats};
use crate::error::SentinelResult;

/// Proposes responses from the threat level, shifted by the current posture.
///
/// The escalation rank is the level's base rank plus a posture modifier,
/// capped at `max_escalation`. Every action up to that rank is proposed.
#[derive(Debug)]
pub struct RuleBasedResponseEngine {
    max_escalation: u8,
    posture: RwLock<DefenseLevel>,
    executed: AtomicU64,
}

fn base_escalation(level: ThreatLevel) -> i16 {
    match level {
        ThreatLevel::Benign => 0,
        ThreatLevel::Suspicious => 1,
        ThreatLevel::Malicious => 2,
        ThreatLevel::Critical => 3,
    }
}

fn posture_modifier(level: DefenseLevel) -> i16 {
    match level {
        DefenseLevel::Passive => -1,
        DefenseLevel::Standard => 0,
        DefenseLevel::Aggressive | DefenseLevel::Paranoid => 1,
    }
}

impl RuleBasedResponseEngine {
    pub fn new(max_escalation: u8, posture: DefenseLevel) -> Self {
        Self {
            max_escalation,
            posture: RwLock::new(posture),
            executed: AtomicU64::new(0),
        }
    }

    fn actions_for(assessment: &ThreatAssessment, escalation: u8) -> Vec<ResponseAction> {
        let source = assessment.event.source_ip();
        let mut actions = vec![ResponseAction::Monitor];

        if escalation >= 1 {
            actions.push(ResponseAction::Alert {
                message: format!(
                    "{} threat {} from {}",
                    assessment.threat_level,
                    assessment.threat_id,
                    if source.is_empty() { "unknown source" } else { &*source }
                ),
            });
        }
        if source.is_empty() {
            return actions;
        }

        if escalation >= 2 {
            actions.push(if assessment.is_decoy_interaction {
                ResponseAction::RedirectToDecoy {
                    ip: source.to_string(),
                }
            } else {
                ResponseAction::RateLimit {
                    target: source.to_string(),
                }
            });
        }
        if escalation >= 3 {
            actions.push(ResponseAction::BlockIp {
                ip: source.to_string(),
            });
        }
        if escalation >= 4 {
            if let Some(host) = assessment.event.dest_ip() {
                actions.push(ResponseAction::IsolateHost {
                    host: host.to_string(),
                });
            }
        }

        actions
    }
}

#[async_trait]
impl ResponseEngine for RuleBasedResponseEngine {
    async fn evaluate_threat(&self, assessment: &ThreatAssessment) -> SentinelResult<ResponsePlan> {
        let posture = *self.posture.read().await;
        let rank = base_escalation(assessment.threat_level) + posture_modifier(posture);
        let escalation = rank.clamp(0, i16::from(self.max_escalation)) as u8;

        Ok(ResponsePlan {
            threat_id: assessment.threat_id.clone(),
            threat_level: assessment.threat_level,
            escalation_level: escalation,
            actions: Self::actions_for(assessment, escalation),
            rationale: format!(
                "{} threat under {} posture (escalation {}/{})",
                assessment.threat_level, posture, escalation, self.max_escalation
            ),
        })
    }

    #[instrument(skip_all, fields(threat_id = %plan.threat_id, escalation = plan.escalation_level))]
    async fn execute_response(&self, plan: &ResponsePlan) -> SentinelResult<ResponseOutcome> {
        for action in &plan.actions {
            info!(?action, "Executing response action");
        }
        self.executed.fetch_add(1, Ordering::Relaxed);
        Ok(ResponseOutcome::succeeded(plan.actions.clone()))
    }

    async fn on_posture_change(&self, level: DefenseLevel) {
        *self.posture.write().await = level;
    }

    async fn statistics(&self) -> ResponseStats {
        ResponseStats {
            responses_executed: self.executed.load(Ordering::Relaxed),
            posture: *self.posture.read().await,
        }
    }
}
