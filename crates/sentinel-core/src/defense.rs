//! Defense level controller.
//!
//! Adjusts the system-wide posture once per monitor cycle from two signals:
//! the health verdict and the recent threat volume. Rules run in a fixed
//! order, so when both fire in the same cycle escalation wins:
//!
//! 1. Resource pressure: a `warning` verdict drops the level to `Passive`.
//! 2. Threat volume: more than `escalation_threshold` recent threats raises
//!    the level to `Paranoid`.
//!
//! There is no rule returning to `Standard`; a level holds until a rule moves it.

use chrono::{DateTime, Utc};
use sentinel_types::DefenseLevel;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::health::HealthVerdict;
use crate::monitor::ResourceKind;

/// Why the controller moved the defense level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TransitionReason {
    ResourcePressure { over_budget: Vec<ResourceKind> },
    ThreatVolume { recent_threats: usize, threshold: usize },
}

/// A single applied level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseTransition {
    pub from: DefenseLevel,
    pub to: DefenseLevel,
    pub reason: TransitionReason,
    pub at: DateTime<Utc>,
}

/// Evaluate both rules against `current`.
///
/// Returns the resulting level and the transitions applied on the way, in
/// rule order.
pub fn next_level(
    current: DefenseLevel,
    verdict: &HealthVerdict,
    recent_threats: usize,
    escalation_threshold: usize,
) -> (DefenseLevel, Vec<DefenseTransition>) {
    let mut level = current;
    let mut transitions = Vec::new();

    if let HealthVerdict::Warning { over_budget } = verdict {
        if level != DefenseLevel::Passive {
            transitions.push(DefenseTransition {
                from: level,
                to: DefenseLevel::Passive,
                reason: TransitionReason::ResourcePressure {
                    over_budget: over_budget.clone(),
                },
                at: Utc::now(),
            });
            level = DefenseLevel::Passive;
        }
    }

    if recent_threats > escalation_threshold && level != DefenseLevel::Paranoid {
        transitions.push(DefenseTransition {
            from: level,
            to: DefenseLevel::Paranoid,
            reason: TransitionReason::ThreatVolume {
                recent_threats,
                threshold: escalation_threshold,
            },
            at: Utc::now(),
        });
        level = DefenseLevel::Paranoid;
    }

    (level, transitions)
}

/// Owner of the current defense level.
///
/// Only the background cycle calls [`DefenseController::apply`]; everything
/// else reads.
#[derive(Debug)]
pub struct DefenseController {
    level: RwLock<DefenseLevel>,
    escalation_threshold: usize,
}

impl DefenseController {
    pub fn new(initial: DefenseLevel, escalation_threshold: usize) -> Self {
        Self {
            level: RwLock::new(initial),
            escalation_threshold,
        }
    }

    pub async fn current(&self) -> DefenseLevel {
        *self.level.read().await
    }

    /// Run one evaluation and store the resulting level.
    pub async fn apply(&self, verdict: &HealthVerdict, recent_threats: usize) -> Vec<DefenseTransition> {
        let mut level = self.level.write().await;
        let (next, transitions) =
            next_level(*level, verdict, recent_threats, self.escalation_threshold);

        for transition in &transitions {
            match &transition.reason {
                TransitionReason::ResourcePressure { over_budget } => warn!(
                    from = %transition.from,
                    to = %transition.to,
                    ?over_budget,
                    "Reduced defense level due to resource constraints"
                ),
                TransitionReason::ThreatVolume { recent_threats, threshold } => warn!(
                    from = %transition.from,
                    to = %transition.to,
                    recent_threats,
                    threshold,
                    "Elevated defense level due to high threat volume"
                ),
            }
        }

        if transitions.is_empty() {
            debug!(level = %next, %verdict, recent_threats, "Defense level unchanged");
        }

        *level = next;
        transitions
    }
}
