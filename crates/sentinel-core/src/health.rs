//! Health evaluation against the resource budget.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ResourceBudget;
use crate::monitor::{ResourceKind, ResourceSample};

/// Outcome of comparing a usage sample with the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "overall", rename_all = "snake_case")]
pub enum HealthVerdict {
    Healthy,
    Warning { over_budget: Vec<ResourceKind> },
}

impl HealthVerdict {
    pub fn is_warning(&self) -> bool {
        matches!(self, HealthVerdict::Warning { .. })
    }

    /// Issue labels in the `<resource>_over_budget` form used in logs.
    pub fn issues(&self) -> Vec<String> {
        match self {
            HealthVerdict::Healthy => Vec::new(),
            HealthVerdict::Warning { over_budget } => over_budget
                .iter()
                .map(|kind| format!("{}_over_budget", kind))
                .collect(),
        }
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthVerdict::Healthy => write!(f, "healthy"),
            HealthVerdict::Warning { .. } => write!(f, "warning"),
        }
    }
}

/// Compare every sampled resource against its budgeted fraction.
///
/// Usage strictly above the budget is an issue. Pure function of its inputs.
pub fn evaluate_health(sample: &ResourceSample, budget: &ResourceBudget) -> HealthVerdict {
    let over_budget: Vec<ResourceKind> = sample
        .iter()
        .filter(|(kind, usage)| *usage > budget.limit(*kind))
        .map(|(kind, _)| kind)
        .collect();

    if over_budget.is_empty() {
        HealthVerdict::Healthy
    } else {
        HealthVerdict::Warning { over_budget }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_budget_is_healthy() {
        let sample = ResourceSample::new()
            .with(ResourceKind::Cpu, 0.3)
            .with(ResourceKind::Memory, 0.1)
            .with(ResourceKind::Disk, 0.99);
        assert_eq!(
            evaluate_health(&sample, &ResourceBudget::default()),
            HealthVerdict::Healthy
        );
    }

    #[test]
    fn test_over_budget_lists_offenders() {
        let sample = ResourceSample::new()
            .with(ResourceKind::Cpu, 0.31)
            .with(ResourceKind::Memory, 0.4)
            .with(ResourceKind::Bandwidth, 0.5);
        let verdict = evaluate_health(&sample, &ResourceBudget::default());

        assert!(verdict.is_warning());
        assert_eq!(
            verdict,
            HealthVerdict::Warning {
                over_budget: vec![ResourceKind::Cpu, ResourceKind::Bandwidth]
            }
        );
        assert_eq!(
            verdict.issues(),
            vec!["cpu_over_budget", "bandwidth_over_budget"]
        );
    }

    #[test]
    fn test_budgeted_disk() {
        let budget = ResourceBudget {
            disk: Some(0.2),
            ..ResourceBudget::default()
        };
        let sample = ResourceSample::new().with(ResourceKind::Disk, 0.25);
        assert!(evaluate_health(&sample, &budget).is_warning());
    }

    #[test]
    fn test_empty_sample_is_healthy() {
        assert_eq!(
            evaluate_health(&ResourceSample::new(), &ResourceBudget::default()),
            HealthVerdict::Healthy
        );
    }
}
