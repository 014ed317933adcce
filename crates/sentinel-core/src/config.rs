//! Orchestrator configuration.
//!
//! A [`SystemConfig`] is built once, validated once, and never reloaded.

use std::time::Duration;

use sentinel_types::{DefenseLevel, SystemMode};
use serde::{Deserialize, Serialize};

use crate::error::{SentinelError, SentinelResult};
use crate::monitor::ResourceKind;

/// Configuration for one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Operational mode.
    #[serde(default)]
    pub mode: SystemMode,

    /// Defense level at startup.
    #[serde(default)]
    pub defense_level: DefenseLevel,

    /// Resource budget as usage fractions.
    #[serde(default)]
    pub resource_budget: ResourceBudget,

    /// Hyperparameters forwarded to the threat scorer.
    #[serde(default)]
    pub learning: LearningConfig,

    /// Deception network settings.
    #[serde(default)]
    pub deception: DeceptionConfig,

    /// Response engine settings.
    #[serde(default)]
    pub response: ResponseConfig,

    /// Federation settings.
    #[serde(default)]
    pub federation: FederationConfig,

    /// Defense controller and history policy.
    #[serde(default)]
    pub policy: DefensePolicy,

    /// Background cycle timing.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Upper bound for any single collaborator call, in milliseconds.
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            mode: SystemMode::Production,
            defense_level: DefenseLevel::Standard,
            resource_budget: ResourceBudget::default(),
            learning: LearningConfig::default(),
            deception: DeceptionConfig::default(),
            response: ResponseConfig::default(),
            federation: FederationConfig::default(),
            policy: DefensePolicy::default(),
            monitor: MonitorConfig::default(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
        }
    }
}

impl SystemConfig {
    /// Default configuration for a given mode.
    pub fn for_mode(mode: SystemMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> SentinelResult<()> {
        self.resource_budget.validate()?;
        self.policy.validate()?;
        self.monitor.validate()?;

        if self.collaborator_timeout_ms == 0 {
            return Err(SentinelError::Configuration(
                "collaborator_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.learning.learning_rate > 0.0 && self.learning.learning_rate <= 1.0) {
            return Err(SentinelError::Configuration(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning.learning_rate
            )));
        }
        if self.learning.memory_size == 0 {
            return Err(SentinelError::Configuration(
                "learning.memory_size must be greater than zero".to_string(),
            ));
        }
        if self.federation.enabled && self.federation.discovery_url.as_deref() == Some("") {
            return Err(SentinelError::Configuration(
                "federation.discovery_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    /// Mode-specific collaborator defaults.
    pub fn mode_profile(&self) -> ModeProfile {
        ModeProfile::for_mode(self.mode)
    }

    /// Whether proposed responses run without human approval.
    pub fn autonomous_response(&self) -> bool {
        self.mode_profile()
            .autonomous_response
            .unwrap_or(self.response.autonomous)
    }

    /// Scoring threshold multiplier after mode defaults are applied.
    pub fn threshold_multiplier(&self) -> f64 {
        self.mode_profile()
            .threshold_multiplier
            .unwrap_or(self.learning.threshold_multiplier)
    }

    /// Whether the deception network is active after mode defaults are applied.
    pub fn deception_active(&self) -> bool {
        self.mode_profile()
            .deception_active
            .unwrap_or(self.deception.active)
    }
}

/// Collaborator overrides activated by a mode at startup.
///
/// `None` leaves the configured value in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModeProfile {
    pub threshold_multiplier: Option<f64>,
    pub deception_active: Option<bool>,
    pub autonomous_response: Option<bool>,
}

impl ModeProfile {
    pub fn for_mode(mode: SystemMode) -> Self {
        match mode {
            SystemMode::Production => Self {
                threshold_multiplier: Some(0.8),
                deception_active: Some(true),
                autonomous_response: Some(true),
            },
            SystemMode::Testing => Self {
                threshold_multiplier: Some(0.5),
                deception_active: Some(true),
                autonomous_response: Some(false),
            },
            SystemMode::Development | SystemMode::Staging => Self::default(),
        }
    }
}

/// Maximum usage fraction per resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBudget {
    #[serde(default = "default_cpu_budget")]
    pub cpu: f64,

    #[serde(default = "default_memory_budget")]
    pub memory: f64,

    #[serde(default = "default_bandwidth_budget")]
    pub bandwidth: f64,

    /// Unbudgeted unless set.
    #[serde(default)]
    pub disk: Option<f64>,
}

impl Default for ResourceBudget {
    fn default() -> Self {
        Self {
            cpu: default_cpu_budget(),
            memory: default_memory_budget(),
            bandwidth: default_bandwidth_budget(),
            disk: None,
        }
    }
}

impl ResourceBudget {
    /// Budgeted fraction for a resource kind (1.0 when unbudgeted).
    pub fn limit(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Cpu => self.cpu,
            ResourceKind::Memory => self.memory,
            ResourceKind::Bandwidth => self.bandwidth,
            ResourceKind::Disk => self.disk.unwrap_or(1.0),
        }
    }

    fn validate(&self) -> SentinelResult<()> {
        for kind in ResourceKind::ALL {
            let limit = self.limit(kind);
            if !(0.0..=1.0).contains(&limit) {
                return Err(SentinelError::Configuration(format!(
                    "resource budget for {} must be within [0, 1], got {}",
                    kind, limit
                )));
            }
        }
        Ok(())
    }
}

/// Hyperparameters forwarded to the threat scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_memory_size")]
    pub memory_size: usize,

    /// Multiplier applied to the scorer's severity thresholds.
    #[serde(default = "default_threshold_multiplier")]
    pub threshold_multiplier: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            memory_size: default_memory_size(),
            threshold_multiplier: default_threshold_multiplier(),
        }
    }
}

/// Deception network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeceptionConfig {
    /// IPv4 CIDR range decoys are allocated from.
    #[serde(default = "default_deception_network")]
    pub network: String,

    #[serde(default = "default_decoy_count")]
    pub decoy_count: usize,

    #[serde(default = "default_true")]
    pub active: bool,
}

impl Default for DeceptionConfig {
    fn default() -> Self {
        Self {
            network: default_deception_network(),
            decoy_count: default_decoy_count(),
            active: true,
        }
    }
}

/// Response engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Execute proposed responses without human approval.
    #[serde(default = "default_true")]
    pub autonomous: bool,

    /// Highest escalation rank the engine may propose.
    #[serde(default = "default_max_escalation")]
    pub max_escalation: u8,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            autonomous: true,
            max_escalation: default_max_escalation(),
        }
    }
}

/// Federation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FederationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub discovery_url: Option<String>,

    /// Statically known peer addresses.
    #[serde(default)]
    pub peers: Vec<String>,
}

/// Policy parameters for the defense controller and history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefensePolicy {
    /// Look-back window for counting recent threats, in seconds.
    #[serde(default = "default_escalation_window")]
    pub escalation_window_secs: u64,

    /// Escalate to paranoid when recent threats exceed this count.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: usize,

    /// Event log retention window, in seconds.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    #[serde(default = "default_threat_log_capacity")]
    pub threat_log_capacity: usize,
}

impl Default for DefensePolicy {
    fn default() -> Self {
        Self {
            escalation_window_secs: default_escalation_window(),
            escalation_threshold: default_escalation_threshold(),
            retention_secs: default_retention(),
            event_log_capacity: default_event_log_capacity(),
            threat_log_capacity: default_threat_log_capacity(),
        }
    }
}

impl DefensePolicy {
    pub fn escalation_window(&self) -> Duration {
        Duration::from_secs(self.escalation_window_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    fn validate(&self) -> SentinelResult<()> {
        if self.event_log_capacity == 0 || self.threat_log_capacity == 0 {
            return Err(SentinelError::Configuration(
                "history capacities must be greater than zero".to_string(),
            ));
        }
        if self.escalation_window_secs == 0 || self.retention_secs == 0 {
            return Err(SentinelError::Configuration(
                "escalation window and retention must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Background cycle timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between healthy cycles, in seconds.
    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,

    /// Delay after a failed cycle, in seconds.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    fn validate(&self) -> SentinelResult<()> {
        if self.interval_secs == 0 || self.error_backoff_secs == 0 {
            return Err(SentinelError::Configuration(
                "monitor intervals must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_collaborator_timeout_ms() -> u64 {
    5_000
}

fn default_cpu_budget() -> f64 {
    0.3
}

fn default_memory_budget() -> f64 {
    0.5
}

fn default_bandwidth_budget() -> f64 {
    0.2
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_memory_size() -> usize {
    10_000
}

fn default_threshold_multiplier() -> f64 {
    1.0
}

fn default_deception_network() -> String {
    "10.0.0.0/24".to_string()
}

fn default_decoy_count() -> usize {
    5
}

fn default_max_escalation() -> u8 {
    3
}

fn default_escalation_window() -> u64 {
    300
}

fn default_escalation_threshold() -> usize {
    20
}

fn default_retention() -> u64 {
    24 * 3600
}

fn default_event_log_capacity() -> usize {
    10_000
}

fn default_threat_log_capacity() -> usize {
    5_000
}

fn default_monitor_interval() -> u64 {
    30
}

fn default_error_backoff() -> u64 {
    60
}
