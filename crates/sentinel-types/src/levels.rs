//! Ordinal levels: threat severity, defense posture and operational mode

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Severity classification produced by the threat scorer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    #[default]
    Benign,
    Suspicious,
    Malicious,
    Critical,
}

impl ThreatLevel {
    /// Elevated threats are recorded in the threat log and routed to the response engine.
    pub fn is_elevated(&self) -> bool {
        *self >= ThreatLevel::Malicious
    }

    /// Only critical threats are shared with federation peers.
    pub fn is_shareable(&self) -> bool {
        *self >= ThreatLevel::Critical
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Benign => "BENIGN",
            ThreatLevel::Suspicious => "SUSPICIOUS",
            ThreatLevel::Malicious => "MALICIOUS",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatLevel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BENIGN" => Ok(ThreatLevel::Benign),
            "SUSPICIOUS" => Ok(ThreatLevel::Suspicious),
            "MALICIOUS" => Ok(ThreatLevel::Malicious),
            "CRITICAL" => Ok(ThreatLevel::Critical),
            _ => Err(TypesError::UnknownThreatLevel(s.to_string())),
        }
    }
}

/// System-wide defense posture.
///
/// The ordering is only used for reporting; transitions are driven by the
/// defense controller's rules, not by comparisons.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum DefenseLevel {
    Passive,
    #[default]
    Standard,
    Aggressive,
    Paranoid,
}

impl DefenseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefenseLevel::Passive => "passive",
            DefenseLevel::Standard => "standard",
            DefenseLevel::Aggressive => "aggressive",
            DefenseLevel::Paranoid => "paranoid",
        }
    }
}

impl fmt::Display for DefenseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefenseLevel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passive" => Ok(DefenseLevel::Passive),
            "standard" => Ok(DefenseLevel::Standard),
            "aggressive" => Ok(DefenseLevel::Aggressive),
            "paranoid" => Ok(DefenseLevel::Paranoid),
            _ => Err(TypesError::UnknownDefenseLevel(s.to_string())),
        }
    }
}

/// Operational mode of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SystemMode {
    /// Local development; collaborator defaults are left untouched.
    #[serde(rename = "dev", alias = "development")]
    Development,

    /// Test deployments: looser scoring threshold, no autonomous response.
    #[serde(rename = "test", alias = "testing")]
    Testing,

    /// Pre-production; collaborator defaults are left untouched.
    #[serde(rename = "staging")]
    Staging,

    /// Production: tighter scoring threshold and autonomous response.
    #[default]
    #[serde(rename = "production", alias = "prod")]
    Production,
}

impl SystemMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemMode::Development => "dev",
            SystemMode::Testing => "test",
            SystemMode::Staging => "staging",
            SystemMode::Production => "production",
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(SystemMode::Development),
            "test" | "testing" => Ok(SystemMode::Testing),
            "staging" => Ok(SystemMode::Staging),
            "production" | "prod" => Ok(SystemMode::Production),
            _ => Err(TypesError::UnknownSystemMode(s.to_string())),
        }
    }
}
