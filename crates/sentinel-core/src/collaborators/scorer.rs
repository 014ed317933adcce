//! Rule-based threat scorer.
//!
//! Adds weighted indicators into an anomaly score in `[0, 1]` and maps it to
//! a threat level through thresholds scaled by the threshold multiplier.
//! Sources seen repeatedly contribute a small learned bonus; the memory of
//! sources is bounded and forgets the least recently seen source first.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sentinel_types::{is_external_ip, ThreatLevel, ValidatedEvent};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{ScorerStats, ThreatScore, ThreatScorer};
use crate::config::LearningConfig;
use crate::error::SentinelResult;

/// Ports commonly targeted by lateral movement and brute force.
const SENSITIVE_PORTS: [u16; 8] = [22, 23, 445, 1433, 3306, 3389, 5432, 6379];

const SUSPICIOUS_THRESHOLD: f64 = 0.3;
const MALICIOUS_THRESHOLD: f64 = 0.6;
const CRITICAL_THRESHOLD: f64 = 0.85;

const EXTERNAL_SOURCE_WEIGHT: f64 = 0.2;
const SENSITIVE_PORT_WEIGHT: f64 = 0.25;
const SIGNATURE_WEIGHT: f64 = 0.4;
const FAILED_LOGIN_WEIGHT: f64 = 0.05;
const FAILED_LOGIN_CAP: f64 = 0.3;
const LARGE_PAYLOAD_WEIGHT: f64 = 0.1;
const LARGE_PAYLOAD_BYTES: f64 = 1_000_000.0;
const REPEAT_SOURCE_CAP: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
struct SourceMemory {
    seen: u64,
    tick: u64,
}

/// Per-source sighting counts with a recency index.
#[derive(Debug, Default)]
struct SourceTable {
    entries: HashMap<String, SourceMemory>,
    /// Last-seen tick to source, oldest first.
    recency: BTreeMap<u64, String>,
    next_tick: u64,
}

impl SourceTable {
    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Count a sighting of `source` and return the previous count, evicting
    /// the least recently seen sources to stay within `capacity`.
    fn observe(&mut self, source: &str, capacity: usize) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;

        if let Some(memory) = self.entries.get_mut(source) {
            self.recency.remove(&memory.tick);
            let previous = memory.seen;
            memory.seen += 1;
            memory.tick = tick;
            self.recency.insert(tick, source.to_string());
            return previous;
        }

        while self.entries.len() >= capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.entries
            .insert(source.to_string(), SourceMemory { seen: 1, tick });
        self.recency.insert(tick, source.to_string());
        0
    }
}

/// Threat scorer built from static indicators.
#[derive(Debug)]
pub struct RuleBasedScorer {
    learning_rate: f64,
    memory_size: usize,
    /// `f64` bits of the current threshold multiplier.
    multiplier: AtomicU64,
    sources: RwLock<SourceTable>,
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl RuleBasedScorer {
    pub fn new(learning_rate: f64, memory_size: usize, threshold_multiplier: f64) -> Self {
        Self {
            learning_rate,
            memory_size: memory_size.max(1),
            multiplier: AtomicU64::new(threshold_multiplier.to_bits()),
            sources: RwLock::new(SourceTable::default()),
        }
    }

    pub fn from_config(config: &LearningConfig) -> Self {
        Self::new(
            config.learning_rate,
            config.memory_size,
            config.threshold_multiplier,
        )
    }

    pub fn threshold_multiplier(&self) -> f64 {
        f64::from_bits(self.multiplier.load(Ordering::Relaxed))
    }

    /// Score from stateless indicators alone.
    fn indicator_score(event: &ValidatedEvent) -> f64 {
        let mut score = 0.0;

        if is_external_ip(&event.source_ip()) {
            score += EXTERNAL_SOURCE_WEIGHT;
        }
        if SENSITIVE_PORTS.contains(&event.dest_port()) {
            score += SENSITIVE_PORT_WEIGHT;
        }
        if ["signature", "malware_signature"]
            .iter()
            .any(|key| event.get_str(key).is_some_and(|s| !s.trim().is_empty()))
        {
            score += SIGNATURE_WEIGHT;
        }
        if let Some(failed) = number(event.get("failed_logins")) {
            score += (failed.max(0.0) * FAILED_LOGIN_WEIGHT).min(FAILED_LOGIN_CAP);
        }
        if number(event.get("payload_size")).is_some_and(|size| size > LARGE_PAYLOAD_BYTES) {
            score += LARGE_PAYLOAD_WEIGHT;
        }

        score
    }

    /// Remember `source` and return how often it was seen before.
    async fn observe(&self, source: &str) -> u64 {
        if source.is_empty() {
            return 0;
        }

        self.sources
            .write()
            .await
            .observe(source, self.memory_size)
    }

    fn classify(&self, score: f64) -> ThreatLevel {
        let multiplier = self.threshold_multiplier();
        if score >= CRITICAL_THRESHOLD * multiplier {
            ThreatLevel::Critical
        } else if score >= MALICIOUS_THRESHOLD * multiplier {
            ThreatLevel::Malicious
        } else if score >= SUSPICIOUS_THRESHOLD * multiplier {
            ThreatLevel::Suspicious
        } else {
            ThreatLevel::Benign
        }
    }
}

#[async_trait]
impl ThreatScorer for RuleBasedScorer {
    async fn analyze(&self, event: &ValidatedEvent) -> SentinelResult<ThreatScore> {
        let previous = self.observe(&event.source_ip()).await;
        let repeat_bonus =
            (self.learning_rate * (previous as f64).ln_1p()).min(REPEAT_SOURCE_CAP);

        let anomaly_score = (Self::indicator_score(event) + repeat_bonus).clamp(0.0, 1.0);
        let threat_level = self.classify(anomaly_score);
        debug!(anomaly_score, %threat_level, previous, "Scored event");

        Ok(ThreatScore {
            anomaly_score,
            threat_level,
        })
    }

    async fn set_threshold_multiplier(&self, multiplier: f64) {
        info!(multiplier, "Threshold multiplier updated");
        self.multiplier.store(multiplier.to_bits(), Ordering::Relaxed);
    }

    async fn statistics(&self) -> ScorerStats {
        let learned = self.sources.read().await.len();
        ScorerStats {
            patterns_learned: learned,
            memory_usage: learned as f64 / self.memory_size as f64,
        }
    }
}
