//! Bounded event and threat history with running metrics.
//!
//! Both logs are FIFO ring buffers: appending beyond capacity evicts the
//! oldest entry. The event log is additionally trimmed to the retention window
//! on every cleanup. All state sits behind one lock, so readers always see a
//! consistent snapshot of logs and metrics.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sentinel_types::ThreatAssessment;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::DefensePolicy;
use crate::monitor::ResourceSample;

/// Running counters for the orchestrator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub events_processed: u64,
    pub threats_detected: u64,
    pub false_positives: u64,
    pub events_failed: u64,
    /// Mean processing time in seconds over `events_processed` samples.
    pub avg_processing_time: f64,
    /// Latest resource sample, replaced every monitor cycle.
    pub resource_usage: ResourceSample,
}

impl SystemMetrics {
    fn record_processed(&mut self, processing_time: f64) {
        self.events_processed += 1;
        let n = self.events_processed as f64;
        self.avg_processing_time = (self.avg_processing_time * (n - 1.0) + processing_time) / n;
    }
}

/// Read-only copy of history counts and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub event_log_len: usize,
    pub threat_log_len: usize,
    pub metrics: SystemMetrics,
}

/// What a cleanup pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Event log entries older than the retention window
    pub expired: usize,
    /// Entries removed to respect capacity
    pub evicted: usize,
}

#[derive(Debug, Default)]
struct HistoryInner {
    events: VecDeque<ThreatAssessment>,
    threats: VecDeque<ThreatAssessment>,
    metrics: SystemMetrics,
}

/// Shared history store.
#[derive(Debug)]
pub struct HistoryStore {
    inner: RwLock<HistoryInner>,
    event_capacity: usize,
    threat_capacity: usize,
}

fn cutoff(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
}

fn push_capped(log: &mut VecDeque<ThreatAssessment>, capacity: usize, entry: ThreatAssessment) {
    while log.len() >= capacity {
        log.pop_front();
    }
    log.push_back(entry);
}

fn recap(log: &mut VecDeque<ThreatAssessment>, capacity: usize) -> usize {
    let excess = log.len().saturating_sub(capacity);
    log.drain(..excess);
    excess
}

fn tail(log: &VecDeque<ThreatAssessment>, limit: usize) -> Vec<ThreatAssessment> {
    let skip = log.len().saturating_sub(limit);
    log.iter().skip(skip).cloned().collect()
}

impl HistoryStore {
    pub fn new(event_capacity: usize, threat_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HistoryInner::default()),
            event_capacity: event_capacity.max(1),
            threat_capacity: threat_capacity.max(1),
        }
    }

    pub fn from_policy(policy: &DefensePolicy) -> Self {
        Self::new(policy.event_log_capacity, policy.threat_log_capacity)
    }

    /// Append to the event log.
    pub async fn append(&self, assessment: ThreatAssessment) {
        let mut inner = self.inner.write().await;
        push_capped(&mut inner.events, self.event_capacity, assessment);
    }

    /// Append to the threat log when the assessment is elevated.
    ///
    /// Counts the threat in `threats_detected` under the same lock.
    pub async fn append_if_threat(&self, assessment: &ThreatAssessment) -> bool {
        if !assessment.is_elevated() {
            return false;
        }

        let mut inner = self.inner.write().await;
        push_capped(&mut inner.threats, self.threat_capacity, assessment.clone());
        inner.metrics.threats_detected += 1;
        true
    }

    /// Count one processed event and fold its duration into the running mean.
    pub async fn record_processed(&self, processing_time: Duration) {
        self.inner
            .write()
            .await
            .metrics
            .record_processed(processing_time.as_secs_f64());
    }

    pub async fn record_failure(&self) {
        self.inner.write().await.metrics.events_failed += 1;
    }

    pub async fn update_resource_usage(&self, sample: ResourceSample) {
        self.inner.write().await.metrics.resource_usage = sample;
    }

    /// Drop event log entries older than `retention` and re-cap both logs.
    pub async fn cleanup(&self, retention: Duration) -> CleanupReport {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        let before = inner.events.len();
        if let Some(cutoff) = cutoff(now, retention) {
            inner.events.retain(|entry| entry.timestamp >= cutoff);
        }
        let expired = before - inner.events.len();

        let evicted = recap(&mut inner.events, self.event_capacity)
            + recap(&mut inner.threats, self.threat_capacity);

        if expired > 0 || evicted > 0 {
            debug!(expired, evicted, remaining = inner.events.len(), "History cleanup");
        }

        CleanupReport { expired, evicted }
    }

    /// Number of threat log entries no older than `window`.
    pub async fn recent_threat_count(&self, window: Duration) -> usize {
        let now = Utc::now();
        let inner = self.inner.read().await;
        match cutoff(now, window) {
            Some(cutoff) => inner
                .threats
                .iter()
                .filter(|entry| entry.timestamp >= cutoff)
                .count(),
            None => inner.threats.len(),
        }
    }

    pub async fn snapshot(&self) -> HistorySnapshot {
        let inner = self.inner.read().await;
        HistorySnapshot {
            event_log_len: inner.events.len(),
            threat_log_len: inner.threats.len(),
            metrics: inner.metrics.clone(),
        }
    }

    /// The newest `limit` event log entries, oldest first.
    pub async fn recent_events(&self, limit: usize) -> Vec<ThreatAssessment> {
        tail(&self.inner.read().await.events, limit)
    }

    /// The newest `limit` threat log entries, oldest first.
    pub async fn recent_threats(&self, limit: usize) -> Vec<ThreatAssessment> {
        tail(&self.inner.read().await.threats, limit)
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    pub fn threat_capacity(&self) -> usize {
        self.threat_capacity
    }
}
