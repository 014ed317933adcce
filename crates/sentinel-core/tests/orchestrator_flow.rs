use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sentinel_core::{
    Collaborators, DeceptionNetwork, DeceptionStats, ErrorKind, FederationNode,
    FixedResourceMonitor, LifecycleStatus, Orchestrator, ResourceKind, ResourceMonitor,
    ResourceSample, ScorerStats, SentinelError, SentinelResult, SystemConfig, ThreatScore,
    ThreatScorer,
};
use sentinel_types::{DefenseLevel, Event, SystemMode, ThreatAssessment, ThreatLevel, ValidatedEvent};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> SystemConfig {
    let mut config = SystemConfig::for_mode(SystemMode::Development);
    config.monitor.interval_secs = 3600;
    config
}

/// Records every decoy lookup.
#[derive(Debug, Default)]
struct RecordingDeception {
    lookups: Mutex<Vec<(String, Option<String>, u16, String)>>,
}

impl RecordingDeception {
    fn lookups(&self) -> Vec<(String, Option<String>, u16, String)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeceptionNetwork for RecordingDeception {
    async fn detect_interaction(
        &self,
        source_ip: &str,
        dest_ip: Option<&str>,
        dest_port: u16,
        protocol: &str,
    ) -> SentinelResult<bool> {
        self.lookups.lock().unwrap().push((
            source_ip.to_string(),
            dest_ip.map(str::to_string),
            dest_port,
            protocol.to_string(),
        ));
        Ok(false)
    }

    async fn set_active(&self, _active: bool) {}

    async fn statistics(&self) -> DeceptionStats {
        DeceptionStats::default()
    }
}

/// Reads the threat level from the event's `level` field.
#[derive(Debug, Default)]
struct LabelScorer;

#[async_trait]
impl ThreatScorer for LabelScorer {
    async fn analyze(&self, event: &ValidatedEvent) -> SentinelResult<ThreatScore> {
        let threat_level = event
            .get_str("level")
            .and_then(|level| level.parse().ok())
            .unwrap_or(ThreatLevel::Benign);
        Ok(ThreatScore {
            anomaly_score: 0.5,
            threat_level,
        })
    }

    async fn set_threshold_multiplier(&self, _multiplier: f64) {}

    async fn statistics(&self) -> ScorerStats {
        ScorerStats::default()
    }
}

#[derive(Debug)]
enum BrokenScorer {
    Failing,
    Slow,
    NotANumber,
}

#[async_trait]
impl ThreatScorer for BrokenScorer {
    async fn analyze(&self, _event: &ValidatedEvent) -> SentinelResult<ThreatScore> {
        match self {
            BrokenScorer::Failing => Err(SentinelError::collaborator("threat scorer", "model offline")),
            BrokenScorer::Slow => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(ThreatScore {
                    anomaly_score: 0.0,
                    threat_level: ThreatLevel::Benign,
                })
            }
            BrokenScorer::NotANumber => Ok(ThreatScore {
                anomaly_score: f64::NAN,
                threat_level: ThreatLevel::Benign,
            }),
        }
    }

    async fn set_threshold_multiplier(&self, _multiplier: f64) {}

    async fn statistics(&self) -> ScorerStats {
        ScorerStats::default()
    }
}

#[derive(Debug, Default)]
struct CountingFederation {
    joins: AtomicUsize,
    leaves: AtomicUsize,
    shares: AtomicUsize,
}

#[async_trait]
impl FederationNode for CountingFederation {
    async fn join(&self) -> SentinelResult<()> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn leave(&self) -> SentinelResult<()> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn share_threat_intelligence(&self, _assessment: &ThreatAssessment) -> SentinelResult<()> {
        self.shares.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connected_peers(&self) -> usize {
        3
    }
}

/// Monitor that always fails and counts attempts.
#[derive(Debug, Default)]
struct FailingMonitor {
    samples: AtomicUsize,
}

#[async_trait]
impl ResourceMonitor for FailingMonitor {
    async fn sample(&self) -> SentinelResult<ResourceSample> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        Err(SentinelError::collaborator("resource monitor", "sensor unavailable"))
    }
}

/// Monitor whose samples take `delay` to arrive.
#[derive(Debug)]
struct SlowMonitor {
    delay: Duration,
    samples: AtomicUsize,
}

#[async_trait]
impl ResourceMonitor for SlowMonitor {
    async fn sample(&self) -> SentinelResult<ResourceSample> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ResourceSample::idle())
    }
}

/// Scorer that never acknowledges a threshold change.
#[derive(Debug, Default)]
struct StalledScorer;

#[async_trait]
impl ThreatScorer for StalledScorer {
    async fn analyze(&self, _event: &ValidatedEvent) -> SentinelResult<ThreatScore> {
        Ok(ThreatScore {
            anomaly_score: 0.0,
            threat_level: ThreatLevel::Benign,
        })
    }

    async fn set_threshold_multiplier(&self, _multiplier: f64) {
        std::future::pending::<()>().await
    }

    async fn statistics(&self) -> ScorerStats {
        ScorerStats::default()
    }
}

fn labelled(level: ThreatLevel, n: usize) -> Event {
    Event::new()
        .with("source_ip", format!("203.0.113.{}", n % 250))
        .with("level", level.as_str())
        .with("seq", n)
}

async fn start_with(
    config: SystemConfig,
    build: impl FnOnce(Collaborators) -> Collaborators,
) -> Arc<Orchestrator> {
    init_tracing();
    let collaborators = build(Collaborators::reference(&config).unwrap());
    Orchestrator::start(config, collaborators).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_events_are_all_counted() {
    let orchestrator = start_with(config(), |c| c).await;

    let handles: Vec<_> = (0..100)
        .map(|n| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let event = Event::new()
                    .with("source_ip", format!("198.51.100.{}", n % 200))
                    .with("dest_port", 8080)
                    .with("seq", n);
                orchestrator.process_event(&event).await
            })
        })
        .collect();

    for outcome in futures::future::join_all(handles).await {
        assert!(!outcome.unwrap().is_failure());
    }

    let status = orchestrator.status().await;
    assert_eq!(status.metrics.events_processed, 100);
    assert_eq!(status.events.event_log, 100);
    assert!(status.metrics.avg_processing_time >= 0.0);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn internal_sources_skip_decoy_lookup() {
    let deception = Arc::new(RecordingDeception::default());
    let orchestrator = {
        let deception = Arc::clone(&deception);
        start_with(config(), move |c| c.with_deception(deception)).await
    };

    for source in ["10.1.2.3", "172.16.0.9", "192.168.1.20", "localhost", " 127.0.0.1 "] {
        orchestrator
            .process_event(&Event::new().with("source_ip", source))
            .await;
    }
    orchestrator.process_event(&Event::new().with("dest_port", 22)).await;
    orchestrator
        .process_event(&Event::new().with("source_ip", ""))
        .await;
    assert!(deception.lookups().is_empty());

    orchestrator
        .process_event(
            &Event::new()
                .with("source_ip", "203.0.113.5")
                .with("dest_ip", "10.0.0.2"),
        )
        .await;
    orchestrator
        .process_event(&Event::new().with("source_ip", "not-an-ip"))
        .await;

    let lookups = deception.lookups();
    assert_eq!(lookups.len(), 2);
    assert_eq!(
        lookups[0],
        (
            "203.0.113.5".to_string(),
            Some("10.0.0.2".to_string()),
            0,
            "tcp".to_string()
        )
    );
    assert_eq!(lookups[1].0, "not-an-ip");

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn non_string_source_is_treated_as_external() {
    let deception = Arc::new(RecordingDeception::default());
    let orchestrator = {
        let deception = Arc::clone(&deception);
        start_with(config(), move |c| c.with_deception(deception)).await
    };

    orchestrator
        .process_event(&Event::new().with("source_ip", 3405803781u64))
        .await;
    orchestrator
        .process_event(&Event::new().with("source_ip", true))
        .await;
    orchestrator
        .process_event(&Event::new().with("source_ip", serde_json::Value::Null))
        .await;

    let sources: Vec<String> = deception.lookups().into_iter().map(|l| l.0).collect();
    assert_eq!(sources, vec!["3405803781".to_string(), "true".to_string()]);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn only_elevated_threats_reach_threat_log() {
    let orchestrator = start_with(config(), |c| c.with_scorer(Arc::new(LabelScorer))).await;

    let levels = [
        ThreatLevel::Benign,
        ThreatLevel::Suspicious,
        ThreatLevel::Malicious,
        ThreatLevel::Critical,
    ];
    for (n, level) in levels.into_iter().enumerate() {
        let outcome = orchestrator.process_event(&labelled(level, n)).await;
        let assessment = outcome.assessment().unwrap();
        assert_eq!(assessment.threat_level, level);
        assert_eq!(assessment.response_executed.is_some(), level.is_elevated());
    }

    let status = orchestrator.status().await;
    assert_eq!(status.events.event_log, 4);
    assert_eq!(status.events.threat_log, 2);
    assert_eq!(status.metrics.threats_detected, 2);
    assert_eq!(status.components.response.stats.responses_executed, 2);

    let threats = orchestrator.recent_threats(10).await;
    assert!(threats.iter().all(|t| t.threat_level >= ThreatLevel::Malicious));

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn identical_events_share_threat_id() {
    let orchestrator = start_with(config(), |c| c).await;
    let event = Event::new()
        .with("source_ip", "203.0.113.5")
        .with("timestamp", "2024-05-01T12:00:00Z")
        .with("event_id", "abcdef0123456789");

    let first = orchestrator.process_event(&event).await;
    let second = orchestrator.process_event(&event).await;
    assert_eq!(
        first.assessment().unwrap().threat_id,
        second.assessment().unwrap().threat_id
    );

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn scorer_error_becomes_failure_record() {
    let orchestrator = start_with(config(), |c| {
        c.with_scorer(Arc::new(BrokenScorer::Failing))
    })
    .await;

    let event = Event::new()
        .with("source_ip", " localhost ")
        .with("note", "keep me");
    let outcome = orchestrator.process_event(&event).await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.error_kind, ErrorKind::Collaborator);
    assert!(failure.error.contains("model offline"));
    assert_eq!(failure.original_event, event);
    assert!(failure.original_event.get("event_id").is_none());

    let status = orchestrator.status().await;
    assert_eq!(status.metrics.events_failed, 1);
    assert_eq!(status.metrics.events_processed, 0);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn non_finite_score_is_rejected() {
    let orchestrator = start_with(config(), |c| {
        c.with_scorer(Arc::new(BrokenScorer::NotANumber))
    })
    .await;

    let outcome = orchestrator.process_event(&Event::new()).await;
    assert_eq!(outcome.failure().unwrap().error_kind, ErrorKind::Collaborator);
    assert_eq!(orchestrator.status().await.events.event_log, 0);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn slow_scorer_times_out() {
    let mut config = config();
    config.collaborator_timeout_ms = 20;
    let orchestrator = start_with(config, |c| c.with_scorer(Arc::new(BrokenScorer::Slow))).await;

    let outcome = orchestrator
        .process_event(&Event::new().with("source_ip", "203.0.113.5"))
        .await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.error_kind, ErrorKind::Collaborator);
    assert!(failure.error.contains("timed out after 20ms"));

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let mut config = config();
    config.federation.enabled = true;
    let federation = Arc::new(CountingFederation::default());
    let orchestrator = {
        let federation = Arc::clone(&federation);
        start_with(config, move |c| c.with_federation(Some(federation))).await
    };
    assert_eq!(federation.joins.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.status().await.components.federation.connected_peers, 3);

    orchestrator.shutdown().await.unwrap();
    let first = orchestrator.status().await.status;
    orchestrator.shutdown().await.unwrap();
    let second = orchestrator.status().await.status;

    assert_eq!(first, LifecycleStatus::Shutdown);
    assert_eq!(first, second);
    assert_eq!(federation.leaves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn overlapping_shutdowns_both_see_terminal_status() {
    let monitor = Arc::new(SlowMonitor {
        delay: Duration::from_millis(200),
        samples: AtomicUsize::new(0),
    });
    let orchestrator = {
        let monitor = Arc::clone(&monitor);
        start_with(config(), move |c| c.with_resource_monitor(monitor)).await
    };

    // Let the first cycle get stuck in the monitor
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(monitor.samples.load(Ordering::SeqCst), 1);

    let (first, second) = tokio::join!(
        async {
            orchestrator.shutdown().await.unwrap();
            orchestrator.lifecycle().await
        },
        async {
            orchestrator.shutdown().await.unwrap();
            orchestrator.lifecycle().await
        },
    );

    assert_eq!(first, LifecycleStatus::Shutdown);
    assert_eq!(second, LifecycleStatus::Shutdown);
    assert_eq!(monitor.samples.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stalled_collaborator_does_not_block_start() {
    let mut config = config();
    config.collaborator_timeout_ms = 20;

    let started = tokio::time::timeout(
        Duration::from_secs(2),
        start_with(config, |c| c.with_scorer(Arc::new(StalledScorer))),
    )
    .await;
    let orchestrator = started.expect("start should not wait on the scorer");

    assert_eq!(orchestrator.lifecycle().await, LifecycleStatus::Operational);
    assert!(!orchestrator
        .process_event(&Event::new().with("source_ip", "203.0.113.5"))
        .await
        .is_failure());

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn disabled_federation_is_never_contacted() {
    let federation = Arc::new(CountingFederation::default());
    let orchestrator = {
        let federation = Arc::clone(&federation);
        start_with(config(), move |c| {
            c.with_scorer(Arc::new(LabelScorer))
                .with_federation(Some(federation))
        })
        .await
    };

    orchestrator
        .process_event(&labelled(ThreatLevel::Critical, 1))
        .await;
    orchestrator.shutdown().await.unwrap();

    assert_eq!(federation.joins.load(Ordering::SeqCst), 0);
    assert_eq!(federation.shares.load(Ordering::SeqCst), 0);
    assert_eq!(federation.leaves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn critical_threats_are_shared() {
    let mut config = config();
    config.federation.enabled = true;
    let federation = Arc::new(CountingFederation::default());
    let orchestrator = {
        let federation = Arc::clone(&federation);
        start_with(config, move |c| {
            c.with_scorer(Arc::new(LabelScorer))
                .with_federation(Some(federation))
        })
        .await
    };

    orchestrator
        .process_event(&labelled(ThreatLevel::Malicious, 1))
        .await;
    orchestrator
        .process_event(&labelled(ThreatLevel::Critical, 2))
        .await;

    for _ in 0..100 {
        if federation.shares.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(federation.shares.load(Ordering::SeqCst), 1);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn escalation_overrides_resource_downgrade() {
    let monitor = Arc::new(FixedResourceMonitor::new(
        ResourceSample::idle().with(ResourceKind::Memory, 0.9),
    ));
    let orchestrator = {
        let monitor = Arc::clone(&monitor);
        start_with(config(), move |c| {
            c.with_scorer(Arc::new(LabelScorer))
                .with_resource_monitor(monitor)
        })
        .await
    };

    for n in 0..21 {
        orchestrator
            .process_event(&labelled(ThreatLevel::Malicious, n))
            .await;
    }

    let report = orchestrator.run_cycle().await.unwrap();
    assert!(report.verdict.is_warning());
    assert_eq!(report.recent_threats, 21);
    assert_eq!(report.defense_level, DefenseLevel::Paranoid);
    assert_eq!(orchestrator.defense_level().await, DefenseLevel::Paranoid);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn threshold_is_strictly_exceeded() {
    let monitor = Arc::new(FixedResourceMonitor::new(ResourceSample::idle()));
    let orchestrator = start_with(config(), move |c| {
        c.with_scorer(Arc::new(LabelScorer))
            .with_resource_monitor(monitor)
    })
    .await;

    for n in 0..20 {
        orchestrator
            .process_event(&labelled(ThreatLevel::Critical, n))
            .await;
    }
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.recent_threats, 20);
    assert_eq!(report.defense_level, DefenseLevel::Standard);

    orchestrator
        .process_event(&labelled(ThreatLevel::Critical, 20))
        .await;
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.defense_level, DefenseLevel::Paranoid);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn monitor_failure_backs_off() {
    let mut config = config();
    config.monitor.interval_secs = 1;
    config.monitor.error_backoff_secs = 60;
    let monitor = Arc::new(FailingMonitor::default());
    let orchestrator = {
        let monitor = Arc::clone(&monitor);
        start_with(config, move |c| c.with_resource_monitor(monitor)).await
    };

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(monitor.samples.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(monitor.samples.load(Ordering::SeqCst), 2);

    // the loop keeps running after failures
    assert_eq!(orchestrator.status().await.status, LifecycleStatus::Operational);
    orchestrator.shutdown().await.unwrap();
}
