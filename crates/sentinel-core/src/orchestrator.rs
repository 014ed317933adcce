//! Orchestrator lifecycle and the background defense cycle.
//!
//! The orchestrator owns the pipeline, history and defense controller. Once
//! started, a background task runs monitor, health evaluation, controller
//! and cleanup in that order on a fixed interval, concurrently with
//! foreground [`Orchestrator::process_event`] calls. The task only holds a
//! weak reference, so dropping the last `Arc` also ends it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sentinel_types::{DefenseLevel, Event, SystemId, SystemMode, ThreatAssessment};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::collaborators::{Collaborators, DeceptionStats, ResponseStats, ScorerStats};
use crate::config::SystemConfig;
use crate::defense::{DefenseController, DefenseTransition};
use crate::error::SentinelResult;
use crate::health::{evaluate_health, HealthVerdict};
use crate::history::{CleanupReport, HistoryStore, SystemMetrics};
use crate::monitor::ResourceSample;
use crate::pipeline::{bounded, EventPipeline, ProcessOutcome};

/// Lifecycle state of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Initializing,
    Operational,
    ShuttingDown,
    Shutdown,
}

/// What one defense cycle observed and changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub sample: ResourceSample,
    pub verdict: HealthVerdict,
    pub recent_threats: usize,
    pub transitions: Vec<DefenseTransition>,
    pub defense_level: DefenseLevel,
    pub cleanup: CleanupReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseComponent {
    #[serde(flatten)]
    pub stats: ResponseStats,
    pub autonomous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationComponent {
    pub enabled: bool,
    pub connected_peers: usize,
}

/// Counters self-reported by each collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub threat_detection: ScorerStats,
    pub deception: DeceptionStats,
    pub response: ResponseComponent,
    pub federation: FederationComponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub event_log: usize,
    pub threat_log: usize,
}

/// Read-only status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub system_id: SystemId,
    pub status: LifecycleStatus,
    pub mode: SystemMode,
    pub defense_level: DefenseLevel,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub metrics: SystemMetrics,
    pub components: ComponentStatus,
    pub events: EventCounts,
}

/// Owner of the pipeline, history and defense loop.
pub struct Orchestrator {
    system_id: SystemId,
    config: SystemConfig,
    collaborators: Collaborators,
    history: Arc<HistoryStore>,
    controller: DefenseController,
    pipeline: EventPipeline,
    lifecycle: RwLock<LifecycleStatus>,
    started_at: DateTime<Utc>,
    started: Instant,
    stop_tx: watch::Sender<bool>,
    stopped_tx: watch::Sender<bool>,
    cycle: Mutex<Option<JoinHandle<()>>>,
    federation_joined: AtomicBool,
}

impl Orchestrator {
    /// Validate `config`, wire the collaborators and start the defense cycle.
    ///
    /// A federation node is only used when federation is enabled in the
    /// configuration. Failing to join is logged and does not abort startup.
    #[instrument(skip_all, fields(mode = %config.mode))]
    pub async fn start(
        config: SystemConfig,
        mut collaborators: Collaborators,
    ) -> SentinelResult<Arc<Self>> {
        config.validate()?;

        if !config.federation.enabled && collaborators.federation.take().is_some() {
            debug!("Federation disabled, ignoring federation node");
        }

        let profile = config.mode_profile();
        let limit = config.collaborator_timeout();
        notify(
            "threat scorer",
            limit,
            collaborators
                .scorer
                .set_threshold_multiplier(config.threshold_multiplier()),
        )
        .await;
        notify(
            "deception network",
            limit,
            collaborators.deception.set_active(config.deception_active()),
        )
        .await;
        notify(
            "response engine",
            limit,
            collaborators.response.on_posture_change(config.defense_level),
        )
        .await;
        debug!(?profile, "Applied mode profile");

        let history = Arc::new(HistoryStore::from_policy(&config.policy));
        let pipeline = EventPipeline::new(collaborators.clone(), Arc::clone(&history), &config);
        let (stop_tx, stop_rx) = watch::channel(false);

        let orchestrator = Arc::new(Self {
            system_id: SystemId::generate(),
            controller: DefenseController::new(
                config.defense_level,
                config.policy.escalation_threshold,
            ),
            config,
            collaborators,
            history,
            pipeline,
            lifecycle: RwLock::new(LifecycleStatus::Initializing),
            started_at: Utc::now(),
            started: Instant::now(),
            stop_tx,
            stopped_tx: watch::channel(false).0,
            cycle: Mutex::new(None),
            federation_joined: AtomicBool::new(false),
        });

        let handle = tokio::spawn(run_cycles(Arc::downgrade(&orchestrator), stop_rx));
        *orchestrator.cycle.lock().await = Some(handle);

        if let Some(federation) = &orchestrator.collaborators.federation {
            match bounded("federation", orchestrator.timeout(), federation.join()).await {
                Ok(()) => orchestrator.federation_joined.store(true, Ordering::SeqCst),
                Err(err) => warn!(error = %err, "Failed to join federation, continuing without it"),
            }
        }

        *orchestrator.lifecycle.write().await = LifecycleStatus::Operational;
        info!(
            system_id = %orchestrator.system_id,
            defense_level = %orchestrator.config.defense_level,
            autonomous = orchestrator.pipeline.is_autonomous(),
            "Sentinel operational"
        );

        Ok(orchestrator)
    }

    fn timeout(&self) -> Duration {
        self.config.collaborator_timeout()
    }

    pub fn system_id(&self) -> &SystemId {
        &self.system_id
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn lifecycle(&self) -> LifecycleStatus {
        *self.lifecycle.read().await
    }

    pub async fn defense_level(&self) -> DefenseLevel {
        self.controller.current().await
    }

    /// Process one event through the pipeline.
    pub async fn process_event(&self, event: &Event) -> ProcessOutcome {
        self.pipeline.process(event).await
    }

    /// The newest `limit` threat log entries, oldest first.
    pub async fn recent_threats(&self, limit: usize) -> Vec<ThreatAssessment> {
        self.history.recent_threats(limit).await
    }

    /// Run one monitor, health, controller and cleanup pass.
    #[instrument(skip(self), fields(system_id = %self.system_id))]
    pub async fn run_cycle(&self) -> SentinelResult<CycleReport> {
        let sample = bounded(
            "resource monitor",
            self.timeout(),
            self.collaborators.resource_monitor.sample(),
        )
        .await?;
        self.history.update_resource_usage(sample.clone()).await;

        let verdict = evaluate_health(&sample, &self.config.resource_budget);
        if verdict.is_warning() {
            warn!(issues = ?verdict.issues(), "Resource usage over budget");
        }

        let recent_threats = self
            .history
            .recent_threat_count(self.config.policy.escalation_window())
            .await;
        let transitions = self.controller.apply(&verdict, recent_threats).await;
        let defense_level = self.controller.current().await;

        if !transitions.is_empty() {
            notify(
                "response engine",
                self.timeout(),
                self.collaborators.response.on_posture_change(defense_level),
            )
            .await;
        }

        let cleanup = self.history.cleanup(self.config.policy.retention()).await;

        Ok(CycleReport {
            sample,
            verdict,
            recent_threats,
            transitions,
            defense_level,
            cleanup,
        })
    }

    /// Aggregate identity, posture, metrics and collaborator counters.
    pub async fn status(&self) -> SystemStatus {
        let limit = self.timeout();
        let collaborators = &self.collaborators;

        let threat_detection = tokio::time::timeout(limit, collaborators.scorer.statistics())
            .await
            .unwrap_or_default();
        let deception = tokio::time::timeout(limit, collaborators.deception.statistics())
            .await
            .unwrap_or_default();
        let response = tokio::time::timeout(limit, collaborators.response.statistics())
            .await
            .unwrap_or_default();
        let connected_peers = match &collaborators.federation {
            Some(federation) => tokio::time::timeout(limit, federation.connected_peers())
                .await
                .unwrap_or(0),
            None => 0,
        };

        let snapshot = self.history.snapshot().await;

        SystemStatus {
            system_id: self.system_id.clone(),
            status: self.lifecycle().await,
            mode: self.config.mode,
            defense_level: self.defense_level().await,
            started_at: self.started_at,
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            metrics: snapshot.metrics,
            components: ComponentStatus {
                threat_detection,
                deception,
                response: ResponseComponent {
                    stats: response,
                    autonomous: self.pipeline.is_autonomous(),
                },
                federation: FederationComponent {
                    enabled: collaborators.federation.is_some(),
                    connected_peers,
                },
            },
            events: EventCounts {
                event_log: snapshot.event_log_len,
                threat_log: snapshot.threat_log_len,
            },
        }
    }

    /// Stop the defense cycle and leave the federation.
    ///
    /// An in-flight cycle completes first. Later calls do no work of their
    /// own but return only once the lifecycle has reached `Shutdown`.
    #[instrument(skip(self), fields(system_id = %self.system_id))]
    pub async fn shutdown(&self) -> SentinelResult<()> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            let current = *lifecycle;
            match current {
                LifecycleStatus::Shutdown => {
                    debug!("Already shut down");
                    return Ok(());
                }
                LifecycleStatus::ShuttingDown => {
                    drop(lifecycle);
                    debug!("Shutdown in progress, waiting for it to finish");
                    let mut stopped = self.stopped_tx.subscribe();
                    let _ = stopped.wait_for(|done| *done).await;
                    return Ok(());
                }
                LifecycleStatus::Initializing | LifecycleStatus::Operational => {
                    *lifecycle = LifecycleStatus::ShuttingDown;
                }
            }
        }
        info!("Shutting down");

        self.stop_tx.send_replace(true);
        if let Some(handle) = self.cycle.lock().await.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "Defense cycle task ended abnormally");
            }
        }

        if self.federation_joined.swap(false, Ordering::SeqCst) {
            if let Some(federation) = &self.collaborators.federation {
                if let Err(err) = bounded("federation", self.timeout(), federation.leave()).await {
                    warn!(error = %err, "Failed to leave federation");
                }
            }
        }

        *self.lifecycle.write().await = LifecycleStatus::Shutdown;
        self.stopped_tx.send_replace(true);
        info!("Shutdown complete");
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("system_id", &self.system_id)
            .field("mode", &self.config.mode)
            .finish_non_exhaustive()
    }
}

/// Bounded call for collaborator hooks that report nothing back.
///
/// Expiry is logged and otherwise ignored.
async fn notify<F>(collaborator: &'static str, limit: Duration, call: F)
where
    F: Future<Output = ()>,
{
    if tokio::time::timeout(limit, call).await.is_err() {
        warn!(
            collaborator,
            timeout_ms = limit.as_millis() as u64,
            "Collaborator did not acknowledge in time"
        );
    }
}

/// Background defense loop.
///
/// Sleeps `interval` after a successful cycle and `error_backoff` after a
/// failed one. The stop signal is observed while sleeping and before each
/// cycle.
async fn run_cycles(orchestrator: Weak<Orchestrator>, mut stop: watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            break;
        }
        let Some(this) = orchestrator.upgrade() else {
            break;
        };

        let pause = match this.run_cycle().await {
            Ok(report) => {
                debug!(
                    defense_level = %report.defense_level,
                    recent_threats = report.recent_threats,
                    "Defense cycle complete"
                );
                this.config.monitor.interval()
            }
            Err(err) => {
                error!(error = %err, "Defense cycle failed, backing off");
                this.config.monitor.error_backoff()
            }
        };
        drop(this);

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Defense cycle stopped");
}
