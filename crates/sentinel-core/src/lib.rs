//! # Sentinel Core - Event Pipeline and Adaptive Defense Loop
//!
//! This crate turns security events into threat assessments and keeps the
//! system-wide defense posture matched to current load and threat volume.
//!
//! ## Overview
//!
//! Two activities share one [`Orchestrator`]:
//!
//! - **Event pipeline**: validate, check decoys, score, record, and respond to
//!   elevated threats. Runs on the caller's task via
//!   [`Orchestrator::process_event`].
//! - **Defense cycle**: sample resources, evaluate health against the budget,
//!   adjust the [`DefenseLevel`](sentinel_types::DefenseLevel), and clean up
//!   history. Runs in a background task on a fixed interval.
//!
//! ## Key Components
//!
//! - [`EventPipeline`]: Per-event processing over the collaborators
//! - [`DefenseController`]: Single writer of the defense level
//! - [`HistoryStore`]: Bounded event and threat logs plus running metrics
//! - [`collaborators`]: Deception, scoring, response and federation seams
//! - [`monitor`]: Resource sampling
//!
//! ## Example
//!
//! ```rust,no_run
//! use sentinel_core::{Collaborators, Orchestrator, SystemConfig};
//! use sentinel_types::{Event, SystemMode};
//!
//! # async fn example() -> sentinel_core::SentinelResult<()> {
//! let config = SystemConfig::for_mode(SystemMode::Development);
//! let collaborators = Collaborators::reference(&config)?;
//! let orchestrator = Orchestrator::start(config, collaborators).await?;
//!
//! let event = Event::new()
//!     .with("source_ip", "203.0.113.5")
//!     .with("dest_port", 22);
//! let outcome = orchestrator.process_event(&event).await;
//! println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
//!
//! orchestrator.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modes
//!
//! - **Production**: Sensitive thresholds, autonomous responses
//! - **Testing**: Most sensitive thresholds, responses proposed only
//! - **Development / Staging**: Configured values unchanged

pub mod collaborators;
pub mod config;
pub mod defense;
pub mod error;
pub mod health;
pub mod history;
pub mod monitor;
pub mod orchestrator;
pub mod pipeline;

// Re-export main types
pub use collaborators::{
    Collaborators, DeceptionNetwork, DeceptionStats, FederationNode, ResponseEngine,
    ResponseStats, ScorerStats, ThreatScore, ThreatScorer,
};
pub use config::{
    DeceptionConfig, DefensePolicy, FederationConfig, LearningConfig, ModeProfile, MonitorConfig,
    ResourceBudget, ResponseConfig, SystemConfig,
};
pub use defense::{next_level, DefenseController, DefenseTransition, TransitionReason};
pub use error::{ErrorKind, SentinelError, SentinelResult};
pub use health::{evaluate_health, HealthVerdict};
pub use history::{CleanupReport, HistorySnapshot, HistoryStore, SystemMetrics};
pub use monitor::{
    FixedResourceMonitor, ResourceKind, ResourceMonitor, ResourceSample, SimulatedResourceMonitor,
};
pub use orchestrator::{
    ComponentStatus, CycleReport, EventCounts, FederationComponent, LifecycleStatus,
    Orchestrator, ResponseComponent, SystemStatus,
};
pub use pipeline::{EventPipeline, ProcessOutcome, ProcessingFailure};
