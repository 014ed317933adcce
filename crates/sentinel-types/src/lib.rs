//! Sentinel Types - Core types for the security-event orchestrator
//!
//! Sentinel ingests discrete security events, scores them for threat severity,
//! decides whether to react autonomously, and adapts its own defense posture to
//! load and threat volume. This crate holds the vocabulary shared by the engine
//! (`sentinel-core`) and the daemon (`sentinel-daemon`).
//!
//! ## Key Concepts
//!
//! - **Event**: Caller-supplied bag of scalar fields
//! - **ValidatedEvent**: Normalized copy with a timestamp and event id guaranteed
//! - **ThreatAssessment**: Scored, content-addressed verdict for one event
//! - **ThreatLevel**: Ordinal severity produced by the threat scorer
//! - **DefenseLevel**: System-wide posture driven by the defense controller
//! - **SystemMode**: Operational mode selecting collaborator defaults

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod assessment;
pub mod error;
pub mod event;
pub mod ids;
pub mod levels;
pub mod net;

// Re-export main types
pub use assessment::{ResponseAction, ResponseOutcome, ResponsePlan, ThreatAssessment};
pub use error::{TypesError, TypesResult};
pub use event::{Event, ValidatedEvent};
pub use ids::{EventId, SystemId, ThreatId};
pub use levels::{DefenseLevel, SystemMode, ThreatLevel};
pub use net::{is_external_ip, normalize_ip};
