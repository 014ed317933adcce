//! Identifiers for Sentinel entities
//!
//! Identifiers are short (16 hex character) SHA-256 digests. Event and system
//! ids mix in fresh entropy; threat ids are content-addressed.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::event::ValidatedEvent;

/// Length of every Sentinel digest identifier, in hex characters.
pub const ID_HEX_LEN: usize = 16;

fn short_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(ID_HEX_LEN);
    digest
}

/// Identifier attached to every validated event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Derive a fresh id from 16 bytes of OS randomness and the event timestamp.
    pub fn generate(timestamp: &str) -> Self {
        let mut entropy = [0u8; 16];
        OsRng.fill_bytes(&mut entropy);
        Self(short_digest(&[&entropy, timestamp.as_bytes()]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-addressed identifier of a threat assessment.
///
/// Two validated events with the same keys and values always map to the same
/// threat id. The id describes content; it is not unique per call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreatId(String);

impl ThreatId {
    pub fn derive(event: &ValidatedEvent) -> Self {
        Self(short_digest(&[event.canonical_json().as_bytes()]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one orchestrator process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemId(String);

impl SystemId {
    /// Generate an identity from the host name, process id, entropy and start time.
    pub fn generate() -> Self {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let started = chrono::Utc::now().to_rfc3339();
        let mut entropy = [0u8; 16];
        OsRng.fill_bytes(&mut entropy);
        let identifier = format!("{}-{}-{}", host, std::process::id(), started);
        Self(short_digest(&[identifier.as_bytes(), &entropy]))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
