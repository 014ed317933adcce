//! Security events as supplied by callers, and their validated form
//!
//! An [`Event`] is an arbitrary bag of scalar fields. Validation never mutates
//! the caller's event: it returns a [`ValidatedEvent`] copy in which the
//! `timestamp` and `event_id` fields are guaranteed and IP fields normalized.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::ids::EventId;
use crate::net::normalize_ip;

pub const FIELD_SOURCE_IP: &str = "source_ip";
pub const FIELD_DEST_IP: &str = "dest_ip";
pub const FIELD_DEST_PORT: &str = "dest_port";
pub const FIELD_PROTOCOL: &str = "protocol";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_EVENT_ID: &str = "event_id";

const IP_FIELDS: [&str; 2] = [FIELD_SOURCE_IP, FIELD_DEST_IP];

/// A raw inbound security event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Produce the normalized copy of this event.
    pub fn validate(&self) -> ValidatedEvent {
        let mut fields = self.0.clone();

        if !is_present(fields.get(FIELD_TIMESTAMP)) {
            fields.insert(
                FIELD_TIMESTAMP.to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        if !is_present(fields.get(FIELD_EVENT_ID)) {
            let timestamp = value_text(fields.get(FIELD_TIMESTAMP));
            fields.insert(
                FIELD_EVENT_ID.to_string(),
                Value::String(EventId::generate(&timestamp).as_str().to_string()),
            );
        }

        for field in IP_FIELDS {
            if let Some(Value::String(ip)) = fields.get_mut(field) {
                *ip = normalize_ip(ip);
            }
        }

        ValidatedEvent(fields)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Event {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// An event that passed validation.
///
/// Deserializing goes through [`Event::validate`], so a decoded value always
/// carries `timestamp` and `event_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedEvent(Map<String, Value>);

impl<'de> Deserialize<'de> for ValidatedEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Event::deserialize(deserializer).map(|event| event.validate())
    }
}

impl ValidatedEvent {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The event timestamp as text.
    pub fn timestamp(&self) -> String {
        value_text(self.0.get(FIELD_TIMESTAMP))
    }

    pub fn event_id(&self) -> String {
        value_text(self.0.get(FIELD_EVENT_ID))
    }

    /// Source address; empty when absent or null.
    ///
    /// A present non-string value is returned as its JSON text so that it is
    /// classified like any other malformed address.
    pub fn source_ip(&self) -> Cow<'_, str> {
        match self.0.get(FIELD_SOURCE_IP) {
            None | Some(Value::Null) => Cow::Borrowed(""),
            Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }

    pub fn dest_ip(&self) -> Option<&str> {
        self.get_str(FIELD_DEST_IP)
    }

    /// Destination port; absent or unparsable values read as 0.
    pub fn dest_port(&self) -> u16 {
        match self.0.get(FIELD_DEST_PORT) {
            Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()).unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Transport protocol, `tcp` when unspecified.
    pub fn protocol(&self) -> &str {
        self.get_str(FIELD_PROTOCOL).unwrap_or("tcp")
    }

    /// Compact JSON encoding with keys in sorted order.
    pub fn canonical_json(&self) -> String {
        let sorted: BTreeMap<&String, &Value> = self.0.iter().collect();
        serde_json::to_string(&sorted).unwrap_or_default()
    }

    pub fn into_event(self) -> Event {
        Event(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ThreatId, ID_HEX_LEN};
    use proptest::prelude::*;

    #[test]
    fn test_validate_fills_required_fields() {
        let event = Event::new().with("source_ip", "203.0.113.5");
        let validated = event.validate();

        assert!(chrono::DateTime::parse_from_rfc3339(&validated.timestamp()).is_ok());
        assert_eq!(validated.event_id().len(), ID_HEX_LEN);

        // Caller's copy is untouched
        assert_eq!(event.len(), 1);
        assert!(event.get(FIELD_TIMESTAMP).is_none());
        assert!(event.get(FIELD_EVENT_ID).is_none());
    }

    #[test]
    fn test_validate_keeps_supplied_fields() {
        let event = Event::new()
            .with("timestamp", "2024-05-01T10:00:00+00:00")
            .with("event_id", "abc123");
        let validated = event.validate();

        assert_eq!(validated.timestamp(), "2024-05-01T10:00:00+00:00");
        assert_eq!(validated.event_id(), "abc123");
    }

    #[test]
    fn test_empty_fields_are_replaced() {
        let validated = Event::new()
            .with("timestamp", "")
            .with("event_id", Value::Null)
            .validate();

        assert!(!validated.timestamp().is_empty());
        assert!(!validated.event_id().is_empty());
    }

    #[test]
    fn test_ip_normalization() {
        let event = Event::new()
            .with("source_ip", "localhost")
            .with("dest_ip", "localhost");
        let validated = event.validate();

        assert_eq!(validated.source_ip(), "127.0.0.1");
        assert_eq!(validated.dest_ip(), Some("127.0.0.1"));
        assert_eq!(event.get("source_ip"), Some(&Value::from("localhost")));
    }

    #[test]
    fn test_empty_event_is_still_validated() {
        let validated = Event::new().validate();
        assert_eq!(validated.fields().len(), 2);
        assert_eq!(validated.source_ip(), "");
        assert_eq!(validated.dest_port(), 0);
        assert_eq!(validated.protocol(), "tcp");
    }

    #[test]
    fn test_non_string_source_ip_is_kept_as_text() {
        let numeric = Event::new().with("source_ip", 3405803781u64).validate();
        let flag = Event::new().with("source_ip", true).validate();
        let null = Event::new().with("source_ip", Value::Null).validate();

        assert_eq!(numeric.source_ip(), "3405803781");
        assert_eq!(flag.source_ip(), "true");
        assert_eq!(null.source_ip(), "");
    }

    #[test]
    fn test_deserialize_validates() {
        let decoded: ValidatedEvent =
            serde_json::from_str(r#"{"source_ip": " localhost "}"#).unwrap();
        assert_eq!(decoded.source_ip(), "127.0.0.1");
        assert!(!decoded.timestamp().is_empty());
        assert_eq!(decoded.event_id().len(), ID_HEX_LEN);

        // Already-validated values survive a round trip unchanged
        let original = Event::new().with("dest_port", 22).validate();
        let json = serde_json::to_string(&original).unwrap();
        let restored: ValidatedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_dest_port_parsing() {
        let numeric = Event::new().with("dest_port", 22).validate();
        let text = Event::new().with("dest_port", "443").validate();
        let bogus = Event::new().with("dest_port", 70000).validate();

        assert_eq!(numeric.dest_port(), 22);
        assert_eq!(text.dest_port(), 443);
        assert_eq!(bogus.dest_port(), 0);
    }

    #[test]
    fn test_canonical_json_sorted() {
        let validated = Event::new()
            .with("zeta", 1)
            .with("alpha", "x")
            .with("timestamp", "t")
            .with("event_id", "e")
            .validate();

        assert_eq!(
            validated.canonical_json(),
            r#"{"alpha":"x","event_id":"e","timestamp":"t","zeta":1}"#
        );
    }

    proptest! {
        #[test]
        fn prop_threat_id_is_content_addressed(
            fields in prop::collection::btree_map("[a-z_]{1,10}", "[a-zA-Z0-9.]{0,12}", 0..8)
        ) {
            let event: Event = fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let event = event.with("timestamp", "2024-01-01T00:00:00Z").with("event_id", "fixed");

            // Insertion order must not matter
            let reversed: Event = event
                .fields()
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let a = ThreatId::derive(&event.validate());
            let b = ThreatId::derive(&reversed.validate());
            prop_assert_eq!(a.as_str().len(), ID_HEX_LEN);
            prop_assert_eq!(a, b);
        }
    }
}
