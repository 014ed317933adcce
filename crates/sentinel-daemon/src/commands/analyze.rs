//! Batch analysis of events read from a file

use std::path::Path;

use sentinel_core::ProcessOutcome;
use sentinel_types::Event;
use serde::Deserialize;

use super::{print_json, start_orchestrator};
use crate::config::DaemonConfig;
use crate::error::DaemonResult;

/// Accepted input shapes: one event or an array of events.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EventInput {
    Batch(Vec<Event>),
    Single(Event),
}

impl EventInput {
    pub fn into_events(self) -> Vec<Event> {
        match self {
            EventInput::Batch(events) => events,
            EventInput::Single(event) => vec![event],
        }
    }
}

pub fn read_events(path: &Path) -> DaemonResult<Vec<Event>> {
    let raw = std::fs::read_to_string(path)?;
    let input: EventInput = serde_json::from_str(&raw)?;
    Ok(input.into_events())
}

pub async fn execute(config: DaemonConfig, events: &Path, output: Option<&Path>) -> DaemonResult<()> {
    let events = read_events(events)?;
    tracing::info!(count = events.len(), "Analyzing events");

    let orchestrator = start_orchestrator(config.system).await?;
    let mut outcomes: Vec<ProcessOutcome> = Vec::with_capacity(events.len());
    for event in &events {
        outcomes.push(orchestrator.process_event(event).await);
    }
    orchestrator.shutdown().await?;

    let threats = outcomes
        .iter()
        .filter_map(ProcessOutcome::assessment)
        .filter(|a| a.is_elevated())
        .count();
    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    tracing::info!(total = outcomes.len(), threats, failed, "Analysis complete");

    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&outcomes)?)?;
            tracing::info!(path = %path.display(), "Results written");
            Ok(())
        }
        None => print_json(&outcomes),
    }
}
