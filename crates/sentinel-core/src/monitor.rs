//! Resource monitoring.
//!
//! A [`ResourceMonitor`] produces a point-in-time usage sample per resource
//! kind each cycle. Production deployments plug in an OS-backed monitor; the
//! simulated monitor mirrors the usage ranges a lightly loaded sensor host
//! reports.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::{SentinelError, SentinelResult};

/// Kind of resource tracked against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Bandwidth,
    Disk,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Cpu,
        ResourceKind::Memory,
        ResourceKind::Bandwidth,
        ResourceKind::Disk,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => write!(f, "cpu"),
            ResourceKind::Memory => write!(f, "memory"),
            ResourceKind::Bandwidth => write!(f, "bandwidth"),
            ResourceKind::Disk => write!(f, "disk"),
        }
    }
}

/// Usage fractions (0.0-1.0) sampled at one instant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSample(BTreeMap<ResourceKind, f64>);

impl ResourceSample {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// A sample with every resource kind at zero usage.
    pub fn idle() -> Self {
        ResourceKind::ALL.iter().map(|kind| (*kind, 0.0)).collect()
    }

    pub fn with(mut self, kind: ResourceKind, usage: f64) -> Self {
        self.0.insert(kind, usage);
        self
    }

    pub fn get(&self, kind: ResourceKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.0.iter().map(|(kind, usage)| (*kind, *usage))
    }
}

impl FromIterator<(ResourceKind, f64)> for ResourceSample {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Source of resource usage samples.
#[async_trait]
pub trait ResourceMonitor: Send + Sync {
    /// Take one usage sample.
    async fn sample(&self) -> SentinelResult<ResourceSample>;
}

/// Monitor producing random usage inside fixed per-resource ranges.
#[derive(Debug, Clone)]
pub struct SimulatedResourceMonitor {
    ranges: BTreeMap<ResourceKind, Range<f64>>,
}

impl SimulatedResourceMonitor {
    pub fn new() -> Self {
        let ranges = BTreeMap::from([
            (ResourceKind::Cpu, 0.1..0.4),
            (ResourceKind::Memory, 0.2..0.6),
            (ResourceKind::Bandwidth, 0.05..0.3),
            (ResourceKind::Disk, 0.1..0.3),
        ]);
        Self { ranges }
    }

    /// Override the range for one resource kind.
    pub fn with_range(mut self, kind: ResourceKind, range: Range<f64>) -> Self {
        self.ranges.insert(kind, range);
        self
    }

    fn draw(&self) -> ResourceSample {
        let mut rng = rand::thread_rng();
        self.ranges
            .iter()
            .map(|(kind, range)| {
                let usage = if range.is_empty() {
                    range.start
                } else {
                    rng.gen_range(range.clone())
                };
                (*kind, usage)
            })
            .collect()
    }
}

impl Default for SimulatedResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceMonitor for SimulatedResourceMonitor {
    async fn sample(&self) -> SentinelResult<ResourceSample> {
        let sample = self.draw();
        trace!(?sample, "Simulated resource sample");
        Ok(sample)
    }
}

/// Monitor returning a caller-controlled sample, or failing on demand.
#[derive(Debug, Default)]
pub struct FixedResourceMonitor {
    sample: RwLock<Option<ResourceSample>>,
}

impl FixedResourceMonitor {
    pub fn new(sample: ResourceSample) -> Self {
        Self {
            sample: RwLock::new(Some(sample)),
        }
    }

    /// Replace the sample returned from now on.
    pub async fn set(&self, sample: ResourceSample) {
        *self.sample.write().await = Some(sample);
    }

    /// Make every subsequent sample fail.
    pub async fn set_failing(&self) {
        *self.sample.write().await = None;
    }
}

#[async_trait]
impl ResourceMonitor for FixedResourceMonitor {
    async fn sample(&self) -> SentinelResult<ResourceSample> {
        self.sample
            .read()
            .await
            .clone()
            .ok_or_else(|| SentinelError::collaborator("resource monitor", "no sample available"))
    }
}
