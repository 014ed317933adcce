//! Static decoy registry.
//!
//! Decoys are addresses allocated from a configured IPv4 network. Traffic
//! whose destination is a registered decoy counts as a decoy interaction.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{DeceptionNetwork, DeceptionStats};
use crate::config::DeceptionConfig;
use crate::error::{SentinelError, SentinelResult};

const COLLABORATOR: &str = "deception network";

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Network {
    base: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Network {
    pub fn new(address: Ipv4Addr, prefix: u8) -> SentinelResult<Self> {
        if prefix > 32 {
            return Err(SentinelError::Configuration(format!(
                "invalid prefix length /{prefix}"
            )));
        }
        let base = Ipv4Addr::from(u32::from(address) & Self::mask(prefix));
        Ok(Self { base, prefix })
    }

    fn mask(prefix: u8) -> u32 {
        match prefix {
            0 => 0,
            p => u32::MAX << (32 - u32::from(p)),
        }
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & Self::mask(self.prefix) == u32::from(self.base)
    }

    /// Usable host addresses; network and broadcast are excluded below /31.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start = u32::from(self.base);
        let size = 1u64 << (32 - u32::from(self.prefix));
        let (first, count) = if self.prefix >= 31 {
            (0, size)
        } else {
            (1, size - 2)
        };
        (first..first + count).map(move |offset| Ipv4Addr::from(start + offset as u32))
    }
}

impl FromStr for Ipv4Network {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SentinelError::Configuration(format!("invalid IPv4 network '{s}'"));
        let (address, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let address = address.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        let prefix = prefix.parse::<u8>().map_err(|_| invalid())?;
        Self::new(address, prefix)
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// Service a decoy impersonates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoyProfile {
    SshServer,
    WebServer,
    Database,
    FileShare,
}

impl DecoyProfile {
    pub const ROTATION: [DecoyProfile; 4] = [
        DecoyProfile::SshServer,
        DecoyProfile::WebServer,
        DecoyProfile::Database,
        DecoyProfile::FileShare,
    ];

    pub fn default_port(&self) -> u16 {
        match self {
            DecoyProfile::SshServer => 22,
            DecoyProfile::WebServer => 80,
            DecoyProfile::Database => 5432,
            DecoyProfile::FileShare => 445,
        }
    }
}

/// One deployed decoy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoy {
    pub id: Uuid,
    pub address: Ipv4Addr,
    pub profile: DecoyProfile,
    pub port: u16,
    pub deployed_at: DateTime<Utc>,
}

/// In-memory deception network.
#[derive(Debug)]
pub struct DecoyRegistry {
    network: Ipv4Network,
    decoys: RwLock<Vec<Decoy>>,
    active: AtomicBool,
    interactions: AtomicU64,
}

impl DecoyRegistry {
    /// Empty registry over `network`.
    pub fn new(network: Ipv4Network) -> Self {
        Self {
            network,
            decoys: RwLock::new(Vec::new()),
            active: AtomicBool::new(true),
            interactions: AtomicU64::new(0),
        }
    }

    /// Registry with `decoy_count` decoys rotated through every profile.
    pub fn from_config(config: &DeceptionConfig) -> SentinelResult<Self> {
        let network: Ipv4Network = config.network.parse()?;
        let mut decoys = Vec::with_capacity(config.decoy_count);
        let mut hosts = network.hosts();

        for profile in DecoyProfile::ROTATION.iter().cycle().take(config.decoy_count) {
            let address = hosts.next().ok_or_else(|| {
                SentinelError::Configuration(format!(
                    "network {network} cannot hold {} decoys",
                    config.decoy_count
                ))
            })?;
            decoys.push(Decoy {
                id: Uuid::new_v4(),
                address,
                profile: *profile,
                port: profile.default_port(),
                deployed_at: Utc::now(),
            });
        }

        Ok(Self {
            network,
            decoys: RwLock::new(decoys),
            active: AtomicBool::new(config.active),
            interactions: AtomicU64::new(0),
        })
    }

    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    /// Deploy a decoy at `address`, or at the next free host address.
    #[instrument(skip(self))]
    pub async fn add_decoy(
        &self,
        profile: DecoyProfile,
        address: Option<Ipv4Addr>,
    ) -> SentinelResult<Decoy> {
        let mut decoys = self.decoys.write().await;
        let taken = |candidate: Ipv4Addr| decoys.iter().any(|d| d.address == candidate);

        let address = match address {
            Some(address) if !self.network.contains(address) => {
                return Err(SentinelError::collaborator(
                    COLLABORATOR,
                    format!("{address} is outside {}", self.network),
                ));
            }
            Some(address) if taken(address) => {
                return Err(SentinelError::collaborator(
                    COLLABORATOR,
                    format!("{address} already hosts a decoy"),
                ));
            }
            Some(address) => address,
            None => self
                .network
                .hosts()
                .find(|candidate| !taken(*candidate))
                .ok_or_else(|| {
                    SentinelError::collaborator(
                        COLLABORATOR,
                        format!("no free address left in {}", self.network),
                    )
                })?,
        };

        let decoy = Decoy {
            id: Uuid::new_v4(),
            address,
            profile,
            port: profile.default_port(),
            deployed_at: Utc::now(),
        };
        info!(decoy_id = %decoy.id, %address, ?profile, "Deployed decoy");
        decoys.push(decoy.clone());
        Ok(decoy)
    }

    pub async fn decoys(&self) -> Vec<Decoy> {
        self.decoys.read().await.clone()
    }
}

#[async_trait]
impl DeceptionNetwork for DecoyRegistry {
    async fn detect_interaction(
        &self,
        source_ip: &str,
        dest_ip: Option<&str>,
        dest_port: u16,
        protocol: &str,
    ) -> SentinelResult<bool> {
        if !self.active.load(Ordering::Relaxed) {
            return Ok(false);
        }

        let Some(dest) = dest_ip.and_then(|ip| ip.parse::<Ipv4Addr>().ok()) else {
            return Ok(false);
        };
        if !self.network.contains(dest) {
            return Ok(false);
        }

        let hit = self.decoys.read().await.iter().any(|d| d.address == dest);
        if hit {
            self.interactions.fetch_add(1, Ordering::Relaxed);
            debug!(source_ip, %dest, dest_port, protocol, "Decoy interaction");
        }
        Ok(hit)
    }

    async fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    async fn statistics(&self) -> DeceptionStats {
        DeceptionStats {
            active: self.active.load(Ordering::Relaxed),
            active_decoys: self.decoys.read().await.len(),
            interactions_detected: self.interactions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        let network: Ipv4Network = "10.0.0.77/24".parse().unwrap();
        assert_eq!(network.to_string(), "10.0.0.0/24");
        assert!(network.contains(Ipv4Addr::new(10, 0, 0, 200)));
        assert!(!network.contains(Ipv4Addr::new(10, 0, 1, 1)));
        assert_eq!(network.hosts().count(), 254);
        assert_eq!(network.hosts().next(), Some(Ipv4Addr::new(10, 0, 0, 1)));

        assert!("10.0.0.0/33".parse::<Ipv4Network>().is_err());
        assert!("10.0.0.0".parse::<Ipv4Network>().is_err());

        let single: Ipv4Network = "192.0.2.9/32".parse().unwrap();
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(192, 0, 2, 9)]);
    }

    #[tokio::test]
    async fn test_from_config_rotates_profiles() {
        let registry = DecoyRegistry::from_config(&DeceptionConfig::default()).unwrap();
        let decoys = registry.decoys().await;
        assert_eq!(decoys.len(), 5);
        assert_eq!(decoys[0].profile, DecoyProfile::SshServer);
        assert_eq!(decoys[4].profile, DecoyProfile::SshServer);
        assert_eq!(decoys[4].address, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_from_config_network_too_small() {
        let config = DeceptionConfig {
            network: "10.0.0.0/30".to_string(),
            decoy_count: 3,
            active: true,
        };
        assert!(DecoyRegistry::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_detect_interaction() {
        let registry = DecoyRegistry::from_config(&DeceptionConfig::default()).unwrap();

        assert!(registry
            .detect_interaction("203.0.113.5", Some("10.0.0.2"), 80, "tcp")
            .await
            .unwrap());
        assert!(!registry
            .detect_interaction("203.0.113.5", Some("10.0.0.200"), 80, "tcp")
            .await
            .unwrap());
        assert!(!registry
            .detect_interaction("203.0.113.5", None, 0, "tcp")
            .await
            .unwrap());

        registry.set_active(false).await;
        assert!(!registry
            .detect_interaction("203.0.113.5", Some("10.0.0.2"), 80, "tcp")
            .await
            .unwrap());

        let stats = registry.statistics().await;
        assert!(!stats.active);
        assert_eq!(stats.interactions_detected, 1);
    }

    #[tokio::test]
    async fn test_add_decoy() {
        let registry = DecoyRegistry::new("192.168.50.0/29".parse().unwrap());

        let first = registry.add_decoy(DecoyProfile::Database, None).await.unwrap();
        assert_eq!(first.address, Ipv4Addr::new(192, 168, 50, 1));
        assert_eq!(first.port, 5432);

        let pinned = registry
            .add_decoy(DecoyProfile::WebServer, Some(Ipv4Addr::new(192, 168, 50, 6)))
            .await
            .unwrap();
        assert_eq!(pinned.address, Ipv4Addr::new(192, 168, 50, 6));

        assert!(registry
            .add_decoy(DecoyProfile::WebServer, Some(Ipv4Addr::new(192, 168, 50, 6)))
            .await
            .is_err());
        assert!(registry
            .add_decoy(DecoyProfile::WebServer, Some(Ipv4Addr::new(10, 0, 0, 1)))
            .await
            .is_err());

        for _ in 0..4 {
            registry.add_decoy(DecoyProfile::FileShare, None).await.unwrap();
        }
        assert!(registry.add_decoy(DecoyProfile::FileShare, None).await.is_err());
    }
}
