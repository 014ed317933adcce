//! Configuration validation

use std::path::Path;

use crate::config::DaemonConfig;
use crate::error::DaemonResult;

/// Validate the file at `path`; mode and defense level must be set explicitly.
pub fn execute(path: &Path) -> DaemonResult<()> {
    DaemonConfig::require_explicit_keys(path)?;
    let config = DaemonConfig::load_validated(Some(path))?;
    let system = &config.system;

    println!("Configuration valid: {}", path.display());
    println!("  Mode: {}", system.mode);
    println!("  Defense level: {}", system.defense_level);
    println!("  Autonomous response: {}", system.autonomous_response());
    println!("  Threshold multiplier: {}", system.threshold_multiplier());
    println!(
        "  Deception: {} ({} decoys in {})",
        if system.deception_active() { "active" } else { "inactive" },
        system.deception.decoy_count,
        system.deception.network
    );
    println!(
        "  Federation: {}",
        if system.federation.enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
