mod types;

pub use types::*;

use anyhow::{Context, Result};
use mediamux_common::Timestamp;
use std::collections::BTreeSet;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<MuxConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: MuxConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if let Some(base) = path.parent() {
        resolve_paths(&mut config, base);
    }

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<MuxConfig> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./mediamux.toml",
        "~/.config/mediamux/config.toml",
        "/etc/mediamux/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(MuxConfig::default())
}

fn resolve_paths(config: &mut MuxConfig, base: &Path) {
    for entry in &mut config.timestamps {
        let expanded = shellexpand::tilde(&entry.file.to_string_lossy()).into_owned();
        let file = Path::new(&expanded);
        entry.file = if file.is_relative() {
            base.join(file)
        } else {
            file.to_path_buf()
        };
    }
}

/// Validate configuration
pub fn validate_config(config: &MuxConfig) -> Result<()> {
    if config.timestamp_scale_ns == 0 {
        anyhow::bail!("Timestamp scale cannot be 0");
    }

    if config.cluster.max_pending_packets == 0 {
        anyhow::bail!("Cluster max_pending_packets cannot be 0");
    }

    let mut timed_tracks = BTreeSet::new();
    for entry in &config.timestamps {
        if !timed_tracks.insert(entry.track) {
            anyhow::bail!("Track {} has more than one timestamp file", entry.track);
        }
        if !entry.file.exists() {
            tracing::warn!("Timestamp file does not exist: {:?}", entry.file);
        }
    }

    let mut synced_tracks = BTreeSet::new();
    for entry in &config.sync {
        if !synced_tracks.insert(entry.track) {
            anyhow::bail!("Track {} has more than one sync offset", entry.track);
        }
        if Timestamp::checked_from_ms(entry.offset_ms).is_none() {
            anyhow::bail!(
                "Track {} sync offset of {} ms is out of range",
                entry.track,
                entry.offset_ms
            );
        }
        if timed_tracks.contains(&entry.track) {
            anyhow::bail!(
                "Track {} has both a timestamp file and a sync offset",
                entry.track
            );
        }
    }

    Ok(())
}
