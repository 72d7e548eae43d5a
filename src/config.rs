// src/config.rs

//! Manages server configuration: loading, resolving dynamic values, and
//! validation, following the same raw-then-resolved split the engine uses
//! for everything else under load.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

/// How strictly the server enforces client mod parity before allowing a
/// vessel proto/update through (open question, resolved in `DESIGN.md`):
/// full enforcement requires an exact allow-listed mod set, `warn` logs a
/// mismatch but still accepts it, and `off` never checks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModControlPolicy {
    #[default]
    Off,
    Warn,
    Enforce,
}

/// The manifest the server publishes under `configuration:mod_control` (spec
/// §6, §9) so clients can self-validate before ever attempting to join.
/// `required_mods` must all be present in a join's mod list, `forbidden_mods`
/// must all be absent; `optional_mods` and `allowed_parts` are advisory only
/// and never affect `ModControlPolicy::Enforce`'s verdict.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ModControl {
    #[serde(default)]
    pub required_mods: Vec<String>,
    #[serde(default)]
    pub optional_mods: Vec<String>,
    #[serde(default)]
    pub forbidden_mods: Vec<String>,
    #[serde(default)]
    pub allowed_parts: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    8930
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_max_players_per_match")]
    default_max_players_per_match: usize,
    #[serde(default = "default_tick_hz")]
    tick_hz: u32,
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_save_interval_secs")]
    save_interval_secs: u64,
    #[serde(default)]
    mod_control: ModControlPolicy,
    #[serde(default)]
    mod_manifest: ModControl,
    #[serde(default = "default_auto_promote_first_joiner")]
    auto_promote_first_joiner: bool,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5353
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    2048
}
fn default_max_players_per_match() -> usize {
    64
}
fn default_tick_hz() -> u32 {
    20
}
fn default_data_dir() -> String {
    "aetherlink_data".to_string()
}
fn default_save_interval_secs() -> u64 {
    30
}
fn default_auto_promote_first_joiner() -> bool {
    true
}

/// The final, validated, and resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_clients: usize,
    pub default_max_players_per_match: usize,
    pub tick_hz: u32,
    pub data_dir: String,
    pub save_interval_secs: u64,
    pub mod_control: ModControlPolicy,
    pub mod_manifest: ModControl,
    pub auto_promote_first_joiner: bool,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            default_max_players_per_match: default_max_players_per_match(),
            tick_hz: default_tick_hz(),
            data_dir: default_data_dir(),
            save_interval_secs: default_save_interval_secs(),
            mod_control: ModControlPolicy::default(),
            mod_manifest: ModControl::default(),
            auto_promote_first_joiner: default_auto_promote_first_joiner(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Reads and parses a TOML config file, then validates the result.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at '{path}'"))?;
        let raw: RawConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML from '{path}'"))?;

        let config = Config {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            max_clients: raw.max_clients,
            default_max_players_per_match: raw.default_max_players_per_match,
            tick_hz: raw.tick_hz,
            data_dir: raw.data_dir,
            save_interval_secs: raw.save_interval_secs,
            mod_control: raw.mod_control,
            mod_manifest: raw.mod_manifest,
            auto_promote_first_joiner: raw.auto_promote_first_joiner,
            metrics: raw.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.default_max_players_per_match == 0 {
            return Err(anyhow!("default_max_players_per_match cannot be 0"));
        }
        if self.tick_hz == 0 || self.tick_hz > 240 {
            return Err(anyhow!("tick_hz must be between 1 and 240"));
        }
        if self.save_interval_secs == 0 {
            return Err(anyhow!("save_interval_secs cannot be 0"));
        }
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("data_dir cannot be empty"));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!("metrics.port cannot be the same as the main server port"));
            }
        }

        if self.tick_hz < 10 {
            warn!(tick_hz = self.tick_hz, "tick rate below 10Hz will feel sluggish to players");
        }

        if let Some(overlap) = self.mod_manifest.required_mods.iter().find(|m| self.mod_manifest.forbidden_mods.contains(m)) {
            return Err(anyhow!("mod '{overlap}' cannot be both required and forbidden"));
        }

        Ok(())
    }
}
