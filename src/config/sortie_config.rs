//! Sortie Configuration - operator-tunable TOML values
//!
//! Each struct implements `Default` with the values in `config::defaults`,
//! so a missing file or a partial file behaves predictably.

use super::defaults;
use crate::types::{FleetMode, MapId, Severity, World};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "SORTIE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sortie_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `SortieConfig::load()` which searches:
/// 1. `$SORTIE_CONFIG` env var
/// 2. `./sortie_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortieConfig {
    #[serde(default)]
    pub sortie: SortieSettings,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub vision: VisionConfig,

    #[serde(default)]
    pub viewport: ViewportConfig,
}

impl SortieConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), map = %config.sortie.map, "Loaded sortie config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(map = %config.sortie.map, "Loaded sortie config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate settings for internal consistency. Collects every problem
    /// before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sortie;
        let mut errors: Vec<String> = Vec::new();

        if s.combat_nodes == 0 {
            errors.push("sortie.combat_nodes must be > 0".to_string());
        }

        if s.combined_fleet && !s.fleet_mode.is_combined() {
            errors.push(format!(
                "sortie.fleet_mode '{}' is not a combined fleet mode but combined_fleet = true",
                s.fleet_mode.as_str()
            ));
        }
        if !s.combined_fleet && s.fleet_mode.is_combined() {
            errors.push(format!(
                "sortie.fleet_mode '{}' requires combined_fleet = true",
                s.fleet_mode.as_str()
            ));
        }

        if s.lbas_check_fatigue && !s.lbas_enabled {
            errors.push("sortie.lbas_check_fatigue requires lbas_enabled = true".to_string());
        }

        for (from, to) in &s.node_selects {
            if to.trim().is_empty() {
                errors.push(format!("sortie.node_selects.{from} has an empty target"));
            } else if from == to {
                errors.push(format!("sortie.node_selects.{from} routes to itself"));
            }
        }

        let v = &self.vision;
        for (name, value) in [
            ("damage_similarity", v.damage_similarity),
            ("fatigue_similarity", v.fatigue_similarity),
            ("fleet_icon_similarity", v.fleet_icon_similarity),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                errors.push(format!("vision.{name} must be in (0, 1], got {value}"));
            }
        }

        if self.timing.screen_timeout_secs == 0 {
            errors.push("timing.screen_timeout_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Whether the sortie uses two fleets.
    pub fn is_combined(&self) -> bool {
        self.sortie.combined_fleet
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// [sortie]
// ============================================================================

/// What to sortie to and when to give up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortieSettings {
    /// Target map, e.g. "3-2" or "E-1"
    #[serde(default = "default_map")]
    pub map: MapId,

    /// Optional map definition file (nodes, formations, night battles)
    #[serde(default)]
    pub map_file: Option<PathBuf>,

    #[serde(default)]
    pub combined_fleet: bool,

    #[serde(default)]
    pub fleet_mode: FleetMode,

    /// Retreat once this many combat nodes have been fought
    #[serde(default = "default_combat_nodes")]
    pub combat_nodes: usize,

    /// Pre-sortie veto when any ship is at or below this damage
    #[serde(default = "default_repair_limit")]
    pub repair_limit: Severity,

    /// Mid-sortie retreat when any ship is at or below this damage
    #[serde(default = "default_retreat_limit")]
    pub retreat_limit: Severity,

    #[serde(default)]
    pub check_fatigue: bool,

    /// Check for the port-full warning (always checked on event maps)
    #[serde(default)]
    pub port_check: bool,

    /// Land-based air support groups are prepared before each sortie
    #[serde(default)]
    pub lbas_enabled: bool,

    #[serde(default)]
    pub lbas_check_fatigue: bool,

    /// Forced routes on node-select prompts: current node -> next node
    #[serde(default)]
    pub node_selects: BTreeMap<String, String>,
}

fn default_map() -> MapId {
    MapId {
        world: World::Numbered(1),
        subworld: 1,
    }
}
fn default_combat_nodes() -> usize {
    defaults::DEFAULT_NODE_CAP
}
fn default_repair_limit() -> Severity {
    Severity::Moderate
}
fn default_retreat_limit() -> Severity {
    Severity::Heavy
}

impl Default for SortieSettings {
    fn default() -> Self {
        Self {
            map: default_map(),
            map_file: None,
            combined_fleet: false,
            fleet_mode: FleetMode::Standard,
            combat_nodes: default_combat_nodes(),
            repair_limit: default_repair_limit(),
            retreat_limit: default_retreat_limit(),
            check_fatigue: false,
            port_check: false,
            lbas_enabled: false,
            lbas_check_fatigue: false,
            node_selects: BTreeMap::new(),
        }
    }
}

// ============================================================================
// [timing]
// ============================================================================

/// Delays and bounds used while driving the screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_dialogue_delay_ms")]
    pub dialogue_delay_ms: u64,
    #[serde(default = "default_click_settle_ms")]
    pub click_settle_ms: u64,
    #[serde(default = "default_compass_click_interval_ms")]
    pub compass_click_interval_ms: u64,
    #[serde(default = "default_escort_results_delay_ms")]
    pub escort_results_delay_ms: u64,
    #[serde(default = "default_screen_timeout_secs")]
    pub screen_timeout_secs: u64,
    #[serde(default = "default_scheduler_poll_secs")]
    pub scheduler_poll_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    defaults::POLL_INTERVAL_MS
}
fn default_dialogue_delay_ms() -> u64 {
    defaults::DIALOGUE_DELAY_MS
}
fn default_click_settle_ms() -> u64 {
    defaults::CLICK_SETTLE_MS
}
fn default_compass_click_interval_ms() -> u64 {
    defaults::COMPASS_CLICK_INTERVAL_MS
}
fn default_escort_results_delay_ms() -> u64 {
    defaults::ESCORT_RESULTS_DELAY_MS
}
fn default_screen_timeout_secs() -> u64 {
    defaults::SCREEN_TIMEOUT_SECS
}
fn default_scheduler_poll_secs() -> u64 {
    defaults::SCHEDULER_POLL_SECS
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            dialogue_delay_ms: default_dialogue_delay_ms(),
            click_settle_ms: default_click_settle_ms(),
            compass_click_interval_ms: default_compass_click_interval_ms(),
            escort_results_delay_ms: default_escort_results_delay_ms(),
            screen_timeout_secs: default_screen_timeout_secs(),
            scheduler_poll_secs: default_scheduler_poll_secs(),
        }
    }
}

impl TimingConfig {
    /// No delays at all; screen waits keep a short bound. For scripted runs.
    pub fn instant() -> Self {
        Self {
            poll_interval_ms: 0,
            dialogue_delay_ms: 0,
            click_settle_ms: 0,
            compass_click_interval_ms: 0,
            escort_results_delay_ms: 0,
            screen_timeout_secs: 1,
            scheduler_poll_secs: 0,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn dialogue_delay(&self) -> Duration {
        Duration::from_millis(self.dialogue_delay_ms)
    }
    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }
    pub fn compass_click_interval(&self) -> Duration {
        Duration::from_millis(self.compass_click_interval_ms)
    }
    pub fn escort_results_delay(&self) -> Duration {
        Duration::from_millis(self.escort_results_delay_ms)
    }
    pub fn screen_timeout(&self) -> Duration {
        Duration::from_secs(self.screen_timeout_secs)
    }
    pub fn scheduler_poll(&self) -> Duration {
        Duration::from_secs(self.scheduler_poll_secs)
    }
}

// ============================================================================
// [vision]
// ============================================================================

/// Similarity tolerances per probe type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_damage_similarity")]
    pub damage_similarity: f32,
    #[serde(default = "default_fatigue_similarity")]
    pub fatigue_similarity: f32,
    #[serde(default = "default_fleet_icon_similarity")]
    pub fleet_icon_similarity: f32,
}

fn default_damage_similarity() -> f32 {
    defaults::DAMAGE_SIMILARITY
}
fn default_fatigue_similarity() -> f32 {
    defaults::FATIGUE_SIMILARITY
}
fn default_fleet_icon_similarity() -> f32 {
    defaults::FLEET_ICON_SIMILARITY
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            damage_similarity: default_damage_similarity(),
            fatigue_similarity: default_fatigue_similarity(),
            fleet_icon_similarity: default_fleet_icon_similarity(),
        }
    }
}

// ============================================================================
// [viewport]
// ============================================================================

/// Screen-space origin of the game viewport.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}
