//! Scenario files for dry runs.
//!
//! ```toml
//! [map]
//! id = "1-1"
//! [[map.nodes]]
//! name = "A"
//! hit_region = { x = 100, y = 100, w = 40, h = 40 }
//!
//! [auxiliary]
//! ready = true
//!
//! [[frames]]
//! visible = ["combat_start"]
//!
//! [[frames]]
//! visible = ["compass"]
//! fleet_icon = { x = 110, y = 100, w = 20, h = 20 }
//! ```

use super::Frame;
use crate::auxiliary::{AuxiliaryGate, GateResult};
use crate::map::MapDefinition;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Map definition; the config's `sortie.map_file` is used when absent
    #[serde(default)]
    pub map: Option<MapDefinition>,
    /// Scripted auxiliary gate; absent means no gate
    #[serde(default)]
    pub auxiliary: Option<AuxiliaryScript>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
        let scenario = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse scenario: {}", path.display()))?;
        info!(
            path = %path.display(),
            map = ?scenario.map.as_ref().map(|m| m.id.to_string()),
            frames = scenario.frames.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Fixed answer of a scripted auxiliary gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuxiliaryScript {
    #[serde(default = "default_ready")]
    pub ready: bool,
    #[serde(default)]
    pub delay_minutes: u64,
}

fn default_ready() -> bool {
    true
}

/// Auxiliary gate that always answers the same and counts its calls.
#[derive(Debug)]
pub struct ScriptedAuxiliary {
    result: GateResult,
    prepared: AtomicUsize,
    assigned: AtomicUsize,
}

impl ScriptedAuxiliary {
    pub fn new(script: AuxiliaryScript) -> Self {
        let result = if script.ready {
            GateResult::ready()
        } else {
            GateResult::not_ready(Duration::from_secs(script.delay_minutes * 60))
        };
        Self {
            result,
            prepared: AtomicUsize::new(0),
            assigned: AtomicUsize::new(0),
        }
    }

    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::Relaxed)
    }

    pub fn assigned(&self) -> usize {
        self.assigned.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuxiliaryGate for ScriptedAuxiliary {
    async fn prepare(&self, _check_fatigue: bool) -> Result<GateResult> {
        self.prepared.fetch_add(1, Ordering::Relaxed);
        Ok(self.result)
    }

    async fn assign_groups(&self) -> Result<()> {
        self.assigned.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
