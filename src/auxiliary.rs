//! Auxiliary gate seam (land-based air support style unit groups)
//!
//! When present, the gate is asked to get its groups ready right after the map
//! is selected, and to assign them once the sortie is launched. A gate that
//! is not ready defers the sortie by its own delay.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Readiness of the auxiliary groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateResult {
    pub ready: bool,
    /// Retry delay when not ready
    pub delay: Duration,
}

impl GateResult {
    pub const fn ready() -> Self {
        Self {
            ready: true,
            delay: Duration::ZERO,
        }
    }

    pub const fn not_ready(delay: Duration) -> Self {
        Self {
            ready: false,
            delay,
        }
    }
}

#[async_trait]
pub trait AuxiliaryGate: Send + Sync {
    /// Resupply the groups and, when `check_fatigue` is set, refuse while any
    /// group is fatigued.
    async fn prepare(&self, check_fatigue: bool) -> Result<GateResult>;

    /// Send the groups to their target nodes after launch.
    async fn assign_groups(&self) -> Result<()>;
}
