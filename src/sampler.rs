//! Damage/Fatigue Sampler
//!
//! Probes a fleet panel for damage-severity and fatigue icons. Each severity
//! (or fatigue level) is an independent read-only query, so the probes are
//! fanned out together and joined before the fleet is updated:
//!
//! - damage: 3 probes (heavy, moderate, minor), counted with `find_all`
//! - fatigue: 2 probes (medium, high), checked with `exists`
//!
//! A probe that fails is logged and contributes nothing; the join still waits
//! for the others.

use crate::config::VisionConfig;
use crate::types::{
    CombatFleet, DamageCounts, FatigueLevel, FatigueState, Pattern, ScreenRegion, Severity,
    Template,
};
use crate::vision::VisionService;
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether a damage sample replaces or adds to the fleet's current tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Reset,
    /// Add to existing counts (7th ship slot of a striking fleet)
    Accumulate,
}

pub struct ConditionSampler {
    vision: Arc<dyn VisionService>,
    damage_similarity: f32,
    fatigue_similarity: f32,
}

impl ConditionSampler {
    pub fn new(vision: Arc<dyn VisionService>, tolerances: &VisionConfig) -> Self {
        Self {
            vision,
            damage_similarity: tolerances.damage_similarity,
            fatigue_similarity: tolerances.fatigue_similarity,
        }
    }

    /// Count damage icons per severity in `region` and merge them into `fleet`.
    pub async fn sample_damage(
        &self,
        fleet: &mut CombatFleet,
        region: ScreenRegion,
        mode: SampleMode,
    ) -> DamageCounts {
        let probes = Severity::ALL.map(|severity| self.count_severity(region, severity));
        let counts = join_all(probes).await;

        if mode == SampleMode::Reset {
            fleet.damage = DamageCounts::default();
        }
        for (severity, count) in Severity::ALL.into_iter().zip(counts) {
            fleet.damage.add(severity, count);
        }

        debug!(fleet = %fleet.id, region = %region, ?mode, damage = %fleet.damage, "Damage sampled");
        fleet.damage
    }

    /// Pre-sortie damage check of a 7-ship striking fleet: the first six ships,
    /// then page to the 7th and add it without clearing.
    pub async fn sample_damage_with_seventh(&self, fleet: &mut CombatFleet) -> Result<DamageCounts> {
        self.sample_damage(fleet, ScreenRegion::CheckDamage, SampleMode::Reset)
            .await;
        self.vision.tap(ScreenRegion::SeventhShipNext).await?;
        Ok(self
            .sample_damage(fleet, ScreenRegion::CheckDamageSeventh, SampleMode::Accumulate)
            .await)
    }

    /// Check which fatigue tiers are visible in `region` and store them on `fleet`.
    pub async fn sample_fatigue(&self, fleet: &mut CombatFleet, region: ScreenRegion) -> FatigueState {
        let probes = FatigueLevel::ALL.map(|level| self.fatigue_present(region, level));
        let present = join_all(probes).await;

        for (level, visible) in FatigueLevel::ALL.into_iter().zip(present) {
            fleet.fatigue.set(level, visible);
        }

        debug!(fleet = %fleet.id, medium = fleet.fatigue.medium, high = fleet.fatigue.high, "Fatigue sampled");
        fleet.fatigue
    }

    /// Returns `true` when the fleet is fully supplied. Marks the fleet for
    /// resupply otherwise.
    pub async fn check_supplies(&self, fleet: &mut CombatFleet) -> Result<bool> {
        let short = self
            .vision
            .exists(ScreenRegion::CheckSupply, &Pattern::new(Template::ResupplyNeeded))
            .await?;
        if short {
            fleet.needs_resupply = true;
        }
        Ok(!short)
    }

    async fn count_severity(&self, region: ScreenRegion, severity: Severity) -> u32 {
        let pattern = Pattern::new(Template::Damage(severity)).similar(self.damage_similarity);
        match self.vision.find_all(region, &pattern).await {
            Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
            Err(e) => {
                warn!(severity = %severity, region = %region, error = %e, "Damage probe failed, counting 0");
                0
            }
        }
    }

    async fn fatigue_present(&self, region: ScreenRegion, level: FatigueLevel) -> bool {
        let pattern = Pattern::new(Template::Fatigue(level)).similar(self.fatigue_similarity);
        match self.vision.exists(region, &pattern).await {
            Ok(visible) => visible,
            Err(e) => {
                warn!(level = level.as_str(), region = %region, error = %e, "Fatigue probe failed, assuming absent");
                false
            }
        }
    }
}
