//! Fleet state: damage severity tallies, fatigue tiers, resupply and FCF counters

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

// ============================================================================
// Severity
// ============================================================================

/// Per-ship damage classification, ordered from most to least severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Heavy,
    Moderate,
    Minor,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 3] = [Severity::Heavy, Severity::Moderate, Severity::Minor];

    const fn index(self) -> usize {
        match self {
            Severity::Heavy => 0,
            Severity::Moderate => 1,
            Severity::Minor => 2,
        }
    }

    /// Severities counted when checking "at or below" this threshold:
    /// heavy down through `self` inclusive.
    pub fn at_threshold(self) -> &'static [Severity] {
        &Self::ALL[..=self.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Heavy => "heavy",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heavy" => Ok(Severity::Heavy),
            "moderate" => Ok(Severity::Moderate),
            "minor" => Ok(Severity::Minor),
            other => Err(format!("unknown damage severity '{other}'")),
        }
    }
}

// ============================================================================
// Damage counts
// ============================================================================

/// Number of ships per damage severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageCounts {
    counts: [u32; 3],
}

impl DamageCounts {
    pub fn new(heavy: u32, moderate: u32, minor: u32) -> Self {
        Self {
            counts: [heavy, moderate, minor],
        }
    }

    pub fn get(&self, severity: Severity) -> u32 {
        self.counts[severity.index()]
    }

    pub fn add(&mut self, severity: Severity, count: u32) {
        self.counts[severity.index()] += count;
    }

    /// Remove one ship from a severity bucket. Never goes below zero.
    pub fn remove_one(&mut self, severity: Severity) {
        let slot = &mut self.counts[severity.index()];
        *slot = slot.saturating_sub(1);
    }

    pub fn heavy(&self) -> u32 {
        self.get(Severity::Heavy)
    }

    /// Ships at or below `threshold`: heavy down through `threshold` inclusive.
    ///
    /// `threshold = Moderate` counts heavy + moderate.
    pub fn count_at_threshold(&self, threshold: Severity) -> u32 {
        threshold.at_threshold().iter().map(|s| self.get(*s)).sum()
    }

    /// Per-severity sum of two tallies (main + escort fleet).
    pub fn merged(&self, other: &DamageCounts) -> DamageCounts {
        let mut combined = *self;
        for severity in Severity::ALL {
            combined.add(severity, other.get(severity));
        }
        combined
    }
}

impl std::fmt::Display for DamageCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "heavy={} moderate={} minor={}",
            self.get(Severity::Heavy),
            self.get(Severity::Moderate),
            self.get(Severity::Minor)
        )
    }
}

// ============================================================================
// Fatigue
// ============================================================================

/// Coarse fatigue tier shown on the fleet panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    Medium,
    High,
}

impl FatigueLevel {
    pub const ALL: [FatigueLevel; 2] = [FatigueLevel::Medium, FatigueLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            FatigueLevel::Medium => "medium",
            FatigueLevel::High => "high",
        }
    }
}

/// Which fatigue tiers are visible on a fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatigueState {
    pub medium: bool,
    pub high: bool,
}

impl FatigueState {
    pub fn set(&mut self, level: FatigueLevel, present: bool) {
        match level {
            FatigueLevel::Medium => self.medium = present,
            FatigueLevel::High => self.high = present,
        }
    }

    /// Either fleet fatigued at a level means the whole sortie is.
    pub fn merged(&self, other: &FatigueState) -> FatigueState {
        FatigueState {
            medium: self.medium || other.medium,
            high: self.high || other.high,
        }
    }
}

// ============================================================================
// Fleet
// ============================================================================

/// Fleet slot identifier (1..=4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FleetId(u8);

impl FleetId {
    pub const MAIN: FleetId = FleetId(1);
    pub const ESCORT: FleetId = FleetId(2);
    pub const STRIKING: FleetId = FleetId(3);

    pub fn new(slot: u8) -> Option<Self> {
        (1..=4).contains(&slot).then_some(FleetId(slot))
    }

    pub fn slot(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for FleetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Combat-relevant state of one fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatFleet {
    pub id: FleetId,
    pub damage: DamageCounts,
    pub fatigue: FatigueState,
    pub needs_resupply: bool,
    /// Heavily damaged ships pulled out mid-sortie via FCF; restored into
    /// `damage` when the sortie ends.
    pub fcf_retreat_count: u32,
}

impl CombatFleet {
    pub fn new(id: FleetId) -> Self {
        Self {
            id,
            damage: DamageCounts::default(),
            fatigue: FatigueState::default(),
            needs_resupply: false,
            fcf_retreat_count: 0,
        }
    }

    pub fn reset_fcf_retreat_count(&mut self) {
        self.fcf_retreat_count = 0;
    }

    /// Record an FCF retreat against this fleet. If this fleet holds exactly
    /// one heavily damaged ship, that ship leaves the fleet's own tally.
    pub fn increment_fcf_retreat_count(&mut self) {
        if self.damage.heavy() == 1 {
            info!(fleet = %self.id, "Retreating heavily damaged ship via FCF");
            self.damage.remove_one(Severity::Heavy);
        }
        self.fcf_retreat_count += 1;
    }

    /// Put FCF-retreated ships back into the heavy tally and clear the counter.
    pub fn resolve_fcf_retreat_count(&mut self) {
        self.damage.add(Severity::Heavy, self.fcf_retreat_count);
        self.reset_fcf_retreat_count();
    }
}
