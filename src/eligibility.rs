//! Eligibility Gate
//!
//! Pre-sortie GO / NO-GO decision. The checks run against the pre-sortie
//! panel in a fixed order (supply, damage, fatigue, port) and every failing
//! check contributes a [`Veto`]. Vetoes are not cumulative: the delay of the
//! last veto raised is the one the scheduling clock ends up with.

use crate::config::{defaults, SortieConfig};
use crate::error::SortieResult;
use crate::navigator::Navigator;
use crate::sampler::{ConditionSampler, SampleMode};
use crate::types::{
    CombatFleet, DamageCounts, FatigueState, FleetId, FleetMode, Pattern, ScreenRegion, Severity,
    Template,
};
use crate::vision::VisionService;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Vetoes
// ============================================================================

/// Reason a sortie may not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Veto {
    NeedsResupply,
    HighFatigue,
    MediumFatigue,
    /// Ships at or below the repair limit
    DamageOverThreshold { count: u32 },
    PortFull,
}

impl Veto {
    /// Retry delay the veto asks for.
    pub fn delay(&self) -> Duration {
        match self {
            Veto::NeedsResupply | Veto::DamageOverThreshold { .. } => defaults::DEFAULT_RETRY_DELAY,
            Veto::HighFatigue => defaults::HIGH_FATIGUE_DELAY,
            Veto::MediumFatigue => defaults::MEDIUM_FATIGUE_DELAY,
            Veto::PortFull => defaults::PORT_FULL_DELAY,
        }
    }
}

impl std::fmt::Display for Veto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Veto::NeedsResupply => write!(f, "resupply required"),
            Veto::HighFatigue => write!(f, "fleet has high fatigue"),
            Veto::MediumFatigue => write!(f, "fleet has medium fatigue"),
            Veto::DamageOverThreshold { count } => {
                write!(f, "{count} ship(s) at or below damage threshold")
            }
            Veto::PortFull => write!(f, "port is full"),
        }
    }
}

/// Raw results of the pre-sortie checks, already merged across fleets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readings {
    pub needs_resupply: bool,
    pub damage: DamageCounts,
    /// `None` when fatigue checking is disabled
    pub fatigue: Option<FatigueState>,
    pub port_full: bool,
}

/// Turn readings into vetoes, in evaluation order.
pub fn decide_vetoes(readings: &Readings, repair_limit: Severity) -> Vec<Veto> {
    let mut vetoes = Vec::new();

    if readings.needs_resupply {
        vetoes.push(Veto::NeedsResupply);
    }

    if let Some(fatigue) = readings.fatigue {
        if fatigue.high {
            vetoes.push(Veto::HighFatigue);
        } else if fatigue.medium {
            vetoes.push(Veto::MediumFatigue);
        }
    }

    let count = readings.damage.count_at_threshold(repair_limit);
    if count > 0 {
        vetoes.push(Veto::DamageOverThreshold { count });
    }

    if readings.port_full {
        vetoes.push(Veto::PortFull);
    }

    vetoes
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub vetoes: Vec<Veto>,
    /// Damage of the sortieing fleets, summed per severity
    pub damage: DamageCounts,
    pub fatigue: FatigueState,
}

impl Verdict {
    pub fn eligible(&self) -> bool {
        self.vetoes.is_empty()
    }

    /// Delay of the last veto raised; `None` when eligible.
    pub fn delay(&self) -> Option<Duration> {
        self.vetoes.last().map(Veto::delay)
    }
}

// ============================================================================
// Gate
// ============================================================================

pub struct EligibilityGate {
    vision: Arc<dyn VisionService>,
    navigator: Arc<dyn Navigator>,
    sampler: ConditionSampler,
    config: Arc<SortieConfig>,
}

impl EligibilityGate {
    pub fn new(
        vision: Arc<dyn VisionService>,
        navigator: Arc<dyn Navigator>,
        config: Arc<SortieConfig>,
    ) -> Self {
        let sampler = ConditionSampler::new(Arc::clone(&vision), &config.vision);
        Self {
            vision,
            navigator,
            sampler,
            config,
        }
    }

    /// Run every pre-sortie check. `escort` is only given in combined-fleet
    /// mode.
    pub async fn evaluate(
        &self,
        primary: &mut CombatFleet,
        escort: Option<&mut CombatFleet>,
    ) -> SortieResult<Verdict> {
        let settings = &self.config.sortie;

        if settings.fleet_mode == FleetMode::Striking {
            self.navigator.switch_fleet(FleetId::STRIKING).await?;
        }

        let mut needs_resupply = self.check_fleet(primary).await?;
        let mut damage = primary.damage;
        let mut fatigue = primary.fatigue;

        if let Some(escort) = escort {
            self.navigator.switch_fleet(escort.id).await?;
            needs_resupply |= self.check_fleet(escort).await?;
            self.navigator.switch_fleet(FleetId::MAIN).await?;

            damage = damage.merged(&escort.damage);
            fatigue = fatigue.merged(&escort.fatigue);
        }

        let readings = Readings {
            needs_resupply,
            damage,
            fatigue: settings.check_fatigue.then_some(fatigue),
            port_full: self.port_full().await?,
        };
        debug!(?readings, "Pre-sortie readings");

        let vetoes = decide_vetoes(&readings, settings.repair_limit);
        for veto in &vetoes {
            debug!(delay_secs = veto.delay().as_secs(), %veto, "Veto raised");
        }

        Ok(Verdict {
            vetoes,
            damage,
            fatigue,
        })
    }

    /// Supply, damage and (optionally) fatigue of one fleet. Returns whether
    /// the fleet needs resupply.
    async fn check_fleet(&self, fleet: &mut CombatFleet) -> SortieResult<bool> {
        let supplied = self.sampler.check_supplies(fleet).await?;

        if self.config.sortie.fleet_mode == FleetMode::Striking {
            self.sampler.sample_damage_with_seventh(fleet).await?;
        } else {
            self.sampler
                .sample_damage(fleet, ScreenRegion::CheckDamage, SampleMode::Reset)
                .await;
        }

        if self.config.sortie.check_fatigue {
            self.sampler
                .sample_fatigue(fleet, ScreenRegion::CheckFatigue)
                .await;
        }

        Ok(!supplied)
    }

    /// Port-full warning; always checked on event maps.
    async fn port_full(&self) -> SortieResult<bool> {
        let map = self.config.sortie.map;
        if !(self.config.sortie.port_check || map.is_event()) {
            return Ok(false);
        }
        let notice = if map.is_event() {
            Template::PortFullEvent
        } else {
            Template::PortFull
        };
        Ok(self
            .vision
            .exists(ScreenRegion::Lower, &Pattern::new(notice))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Action, Frame, ScriptedGame};
    use crate::types::FatigueLevel;

    #[test]
    fn test_later_veto_delay_wins() {
        let readings = Readings {
            damage: DamageCounts::new(1, 0, 0),
            fatigue: Some(FatigueState { medium: false, high: true }),
            ..Readings::default()
        };
        let vetoes = decide_vetoes(&readings, Severity::Moderate);
        assert_eq!(
            vetoes,
            vec![Veto::HighFatigue, Veto::DamageOverThreshold { count: 1 }]
        );

        let verdict = Verdict {
            vetoes,
            damage: readings.damage,
            fatigue: FatigueState::default(),
        };
        assert!(!verdict.eligible());
        assert_eq!(verdict.delay(), Some(Duration::ZERO));
    }

    #[test]
    fn test_port_full_after_damage_stores_fifteen_minutes() {
        let readings = Readings {
            needs_resupply: true,
            damage: DamageCounts::new(0, 2, 0),
            port_full: true,
            ..Readings::default()
        };
        let vetoes = decide_vetoes(&readings, Severity::Moderate);
        assert_eq!(vetoes.len(), 3);
        assert_eq!(vetoes.last().map(Veto::delay), Some(Duration::from_secs(15 * 60)));
    }

    #[test]
    fn test_high_fatigue_shadows_medium() {
        let readings = Readings {
            fatigue: Some(FatigueState { medium: true, high: true }),
            ..Readings::default()
        };
        assert_eq!(decide_vetoes(&readings, Severity::Heavy), vec![Veto::HighFatigue]);
    }

    #[test]
    fn test_minor_damage_passes_moderate_limit() {
        let readings = Readings {
            damage: DamageCounts::new(0, 0, 4),
            ..Readings::default()
        };
        assert!(decide_vetoes(&readings, Severity::Moderate).is_empty());
    }

    #[tokio::test]
    async fn test_fatigue_ignored_when_checking_disabled() {
        let game = Arc::new(ScriptedGame::new(vec![Frame::showing(&[Template::Fatigue(
            FatigueLevel::High,
        )])]));
        let gate = EligibilityGate::new(
            game.clone(),
            game.clone(),
            Arc::new(SortieConfig::default()),
        );
        let mut fleet = CombatFleet::new(FleetId::MAIN);
        let verdict = gate.evaluate(&mut fleet, None).await.unwrap();
        assert!(verdict.eligible(), "{:?}", verdict.vetoes);
    }

    #[tokio::test]
    async fn test_event_map_always_checks_port() {
        let game = Arc::new(ScriptedGame::new(vec![Frame::showing(&[Template::PortFullEvent])]));
        let mut config = SortieConfig::default();
        config.sortie.map = "E-3".parse().unwrap();
        let gate = EligibilityGate::new(game.clone(), game.clone(), Arc::new(config));

        let mut fleet = CombatFleet::new(FleetId::MAIN);
        let verdict = gate.evaluate(&mut fleet, None).await.unwrap();
        assert_eq!(verdict.vetoes, vec![Veto::PortFull]);
    }

    #[tokio::test]
    async fn test_striking_fleet_counts_seventh_ship() {
        let game = Arc::new(ScriptedGame::new(vec![
            Frame::new().with_damage(ScreenRegion::CheckDamage, DamageCounts::new(0, 0, 1)),
            Frame::new().with_damage(ScreenRegion::CheckDamageSeventh, DamageCounts::new(1, 0, 0)),
        ]));
        let mut config = SortieConfig::default();
        config.sortie.fleet_mode = FleetMode::Striking;
        let gate = EligibilityGate::new(game.clone(), game.clone(), Arc::new(config));

        let mut fleet = CombatFleet::new(FleetId::STRIKING);
        let verdict = gate.evaluate(&mut fleet, None).await.unwrap();

        assert_eq!(verdict.damage, DamageCounts::new(1, 0, 1));
        assert_eq!(verdict.vetoes, vec![Veto::DamageOverThreshold { count: 1 }]);
        assert_eq!(
            game.actions().await,
            vec![
                Action::SwitchFleet(FleetId::STRIKING),
                Action::Tap(ScreenRegion::SeventhShipNext),
            ]
        );
    }

    #[tokio::test]
    async fn test_combined_fleet_checks_escort_and_switches_back() {
        let game = Arc::new(ScriptedGame::new(vec![Frame::showing(&[Template::ResupplyNeeded])]));
        let mut config = SortieConfig::default();
        config.sortie.combined_fleet = true;
        config.sortie.fleet_mode = FleetMode::Ctf;
        let gate = EligibilityGate::new(game.clone(), game.clone(), Arc::new(config));

        let mut main = CombatFleet::new(FleetId::MAIN);
        let mut escort = CombatFleet::new(FleetId::ESCORT);
        let verdict = gate.evaluate(&mut main, Some(&mut escort)).await.unwrap();

        assert_eq!(verdict.vetoes, vec![Veto::NeedsResupply]);
        assert!(main.needs_resupply && escort.needs_resupply);
        assert_eq!(
            game.actions().await,
            vec![
                Action::SwitchFleet(FleetId::ESCORT),
                Action::SwitchFleet(FleetId::MAIN),
            ]
        );
    }
}
