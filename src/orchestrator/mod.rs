//! Sortie Orchestrator
//!
//! Drives one sortie from the launch decision to the return to port:
//!
//! 1. select the map, ask the auxiliary gate (when `lbas_enabled`)
//! 2. run the eligibility gate, defer on any veto
//! 3. launch, start the position tracker
//! 4. alternate between the traversal loop (`traversal`) and node combat
//!    (`battle`) until a terminal screen appears
//! 5. restore FCF counters, stop the tracker, report
//!
//! Declines and launch failures are returned as [`SortieOutcome`] values and
//! reschedule the [`SortieClock`]; only timeouts on expected screens and
//! collaborator failures are errors.

mod battle;
pub mod fcf;
pub mod traversal;

pub use fcf::{fcf_decision, FcfDecision};
pub use traversal::{should_retreat, RetreatReason, TravelSignal, TRAVERSAL_PRIORITY};

use crate::auxiliary::AuxiliaryGate;
use crate::config::{defaults, SortieConfig};
use crate::eligibility::{EligibilityGate, Veto};
use crate::error::{SortieError, SortieResult};
use crate::map::MapProvider;
use crate::navigator::{GameScreen, Navigator};
use crate::sampler::ConditionSampler;
use crate::schedule::SortieClock;
use crate::stats::SortieStats;
use crate::tracker::PositionTracker;
use crate::types::{
    CombatFleet, DamageCounts, FleetId, FleetMode, MapId, Pattern, ScreenRegion, Template,
};
use crate::vision::VisionService;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ============================================================================
// States and outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortieState {
    Idle,
    SelectingMap,
    PreflightCheck,
    Traveling,
    AtNode,
    NightBattleDecision,
    AwaitingReturn,
    Complete,
    Declined,
}

/// Why a sortie was not launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// Auxiliary groups not ready
    AuxiliaryGate,
    Vetoed(Vec<Veto>),
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclineReason::AuxiliaryGate => write!(f, "auxiliary groups not ready"),
            DeclineReason::Vetoed(vetoes) => {
                let reasons: Vec<String> = vetoes.iter().map(ToString::to_string).collect();
                write!(f, "{}", reasons.join("; "))
            }
        }
    }
}

/// How a launched sortie ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortieEnding {
    /// Back at the home screen without a retreat prompt (resource or final node)
    ReturnedHome,
    /// Flagship critically damaged; the game forced the retreat
    FlagshipRetreat,
    Retreated(RetreatReason),
}

/// Summary of a completed sortie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortieReport {
    pub map: MapId,
    /// Node labels in visiting order
    pub nodes: Vec<String>,
    pub ending: SortieEnding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortieOutcome {
    Declined(DeclineReason),
    LaunchFailed,
    Completed(SortieReport),
}

impl SortieOutcome {
    /// `true` when the sortie ran to completion, however it ended.
    pub fn ran(&self) -> bool {
        matches!(self, SortieOutcome::Completed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortieOutcome::Declined(_) => "declined",
            SortieOutcome::LaunchFailed => "launch_failed",
            SortieOutcome::Completed(_) => "completed",
        }
    }
}

/// Label recorded for a node the tracker could not resolve.
pub const UNKNOWN_NODE: &str = "?";

/// Per-sortie scratch state.
#[derive(Debug, Default)]
pub(crate) struct SortieSession {
    pub nodes: Vec<String>,
    /// Damage of all sortieing fleets, summed per severity
    pub damage: DamageCounts,
}

/// Sleep for `d`, or just yield when `d` is zero so polling loops never
/// starve the tracker task.
pub(crate) async fn pause(d: Duration) {
    if d.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(d).await;
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    config: Arc<SortieConfig>,
    vision: Arc<dyn VisionService>,
    navigator: Arc<dyn Navigator>,
    map: Arc<dyn MapProvider>,
    auxiliary: Option<Arc<dyn AuxiliaryGate>>,
    gate: EligibilityGate,
    sampler: ConditionSampler,
    primary: CombatFleet,
    /// Escort fleet of a combined fleet
    escort: Option<CombatFleet>,
    clock: SortieClock,
    state: SortieState,
    stats: SortieStats,
    last_report: Option<SortieReport>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<SortieConfig>,
        vision: Arc<dyn VisionService>,
        navigator: Arc<dyn Navigator>,
        map: Arc<dyn MapProvider>,
    ) -> Self {
        let primary_id = if config.sortie.fleet_mode == FleetMode::Striking {
            FleetId::STRIKING
        } else {
            FleetId::MAIN
        };
        let escort = config
            .is_combined()
            .then(|| CombatFleet::new(FleetId::ESCORT));

        info!(
            map = %config.sortie.map,
            mode = config.sortie.fleet_mode.as_str(),
            combined = config.is_combined(),
            node_cap = config.sortie.combat_nodes,
            backend = vision.backend_name(),
            "Sortie orchestrator ready"
        );
        if map.map_id() != config.sortie.map {
            warn!(
                configured = %config.sortie.map,
                provided = %map.map_id(),
                "Map provider serves a different map than configured"
            );
        }

        Self {
            gate: EligibilityGate::new(
                Arc::clone(&vision),
                Arc::clone(&navigator),
                Arc::clone(&config),
            ),
            sampler: ConditionSampler::new(Arc::clone(&vision), &config.vision),
            primary: CombatFleet::new(primary_id),
            escort,
            config,
            vision,
            navigator,
            map,
            auxiliary: None,
            clock: SortieClock::new(),
            state: SortieState::Idle,
            stats: SortieStats::default(),
            last_report: None,
        }
    }

    /// Attach the auxiliary gate. It is only consulted when
    /// `sortie.lbas_enabled` is set.
    pub fn with_auxiliary(mut self, gate: Arc<dyn AuxiliaryGate>) -> Self {
        if !self.config.sortie.lbas_enabled {
            warn!("Auxiliary gate attached but sortie.lbas_enabled is false, ignoring it");
        }
        self.auxiliary = Some(gate);
        self
    }

    // ------------------------------------------------------------------------
    // Caller-facing API
    // ------------------------------------------------------------------------

    /// Whether the scheduling clock allows a sortie now.
    pub fn needs_to_sortie(&self) -> bool {
        self.clock.is_due()
    }

    /// Human-readable next sortie time. Also logged.
    pub fn status_report(&self) -> String {
        let report = format!("Next combat sortie at {}", self.clock.format_next());
        info!("{}", report);
        report
    }

    /// Navigate to the sortie menu so `run_sortie` can pick the map.
    pub async fn goto_sortie_menu(&self) -> SortieResult<()> {
        self.navigator.goto(GameScreen::Sortie).await?;
        Ok(())
    }

    pub fn state(&self) -> SortieState {
        self.state
    }

    pub fn stats(&self) -> &SortieStats {
        &self.stats
    }

    pub fn last_report(&self) -> Option<&SortieReport> {
        self.last_report.as_ref()
    }

    pub fn clock(&self) -> &SortieClock {
        &self.clock
    }

    pub fn primary_fleet(&self) -> &CombatFleet {
        &self.primary
    }

    pub fn escort_fleet(&self) -> Option<&CombatFleet> {
        self.escort.as_ref()
    }

    /// Run one sortie attempt end to end.
    ///
    /// Returns `Declined` or `LaunchFailed` (clock rescheduled) when the
    /// sortie did not start, `Completed` when it ran to one of its terminal
    /// screens. The position tracker is stopped on every path. On error the
    /// FCF counters are restored and the state drops back to `Idle`.
    pub async fn run_sortie(&mut self) -> SortieResult<SortieOutcome> {
        self.stats.attempted += 1;
        let result = self.attempt().await;
        if let Err(e) = &result {
            error!(error = %e, state = ?self.state, "Sortie aborted");
            self.restore_fcf_counts();
            self.transition(SortieState::Idle);
        }
        result
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn attempt(&mut self) -> SortieResult<SortieOutcome> {
        let map_id = self.config.sortie.map;

        self.transition(SortieState::SelectingMap);
        self.navigator.select_map(&map_id).await?;

        if let Some(aux) = self.lbas_gate() {
            let gate = aux.prepare(self.config.sortie.lbas_check_fatigue).await?;
            if !gate.ready {
                return Ok(self.decline(DeclineReason::AuxiliaryGate, gate.delay));
            }
        }

        self.transition(SortieState::PreflightCheck);
        let verdict = self
            .gate
            .evaluate(&mut self.primary, self.escort.as_mut())
            .await?;
        if let Some(delay) = verdict.delay() {
            return Ok(self.decline(DeclineReason::Vetoed(verdict.vetoes), delay));
        }

        if !self.launch().await? {
            warn!("Could not begin sortie: launch control not found");
            self.clock.defer(defaults::DEFAULT_RETRY_DELAY);
            self.stats.launch_failures += 1;
            self.transition(SortieState::Idle);
            return Ok(SortieOutcome::LaunchFailed);
        }
        self.stats.launched += 1;
        info!(map = %map_id, "Sortie launched");

        if let Some(escort) = self.escort.as_mut() {
            self.primary.reset_fcf_retreat_count();
            escort.reset_fcf_retreat_count();
        }

        let icon = Pattern::new(Template::fleet_icon(self.config.sortie.fleet_mode))
            .similar(self.config.vision.fleet_icon_similarity);
        let subscription = self.vision.subscribe(ScreenRegion::Game, &icon).await?;
        let mut tracker =
            PositionTracker::start(subscription, Arc::clone(&self.map), self.config.viewport);

        let mut session = SortieSession {
            damage: verdict.damage,
            ..SortieSession::default()
        };
        let result = self.combat_logic(&mut session, &tracker).await;
        tracker.stop().await;
        if result.is_err() {
            debug!(nodes = ?session.nodes, "Nodes fought before abort");
        }
        let ending = result?;

        self.restore_fcf_counts();
        Ok(SortieOutcome::Completed(self.complete(map_id, session, ending)))
    }

    /// Auxiliary gate, when auxiliary groups are enabled for this map.
    pub(crate) fn lbas_gate(&self) -> Option<&Arc<dyn AuxiliaryGate>> {
        if self.config.sortie.lbas_enabled {
            self.auxiliary.as_ref()
        } else {
            None
        }
    }

    /// Fold FCF-retreated ships back into each fleet's heavy tally.
    fn restore_fcf_counts(&mut self) {
        if let Some(escort) = self.escort.as_mut() {
            self.primary.resolve_fcf_retreat_count();
            escort.resolve_fcf_retreat_count();
        }
    }

    fn transition(&mut self, next: SortieState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "[Sortie] State change");
            self.state = next;
        }
    }

    fn decline(&mut self, reason: DeclineReason, delay: Duration) -> SortieOutcome {
        warn!(delay_secs = delay.as_secs(), "Canceling combat sortie: {}", reason);
        self.clock.defer(delay);
        self.stats.declined += 1;
        self.transition(SortieState::Declined);
        SortieOutcome::Declined(reason)
    }

    /// Click the launch control. `false` when it was not on screen.
    async fn launch(&self) -> SortieResult<bool> {
        let button = if self.config.sortie.lbas_enabled {
            Template::CombatStartLbas
        } else {
            Template::CombatStart
        };
        Ok(self
            .vision
            .click(ScreenRegion::LowerRight, &Pattern::new(button))
            .await?)
    }

    fn complete(
        &mut self,
        map: MapId,
        session: SortieSession,
        ending: SortieEnding,
    ) -> SortieReport {
        self.transition(SortieState::Complete);
        self.stats.completed += 1;
        self.stats.nodes_fought += session.nodes.len() as u64;
        if ending == SortieEnding::FlagshipRetreat {
            self.stats.forced_retreats += 1;
        }

        info!(
            ending = ?ending,
            "Sortie complete. Encountered {} combat nodes (nodes {}).",
            session.nodes.len(),
            session.nodes.join(", ")
        );

        let report = SortieReport {
            map,
            nodes: session.nodes,
            ending,
        };
        self.last_report = Some(report.clone());
        report
    }

    /// Wait (bounded) for an affordance the screen flow guarantees.
    async fn expect(&self, region: ScreenRegion, template: Template) -> SortieResult<()> {
        let timeout = self.config.timing.screen_timeout();
        if self
            .vision
            .wait_for(region, &Pattern::new(template), timeout)
            .await?
        {
            Ok(())
        } else {
            Err(SortieError::Timeout {
                region,
                template,
                timeout,
            })
        }
    }

    async fn visible(&self, region: ScreenRegion, template: Template) -> SortieResult<bool> {
        Ok(self.vision.exists(region, &Pattern::new(template)).await?)
    }
}
