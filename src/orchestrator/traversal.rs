//! Between-node traversal and terminal checks.
//!
//! The traversal loop evaluates [`TRAVERSAL_PRIORITY`] top to bottom on every
//! tick and reacts to the first signal visible. Terminal screens (home,
//! flagship damage, retreat prompt) are checked after each arrival.

use super::{pause, Orchestrator, SortieEnding, SortieSession, SortieState};
use crate::error::{SortieError, SortieResult};
use crate::tracker::TrackerHandle;
use crate::types::{DamageCounts, Formation, Node, ScreenRegion, Severity, Template};
use serde::Serialize;
use tracing::{debug, info, warn};

// ============================================================================
// Signals
// ============================================================================

/// Screen states the traversal loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelSignal {
    /// Compass spinning: click through until it clears
    Compass,
    /// Formation prompt: the fleet reached a combat node
    FormationPrompt,
    /// Node-select prompt: click the forced route, if configured
    NodeSelect,
    /// Flagship critically damaged: leave the loop
    FlagshipDamaged,
    /// Proceed, alt-proceed or night battle ready: at a node without a
    /// formation step
    Proceed,
}

/// Evaluation order of the traversal loop, highest priority first.
pub const TRAVERSAL_PRIORITY: [TravelSignal; 5] = [
    TravelSignal::Compass,
    TravelSignal::FormationPrompt,
    TravelSignal::NodeSelect,
    TravelSignal::FlagshipDamaged,
    TravelSignal::Proceed,
];

impl TravelSignal {
    /// Any of these (region, template) pairs being visible raises the signal.
    pub fn probes(self, combined_fleet: bool) -> Vec<(ScreenRegion, Template)> {
        match self {
            TravelSignal::Compass => vec![(ScreenRegion::Game, Template::Compass)],
            TravelSignal::FormationPrompt => vec![(
                ScreenRegion::FormationPanel,
                Template::Formation(Formation::prompt_marker(combined_fleet)),
            )],
            TravelSignal::NodeSelect => vec![(ScreenRegion::Game, Template::NodeSelect)],
            TravelSignal::FlagshipDamaged => {
                vec![(ScreenRegion::LowerRightCorner, Template::FlagshipDamaged)]
            }
            TravelSignal::Proceed => vec![
                (ScreenRegion::LowerRightCorner, Template::NextAlt),
                (ScreenRegion::LowerRightCorner, Template::Next),
                (ScreenRegion::Game, Template::NightBattleFight),
            ],
        }
    }
}

/// Where the traversal loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Arrival {
    /// At a combat node; the tracked node, if the tracker resolved one
    AtNode(Option<Node>),
    FlagshipDamaged,
}

// ============================================================================
// Retreat decision
// ============================================================================

/// Why the fleet retreats from the continue/retreat prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetreatReason {
    /// Ships at or below the retreat limit
    DamageThreshold { count: u32 },
    /// Configured number of combat nodes reached
    NodeCap { visited: usize },
}

/// Retreat when any ship is at or below `retreat_limit`, or once `node_cap`
/// nodes have been fought. Damage is reported first when both apply.
pub fn should_retreat(
    visited: usize,
    node_cap: usize,
    damage: &DamageCounts,
    retreat_limit: Severity,
) -> Option<RetreatReason> {
    let count = damage.count_at_threshold(retreat_limit);
    if count > 0 {
        Some(RetreatReason::DamageThreshold { count })
    } else if visited >= node_cap {
        Some(RetreatReason::NodeCap { visited })
    } else {
        None
    }
}

// ============================================================================
// Loops
// ============================================================================

impl Orchestrator {
    /// First visible signal in priority order.
    pub(crate) async fn detect_signal(&self) -> SortieResult<Option<TravelSignal>> {
        let combined = self.config.is_combined();
        for signal in TRAVERSAL_PRIORITY {
            for (region, template) in signal.probes(combined) {
                if self.visible(region, template).await? {
                    return Ok(Some(signal));
                }
            }
        }
        Ok(None)
    }

    /// Poll until the fleet reaches a combat node or the flagship is
    /// critically damaged. Unbounded: compass and travel animations always
    /// end in one of those.
    pub(crate) async fn travel(&mut self, tracker: &TrackerHandle) -> SortieResult<Arrival> {
        self.transition(SortieState::Traveling);
        let timing = self.config.timing.clone();

        loop {
            match self.detect_signal().await? {
                Some(TravelSignal::Compass) => {
                    debug!("Compass spin");
                    while self.visible(ScreenRegion::Game, Template::Compass).await? {
                        self.vision.tap(ScreenRegion::Center).await?;
                        pause(timing.compass_click_interval()).await;
                    }
                }
                Some(TravelSignal::FormationPrompt) => {
                    let node = tracker.current_node();
                    info!("Fleet at node {}", node_label(node.as_ref()));
                    self.map.resolve_formation(node.as_ref()).await?;
                    self.vision.park_cursor(ScreenRegion::Top).await?;
                    return Ok(Arrival::AtNode(node));
                }
                Some(TravelSignal::NodeSelect) => {
                    self.follow_forced_route(tracker).await?;
                    pause(timing.poll_interval()).await;
                }
                Some(TravelSignal::FlagshipDamaged) => return Ok(Arrival::FlagshipDamaged),
                Some(TravelSignal::Proceed) => {
                    let node = tracker.current_node();
                    info!("Fleet at node {} (no formation prompt)", node_label(node.as_ref()));
                    return Ok(Arrival::AtNode(node));
                }
                None => pause(timing.poll_interval()).await,
            }
        }
    }

    /// Click the configured next node for the node the fleet is at.
    async fn follow_forced_route(&self, tracker: &TrackerHandle) -> SortieResult<()> {
        let Some(current) = tracker.current_node() else {
            debug!("Node select prompt before the fleet position is known");
            return Ok(());
        };
        let Some(target) = self.config.sortie.node_selects.get(&current.name) else {
            debug!(node = %current, "Node select prompt without a configured route");
            return Ok(());
        };
        let next = self
            .map
            .node(target)
            .ok_or_else(|| SortieError::UnknownRouteTarget {
                from: current.name.clone(),
                to: target.clone(),
            })?;

        info!(from = %current, to = %next, "Selecting forced route");
        self.map.click_node(&next).await?;
        self.vision.park_cursor(ScreenRegion::CursorRest).await?;
        Ok(())
    }

    /// Terminal screens, in order: home, flagship damage, retreat prompt.
    /// `None` means keep traveling.
    pub(crate) async fn check_terminal(
        &self,
        session: &SortieSession,
    ) -> SortieResult<Option<SortieEnding>> {
        if self.visible(ScreenRegion::Left, Template::HomeMenuSortie).await? {
            return Ok(Some(SortieEnding::ReturnedHome));
        }

        if self
            .visible(ScreenRegion::LowerRightCorner, Template::FlagshipDamaged)
            .await?
        {
            warn!("Flagship damaged. Automatic retreat.");
            self.vision.tap(ScreenRegion::Game).await?;
            self.expect(ScreenRegion::Left, Template::HomeMenuSortie).await?;
            return Ok(Some(SortieEnding::FlagshipRetreat));
        }

        if self.visible(ScreenRegion::Game, Template::CombatRetreat).await? {
            let settings = &self.config.sortie;
            let decision = should_retreat(
                session.nodes.len(),
                settings.combat_nodes,
                &session.damage,
                settings.retreat_limit,
            );
            match decision {
                Some(reason) => {
                    match reason {
                        RetreatReason::DamageThreshold { count } => {
                            warn!("{} ship(s) damaged at or below threshold. Retreating.", count);
                        }
                        RetreatReason::NodeCap { visited } => {
                            info!(visited, "Ran the necessary number of nodes. Retreating.");
                        }
                    }
                    self.map.select_continue_or_retreat(true).await?;
                    self.expect(ScreenRegion::Left, Template::HomeMenuSortie).await?;
                    return Ok(Some(SortieEnding::Retreated(reason)));
                }
                None => {
                    info!(visited = session.nodes.len(), "Continuing sortie");
                    self.map.select_continue_or_retreat(false).await?;
                }
            }
        }

        Ok(None)
    }
}

pub(crate) fn node_label(node: Option<&Node>) -> &str {
    node.map_or(super::UNKNOWN_NODE, |n| n.name.as_str())
}
