//! Scripted game screen
//!
//! A [`VisionService`] + [`Navigator`] backed by a list of frames instead of a
//! live screen. Used for dry runs (`--scenario`) and as the test double of the
//! sortie core.
//!
//! ## Frame model
//!
//! - A probe (`exists`, `wait_for`, `find_all`) answers from the current frame.
//!   Regions are ignored except for damage panels.
//! - Any tap, and any click that hits a visible template, advances to the next
//!   frame. The last frame sticks.
//! - A frame with a fleet icon publishes it to every open subscription when it
//!   becomes current (and on subscribe).
//! - Navigator calls are recorded and never advance.
//!
//! A script that stalls (the same frame probed more than the poll limit)
//! turns into an error instead of a hang.

mod scenario;

pub use scenario::{AuxiliaryScript, Scenario, ScriptedAuxiliary};

use crate::config::defaults;
use crate::navigator::{GameScreen, Navigator};
use crate::types::{
    DamageCounts, FleetId, MapId, Match, Pattern, Position, Rect, ScreenRegion, Severity, Template,
};
use crate::vision::{Subscription, VisionService};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Probes allowed on one frame before the script counts as stuck.
pub const DEFAULT_POLL_LIMIT: usize = 10_000;

// ============================================================================
// Frames
// ============================================================================

/// Damage icons shown in one panel region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamagePanel {
    pub region: ScreenRegion,
    #[serde(default)]
    pub heavy: u32,
    #[serde(default)]
    pub moderate: u32,
    #[serde(default)]
    pub minor: u32,
}

impl DamagePanel {
    fn counts(&self) -> DamageCounts {
        DamageCounts::new(self.heavy, self.moderate, self.minor)
    }
}

/// One screen state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub visible: Vec<Template>,
    #[serde(default)]
    pub damage: Vec<DamagePanel>,
    /// Fleet icon bounds in screen coordinates
    #[serde(default)]
    pub fleet_icon: Option<Rect>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn showing(templates: &[Template]) -> Self {
        Self {
            visible: templates.to_vec(),
            ..Self::default()
        }
    }

    pub fn with(mut self, template: Template) -> Self {
        self.visible.push(template);
        self
    }

    pub fn with_damage(mut self, region: ScreenRegion, counts: DamageCounts) -> Self {
        self.damage.retain(|p| p.region != region);
        self.damage.push(DamagePanel {
            region,
            heavy: counts.get(Severity::Heavy),
            moderate: counts.get(Severity::Moderate),
            minor: counts.get(Severity::Minor),
        });
        self
    }

    pub fn with_fleet_icon(mut self, bounds: Rect) -> Self {
        self.fleet_icon = Some(bounds);
        self
    }

    fn shows(&self, template: Template) -> bool {
        self.visible.contains(&template)
    }

    fn count(&self, region: ScreenRegion, template: Template) -> usize {
        match template {
            Template::Damage(severity) => self
                .damage
                .iter()
                .find(|p| p.region == region)
                .map_or(0, |p| p.counts().get(severity) as usize),
            other => usize::from(self.shows(other)),
        }
    }
}

/// Input recorded by the scripted game, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Click(Template),
    Tap(ScreenRegion),
    TapPoint(Position),
    Goto(GameScreen),
    SelectMap(MapId),
    SwitchFleet(FleetId),
}

// ============================================================================
// Scripted game
// ============================================================================

struct SimState {
    frames: Vec<Frame>,
    index: usize,
    polls: usize,
    actions: Vec<Action>,
    watchers: Vec<mpsc::Sender<Match>>,
}

impl SimState {
    fn current(&self) -> &Frame {
        &self.frames[self.index]
    }

    fn poll(&mut self, limit: usize) -> Result<()> {
        self.polls += 1;
        if self.polls > limit {
            bail!(
                "Scripted game stuck on frame {} of {} after {} probes",
                self.index + 1,
                self.frames.len(),
                limit
            );
        }
        Ok(())
    }

    fn record(&mut self, action: Action) {
        self.actions.push(action);
        self.polls = 0;
        if self.index + 1 < self.frames.len() {
            self.index += 1;
            debug!(frame = self.index, "[Sim] Advanced");
            self.publish();
        }
    }

    /// Send the current frame's fleet icon to every live subscription.
    fn publish(&mut self) {
        let Some(bounds) = self.current().fleet_icon else {
            return;
        };
        let m = Match { bounds, score: 1.0 };
        self.watchers.retain(|tx| !tx.is_closed());
        for tx in &self.watchers {
            if tx.try_send(m).is_err() {
                debug!("[Sim] Fleet icon event dropped");
            }
        }
    }
}

pub struct ScriptedGame {
    state: Mutex<SimState>,
    poll_limit: usize,
    unclickable: Vec<Template>,
}

impl ScriptedGame {
    /// An empty script behaves as a single blank frame.
    pub fn new(mut frames: Vec<Frame>) -> Self {
        if frames.is_empty() {
            frames.push(Frame::new());
        }
        Self {
            state: Mutex::new(SimState {
                frames,
                index: 0,
                polls: 0,
                actions: Vec::new(),
                watchers: Vec::new(),
            }),
            poll_limit: DEFAULT_POLL_LIMIT,
            unclickable: Vec::new(),
        }
    }

    pub fn with_poll_limit(mut self, limit: usize) -> Self {
        self.poll_limit = limit;
        self
    }

    /// Keep `template` visible to probes but make clicks on it miss.
    pub fn with_unclickable(mut self, template: Template) -> Self {
        self.unclickable.push(template);
        self
    }

    /// Zero-based index of the current frame.
    pub async fn frame_index(&self) -> usize {
        self.state.lock().await.index
    }

    /// Whether the script reached its last frame.
    pub async fn finished(&self) -> bool {
        let state = self.state.lock().await;
        state.index + 1 == state.frames.len()
    }

    pub async fn actions(&self) -> Vec<Action> {
        self.state.lock().await.actions.clone()
    }

    async fn probe(&self, template: Template) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.poll(self.poll_limit)?;
        Ok(state.current().shows(template))
    }
}

#[async_trait]
impl VisionService for ScriptedGame {
    async fn exists(&self, _region: ScreenRegion, pattern: &Pattern) -> Result<bool> {
        self.probe(pattern.template).await
    }

    async fn wait_for(
        &self,
        _region: ScreenRegion,
        pattern: &Pattern,
        _timeout: Duration,
    ) -> Result<bool> {
        self.probe(pattern.template).await
    }

    async fn click(&self, _region: ScreenRegion, pattern: &Pattern) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.poll(self.poll_limit)?;
        if !state.current().shows(pattern.template) || self.unclickable.contains(&pattern.template) {
            return Ok(false);
        }
        state.record(Action::Click(pattern.template));
        Ok(true)
    }

    async fn tap(&self, region: ScreenRegion) -> Result<()> {
        self.state.lock().await.record(Action::Tap(region));
        Ok(())
    }

    async fn tap_point(&self, _region: ScreenRegion, point: Position) -> Result<()> {
        self.state.lock().await.record(Action::TapPoint(point));
        Ok(())
    }

    async fn find_all(&self, region: ScreenRegion, pattern: &Pattern) -> Result<usize> {
        let mut state = self.state.lock().await;
        state.poll(self.poll_limit)?;
        Ok(state.current().count(region, pattern.template))
    }

    async fn subscribe(&self, region: ScreenRegion, pattern: &Pattern) -> Result<Subscription> {
        let (tx, sub) = Subscription::channel(defaults::FLEET_ICON_CHANNEL_CAPACITY);
        let mut state = self.state.lock().await;
        state.watchers.push(tx);
        state.publish();
        debug!(region = %region, template = %pattern.template, "[Sim] Subscribed");
        Ok(sub)
    }

    fn backend_name(&self) -> &str {
        "scripted"
    }
}

#[async_trait]
impl Navigator for ScriptedGame {
    async fn goto(&self, screen: GameScreen) -> Result<()> {
        self.state.lock().await.actions.push(Action::Goto(screen));
        Ok(())
    }

    async fn select_map(&self, map: &MapId) -> Result<()> {
        self.state.lock().await.actions.push(Action::SelectMap(*map));
        Ok(())
    }

    async fn switch_fleet(&self, fleet: FleetId) -> Result<()> {
        self.state.lock().await.actions.push(Action::SwitchFleet(fleet));
        Ok(())
    }
}
