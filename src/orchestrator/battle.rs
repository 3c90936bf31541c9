//! Node combat: intro dialogue, battle loop, night battle, results and the
//! trailing-prompt drain.

use super::traversal::{node_label, Arrival};
use super::{fcf, pause, Orchestrator, SortieEnding, SortieSession, SortieState};
use crate::error::SortieResult;
use crate::sampler::SampleMode;
use crate::tracker::TrackerHandle;
use crate::types::{Node, ScreenRegion, Template};
use tracing::{debug, info};

/// How the battle loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BattleEnd {
    NightBattlePrompt,
    Results,
}

impl Orchestrator {
    /// Everything after launch until a terminal screen.
    pub(crate) async fn combat_logic(
        &mut self,
        session: &mut SortieSession,
        tracker: &TrackerHandle,
    ) -> SortieResult<SortieEnding> {
        if let Some(aux) = self.lbas_gate() {
            aux.assign_groups().await?;
        }

        self.primary.needs_resupply = true;
        if let Some(escort) = self.escort.as_mut() {
            escort.needs_resupply = true;
        }

        loop {
            if let Arrival::AtNode(node) = self.travel(tracker).await? {
                self.fight_node(session, node).await?;
            }

            if let Some(ending) = self.check_terminal(session).await? {
                return Ok(ending);
            }
        }
    }

    async fn fight_node(
        &mut self,
        session: &mut SortieSession,
        node: Option<Node>,
    ) -> SortieResult<()> {
        self.transition(SortieState::AtNode);
        session.nodes.push(node_label(node.as_ref()).to_string());
        debug!(visited = ?session.nodes, "Node recorded");

        self.dismiss_dialogue().await?;

        if self.battle_loop().await? == BattleEnd::NightBattlePrompt {
            self.transition(SortieState::NightBattleDecision);
            if self.map.resolve_night_battle(node.as_ref()).await? {
                self.battle_loop().await?;
            }
        }

        self.transition(SortieState::AwaitingReturn);
        self.collect_results(session).await?;
        self.drain_prompts(session).await
    }

    /// Click away the boss dialogue. Fixed delays: the animation length varies
    /// and offers nothing to wait on.
    async fn dismiss_dialogue(&self) -> SortieResult<()> {
        let timing = &self.config.timing;
        pause(timing.dialogue_delay()).await;
        self.vision.tap(ScreenRegion::Center).await?;
        pause(timing.click_settle()).await;
        self.vision.tap(ScreenRegion::Center).await?;
        self.vision.park_cursor(ScreenRegion::CursorRest).await?;
        Ok(())
    }

    /// Poll until the night-battle prompt or the results affordance appears.
    async fn battle_loop(&self) -> SortieResult<BattleEnd> {
        loop {
            if self.visible(ScreenRegion::Game, Template::NightBattleFight).await? {
                return Ok(BattleEnd::NightBattlePrompt);
            }
            if self.visible(ScreenRegion::Game, Template::Next).await?
                || self.visible(ScreenRegion::Game, Template::NextAlt).await?
            {
                return Ok(BattleEnd::Results);
            }
            pause(self.config.timing.poll_interval()).await;
        }
    }

    /// Click through the results screen(s) and re-sample damage. In combined
    /// mode the escort fleet has its own results screen; both tallies are
    /// summed into the session damage.
    async fn collect_results(&mut self, session: &mut SortieSession) -> SortieResult<()> {
        self.expect(ScreenRegion::LowerRightCorner, Template::Next).await?;
        self.vision.tap(ScreenRegion::Center).await?;
        self.expect(ScreenRegion::Game, Template::MvpMarker).await?;

        session.damage = self
            .sampler
            .sample_damage(
                &mut self.primary,
                ScreenRegion::CheckDamageCombat,
                SampleMode::Reset,
            )
            .await;

        if self.escort.is_some() {
            self.expect(ScreenRegion::LowerRightCorner, Template::Next).await?;
            self.vision.tap(ScreenRegion::Center).await?;
            pause(self.config.timing.escort_results_delay()).await;
            self.expect(ScreenRegion::Game, Template::MvpMarker).await?;

            if let Some(escort) = self.escort.as_mut() {
                let escort_damage = self
                    .sampler
                    .sample_damage(escort, ScreenRegion::CheckDamageCombat, SampleMode::Reset)
                    .await;
                session.damage = session.damage.merged(&escort_damage);
            }
        }

        self.vision.park_cursor(ScreenRegion::CursorRest).await?;
        info!(damage = %session.damage, node = session.nodes.len(), "Battle results");
        Ok(())
    }

    /// Click through trailing prompts until the home screen, the flagship
    /// damage notice or the retreat prompt shows. In combined mode anything
    /// else goes to the FCF resolver.
    async fn drain_prompts(&mut self, session: &mut SortieSession) -> SortieResult<()> {
        loop {
            if self.visible(ScreenRegion::Game, Template::HomeMenuSortie).await?
                || self.visible(ScreenRegion::Game, Template::FlagshipDamaged).await?
                || self.visible(ScreenRegion::Game, Template::CombatRetreat).await?
            {
                return Ok(());
            }

            if self.visible(ScreenRegion::LowerRightCorner, Template::Next).await?
                || self.visible(ScreenRegion::LowerRightCorner, Template::NextAlt).await?
            {
                self.vision.tap(ScreenRegion::Center).await?;
                self.vision.park_cursor(ScreenRegion::CursorRest).await?;
            } else if let Some(escort) = self.escort.as_mut() {
                fcf::resolve_fcf(
                    self.vision.as_ref(),
                    &mut self.primary,
                    escort,
                    &mut session.damage,
                )
                .await?;
            }

            pause(self.config.timing.poll_interval()).await;
        }
    }
}
