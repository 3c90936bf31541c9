//! Menu navigation seam (top-level screens, map selection, fleet tabs)

use crate::types::{FleetId, MapId};
use anyhow::Result;
use async_trait::async_trait;

/// Top-level game screens the navigator can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameScreen {
    Sortie,
}

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Switch to a top-level screen.
    async fn goto(&self, screen: GameScreen) -> Result<()>;

    /// From the sortie menu, open the pre-sortie panel of `map`.
    async fn select_map(&self, map: &MapId) -> Result<()>;

    /// Switch the pre-sortie panel to the given fleet tab.
    async fn switch_fleet(&self, fleet: FleetId) -> Result<()>;
}
