//! Map provider seam
//!
//! The node graph and per-node decisions (formation, night battle, forced
//! route clicks) belong to the map provider. [`StaticMap`] serves them from a
//! TOML map definition.

mod static_map;

pub use static_map::{MapDefinition, NodeDefinition, StaticMap};

use crate::types::{MapId, Node, Position};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait MapProvider: Send + Sync {
    fn map_id(&self) -> MapId;

    /// Look up a node by label.
    fn node(&self, name: &str) -> Option<Node>;

    /// Node whose hit-region contains `pos` (closest centre wins), if any.
    fn nearest_node(&self, pos: Position) -> Option<Node>;

    /// Pick and click the formation for the node the fleet arrived at.
    /// `node` is `None` when the fleet position has not been resolved yet.
    async fn resolve_formation(&self, node: Option<&Node>) -> Result<()>;

    /// Answer the night-battle prompt. Returns `true` when engaging.
    async fn resolve_night_battle(&self, node: Option<&Node>) -> Result<bool>;

    /// Answer the continue/retreat prompt.
    async fn select_continue_or_retreat(&self, retreat: bool) -> Result<()>;

    /// Click a node on the node-select prompt.
    async fn click_node(&self, node: &Node) -> Result<()>;
}
