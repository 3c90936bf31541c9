//! Map provider backed by a static TOML map definition.

use super::MapProvider;
use crate::types::{Formation, MapId, Node, Pattern, Position, Rect, ScreenRegion, Template};
use crate::vision::VisionService;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// One node of a map definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    /// Hit-region in in-game coordinates
    pub hit_region: Rect,
    /// Formation override; the map default is used when absent
    #[serde(default)]
    pub formation: Option<Formation>,
    /// Whether to engage in night battle at this node
    #[serde(default)]
    pub night_battle: bool,
}

/// Map definition file contents.
///
/// ```toml
/// id = "1-1"
/// default_formation = "line_ahead"
///
/// [[nodes]]
/// name = "A"
/// hit_region = { x = 100, y = 100, w = 40, h = 40 }
/// night_battle = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDefinition {
    pub id: MapId,
    #[serde(default = "default_formation")]
    pub default_formation: Formation,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

fn default_formation() -> Formation {
    Formation::LineAhead
}

impl MapDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read map definition: {}", path.display()))?;
        let def: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse map definition: {}", path.display()))?;
        def.check_unique_names()?;
        Ok(def)
    }

    fn check_unique_names(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                bail!("Map {} defines node {} twice", self.id, node.name);
            }
        }
        Ok(())
    }

    fn definition(&self, name: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Serves a [`MapDefinition`] and answers map prompts through the vision service.
pub struct StaticMap {
    def: MapDefinition,
    vision: Arc<dyn VisionService>,
}

impl StaticMap {
    pub fn new(def: MapDefinition, vision: Arc<dyn VisionService>) -> Self {
        info!(map = %def.id, nodes = def.nodes.len(), "Static map loaded");
        Self { def, vision }
    }

    fn formation_for(&self, node: Option<&Node>) -> Formation {
        node.and_then(|n| self.def.definition(&n.name))
            .and_then(|d| d.formation)
            .unwrap_or(self.def.default_formation)
    }

    async fn click_required(&self, region: ScreenRegion, template: Template) -> Result<()> {
        if !self.vision.click(region, &Pattern::new(template)).await? {
            bail!("Expected {template} in {region} but it was not visible");
        }
        Ok(())
    }
}

#[async_trait]
impl MapProvider for StaticMap {
    fn map_id(&self) -> MapId {
        self.def.id
    }

    fn node(&self, name: &str) -> Option<Node> {
        self.def
            .definition(name)
            .map(|d| Node::new(d.name.clone(), d.hit_region))
    }

    fn nearest_node(&self, pos: Position) -> Option<Node> {
        self.def
            .nodes
            .iter()
            .filter(|d| d.hit_region.contains(&pos))
            .min_by_key(|d| d.hit_region.center().distance_sq(&pos))
            .map(|d| Node::new(d.name.clone(), d.hit_region))
    }

    async fn resolve_formation(&self, node: Option<&Node>) -> Result<()> {
        let formation = self.formation_for(node);
        debug!(node = ?node.map(|n| n.name.as_str()), formation = formation.as_str(), "Selecting formation");
        self.click_required(ScreenRegion::FormationPanel, Template::Formation(formation))
            .await
    }

    async fn resolve_night_battle(&self, node: Option<&Node>) -> Result<bool> {
        let engage = node
            .and_then(|n| self.def.definition(&n.name))
            .is_some_and(|d| d.night_battle);
        let button = if engage {
            Template::NightBattleFight
        } else {
            Template::NightBattleRetreat
        };
        info!(node = ?node.map(|n| n.name.as_str()), engage, "Night battle decision");
        self.click_required(ScreenRegion::Game, button).await?;
        Ok(engage)
    }

    async fn select_continue_or_retreat(&self, retreat: bool) -> Result<()> {
        let button = if retreat {
            Template::CombatRetreat
        } else {
            Template::CombatContinue
        };
        self.click_required(ScreenRegion::Game, button).await
    }

    async fn click_node(&self, node: &Node) -> Result<()> {
        self.vision
            .tap_point(ScreenRegion::Game, node.hit_region.center())
            .await
    }
}
