//! Screen vocabulary shared with the vision service: named regions,
//! visual templates, patterns and matches.

use super::fleet::{FatigueLevel, Severity};
use super::map::Rect;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Regions
// ============================================================================

/// Named screen region. The vision service owns the mapping to pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScreenRegion {
    /// The whole game viewport
    Game,
    Top,
    TopSubmenu,
    Left,
    Right,
    Lower,
    LowerLeft,
    LowerRight,
    LowerRightCorner,
    Center,
    FormationPanel,
    CheckSupply,
    CheckDamage,
    CheckDamageSeventh,
    CheckDamageCombat,
    CheckFatigue,
    /// Arrow paging the pre-sortie panel to the 7th ship of a striking fleet
    SeventhShipNext,
    /// Parking spot for the cursor away from any prompt
    CursorRest,
}

impl std::fmt::Display for ScreenRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

// ============================================================================
// Formations and fleet modes
// ============================================================================

/// Battle formation button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    LineAhead,
    DoubleLine,
    Diamond,
    Echelon,
    LineAbreast,
    Vanguard,
    CombinedFleet1,
    CombinedFleet2,
    CombinedFleet3,
    CombinedFleet4,
}

impl Formation {
    pub const ALL: [Formation; 10] = [
        Formation::LineAhead,
        Formation::DoubleLine,
        Formation::Diamond,
        Formation::Echelon,
        Formation::LineAbreast,
        Formation::Vanguard,
        Formation::CombinedFleet1,
        Formation::CombinedFleet2,
        Formation::CombinedFleet3,
        Formation::CombinedFleet4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Formation::LineAhead => "line_ahead",
            Formation::DoubleLine => "double_line",
            Formation::Diamond => "diamond",
            Formation::Echelon => "echelon",
            Formation::LineAbreast => "line_abreast",
            Formation::Vanguard => "vanguard",
            Formation::CombinedFleet1 => "combinedfleet_1",
            Formation::CombinedFleet2 => "combinedfleet_2",
            Formation::CombinedFleet3 => "combinedfleet_3",
            Formation::CombinedFleet4 => "combinedfleet_4",
        }
    }

    /// Formation button whose appearance signals the formation prompt.
    pub fn prompt_marker(combined_fleet: bool) -> Formation {
        if combined_fleet {
            Formation::CombinedFleet1
        } else {
            Formation::LineAhead
        }
    }
}

/// How the sortieing fleets are organised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FleetMode {
    /// Single fleet 1
    #[default]
    Standard,
    /// Single 7-ship fleet 3
    Striking,
    /// Combined fleet: carrier task force
    Ctf,
    /// Combined fleet: surface task force
    Stf,
    /// Combined fleet: transport escort
    Transport,
}

impl FleetMode {
    pub fn is_combined(self) -> bool {
        matches!(self, FleetMode::Ctf | FleetMode::Stf | FleetMode::Transport)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FleetMode::Standard => "standard",
            FleetMode::Striking => "striking",
            FleetMode::Ctf => "ctf",
            FleetMode::Stf => "stf",
            FleetMode::Transport => "transport",
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

/// A reference image the vision service can look for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Template {
    Compass,
    Formation(Formation),
    NodeSelect,
    FlagshipDamaged,
    Next,
    NextAlt,
    NightBattleFight,
    NightBattleRetreat,
    HomeMenuSortie,
    CombatRetreat,
    CombatContinue,
    MvpMarker,
    FcfRetreatShip,
    FcfContinueFleet,
    CombatStart,
    CombatStartLbas,
    PortFull,
    PortFullEvent,
    ResupplyNeeded,
    FleetIcon(FleetMode),
    Damage(Severity),
    Fatigue(FatigueLevel),
}

impl Template {
    /// Fleet icon template for `mode`. Single-fleet modes share one icon, so
    /// they all map to `FleetIcon(Standard)`.
    pub fn fleet_icon(mode: FleetMode) -> Template {
        if mode.is_combined() {
            Template::FleetIcon(mode)
        } else {
            Template::FleetIcon(FleetMode::Standard)
        }
    }

    /// Asset file name of the template image.
    pub fn asset_name(&self) -> String {
        match self {
            Template::Compass => "compass.png".into(),
            Template::Formation(f) => format!("formation_{}.png", f.as_str()),
            Template::NodeSelect => "combat_node_select.png".into(),
            Template::FlagshipDamaged => "combat_flagship_dmg.png".into(),
            Template::Next => "next.png".into(),
            Template::NextAlt => "next_alt.png".into(),
            Template::NightBattleFight => "combat_nb_fight.png".into(),
            Template::NightBattleRetreat => "combat_nb_retreat.png".into(),
            Template::HomeMenuSortie => "home_menu_sortie.png".into(),
            Template::CombatRetreat => "combat_retreat.png".into(),
            Template::CombatContinue => "combat_continue.png".into(),
            Template::MvpMarker => "mvp_marker.png".into(),
            Template::FcfRetreatShip => "fcf_retreat_ship.png".into(),
            Template::FcfContinueFleet => "fcf_continue_fleet.png".into(),
            Template::CombatStart => "combat_start.png".into(),
            Template::CombatStartLbas => "combat_start_lbas.png".into(),
            Template::PortFull => "warning_port_full.png".into(),
            Template::PortFullEvent => "warning_port_full_event.png".into(),
            Template::ResupplyNeeded => "fleet_resupply_needed.png".into(),
            Template::FleetIcon(mode) => {
                let kind = if mode.is_combined() { mode.as_str() } else { "standard" };
                format!("fleet_icon_{kind}.png")
            }
            Template::Damage(s) => format!("ship_state_dmg_{}.png", s.as_str()),
            Template::Fatigue(l) => format!("ship_state_fatigue_{}.png", l.as_str()),
        }
    }

    /// Every distinct template, used to resolve asset names back to templates.
    fn catalogue() -> Vec<Template> {
        let mut all = vec![
            Template::Compass,
            Template::NodeSelect,
            Template::FlagshipDamaged,
            Template::Next,
            Template::NextAlt,
            Template::NightBattleFight,
            Template::NightBattleRetreat,
            Template::HomeMenuSortie,
            Template::CombatRetreat,
            Template::CombatContinue,
            Template::MvpMarker,
            Template::FcfRetreatShip,
            Template::FcfContinueFleet,
            Template::CombatStart,
            Template::CombatStartLbas,
            Template::PortFull,
            Template::PortFullEvent,
            Template::ResupplyNeeded,
            Template::FleetIcon(FleetMode::Standard),
            Template::FleetIcon(FleetMode::Ctf),
            Template::FleetIcon(FleetMode::Stf),
            Template::FleetIcon(FleetMode::Transport),
        ];
        all.extend(Formation::ALL.into_iter().map(Template::Formation));
        all.extend(Severity::ALL.into_iter().map(Template::Damage));
        all.extend(FatigueLevel::ALL.into_iter().map(Template::Fatigue));
        all
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.asset_name())
    }
}

impl FromStr for Template {
    type Err = String;

    /// Accepts asset names with or without the `.png` suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = if s.ends_with(".png") {
            s.to_string()
        } else {
            format!("{s}.png")
        };
        Template::catalogue()
            .into_iter()
            .find(|t| t.asset_name() == wanted)
            .ok_or_else(|| format!("unknown template '{s}'"))
    }
}

impl TryFrom<String> for Template {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Template> for String {
    fn from(t: Template) -> Self {
        t.asset_name()
    }
}

// ============================================================================
// Patterns and matches
// ============================================================================

/// Similarity used when a probe does not ask for a specific tolerance.
pub const DEFAULT_SIMILARITY: f32 = 0.7;

/// A template plus the minimum similarity a match must reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pattern {
    pub template: Template,
    pub similarity: f32,
}

impl Pattern {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            similarity: DEFAULT_SIMILARITY,
        }
    }

    pub fn similar(mut self, similarity: f32) -> Self {
        self.similarity = similarity;
        self
    }
}

impl From<Template> for Pattern {
    fn from(template: Template) -> Self {
        Pattern::new(template)
    }
}

/// A located template, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub bounds: Rect,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_names_round_trip_through_parse() {
        for template in Template::catalogue() {
            let parsed: Template = template.asset_name().parse().unwrap();
            assert_eq!(parsed, template);
        }
    }

    #[test]
    fn test_parse_without_suffix() {
        assert_eq!("compass".parse::<Template>(), Ok(Template::Compass));
        assert_eq!(
            "ship_state_dmg_heavy".parse::<Template>(),
            Ok(Template::Damage(Severity::Heavy))
        );
    }

    #[test]
    fn test_single_fleet_modes_share_standard_icon() {
        let striking = Template::fleet_icon(FleetMode::Striking);
        assert_eq!(striking, Template::fleet_icon(FleetMode::Standard));
        assert_eq!(striking.asset_name(), "fleet_icon_standard.png");
        assert_eq!(striking.asset_name().parse::<Template>(), Ok(striking));
        assert_eq!(
            Template::FleetIcon(FleetMode::Stf).asset_name(),
            "fleet_icon_stf.png"
        );
        assert_eq!(
            Template::fleet_icon(FleetMode::Stf),
            Template::FleetIcon(FleetMode::Stf)
        );
    }
}
