//! Sortie Scenario Tests
//!
//! Drives the orchestrator end to end against scripted screens. Each script
//! lists the frames the game would show, in order; a tap or a successful
//! click moves to the next frame (see `sim` module docs).
//!
//! Node layout used throughout (in-game coordinates, viewport at the origin):
//!
//! ```text
//!   A (100,100)   B (300,100)   C (500,100)    40x40 hit regions
//! ```

use sortie_pilot::config::{SortieConfig, TimingConfig};
use sortie_pilot::eligibility::Veto;
use sortie_pilot::map::{MapDefinition, MapProvider, NodeDefinition, StaticMap};
use sortie_pilot::orchestrator::{
    DeclineReason, Orchestrator, RetreatReason, SortieEnding, SortieOutcome, SortieState,
};
use sortie_pilot::sim::{
    Action, AuxiliaryScript, Frame, Scenario, ScriptedAuxiliary, ScriptedGame,
};
use sortie_pilot::types::{
    DamageCounts, FatigueLevel, FleetId, FleetMode, Formation, Position, Rect, ScreenRegion,
    Severity, Template,
};
use sortie_pilot::SortieError;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Helpers
// ============================================================================

fn node(name: &str, x: i32) -> NodeDefinition {
    NodeDefinition {
        name: name.to_string(),
        hit_region: Rect::new(x, 100, 40, 40),
        formation: None,
        night_battle: false,
    }
}

fn map_definition(default_formation: Formation) -> MapDefinition {
    MapDefinition {
        id: "1-1".parse().unwrap(),
        default_formation,
        nodes: vec![node("A", 100), node("B", 300), node("C", 500)],
    }
}

/// Fleet icon whose anchor (centre-x, bottom-y) lands inside the node at `x`.
fn icon_at(x: i32) -> Rect {
    Rect::new(x + 10, 100, 20, 20)
}

fn single_fleet_config() -> SortieConfig {
    let mut config = SortieConfig::default();
    config.timing = TimingConfig::instant();
    config.sortie.combat_nodes = 3;
    config
}

fn lbas_config() -> SortieConfig {
    let mut config = single_fleet_config();
    config.sortie.lbas_enabled = true;
    config
}

fn combined_fleet_config() -> SortieConfig {
    let mut config = single_fleet_config();
    config.sortie.combined_fleet = true;
    config.sortie.fleet_mode = FleetMode::Stf;
    config
}

/// Frames of one single-fleet node: compass, formation prompt, two dialogue
/// frames, the battle, and the results screen carrying `damage`.
fn node_frames(icon: Option<Rect>, damage: DamageCounts) -> Vec<Frame> {
    let with_icon = |frame: Frame| match icon {
        Some(bounds) => frame.with_fleet_icon(bounds),
        None => frame,
    };
    vec![
        with_icon(Frame::showing(&[Template::Compass])),
        with_icon(Frame::showing(&[Template::Formation(Formation::LineAhead)])),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next])
            .with_damage(ScreenRegion::CheckDamageCombat, damage),
    ]
}

fn retreat_prompt() -> Frame {
    Frame::showing(&[Template::CombatRetreat, Template::CombatContinue])
}

fn home() -> Frame {
    Frame::showing(&[Template::HomeMenuSortie])
}

fn launch_frame() -> Frame {
    Frame::showing(&[Template::CombatStart])
}

fn build(
    config: SortieConfig,
    map: MapDefinition,
    frames: Vec<Frame>,
) -> (Orchestrator, Arc<ScriptedGame>) {
    build_on(config, map, ScriptedGame::new(frames))
}

fn build_on(
    config: SortieConfig,
    map: MapDefinition,
    game: ScriptedGame,
) -> (Orchestrator, Arc<ScriptedGame>) {
    let game = Arc::new(game);
    let map: Arc<dyn MapProvider> = Arc::new(StaticMap::new(map, game.clone()));
    let orchestrator = Orchestrator::new(Arc::new(config), game.clone(), game.clone(), map);
    (orchestrator, game)
}

fn completed(outcome: SortieOutcome) -> (Vec<String>, SortieEnding) {
    match outcome {
        SortieOutcome::Completed(report) => (report.nodes, report.ending),
        other => panic!("expected a completed sortie, got {other:?}"),
    }
}

// ============================================================================
// Completed sorties
// ============================================================================

#[tokio::test]
async fn node_cap_retreat_after_three_nodes() {
    let mut frames = vec![launch_frame()];
    for x in [100, 300, 500] {
        frames.extend(node_frames(Some(icon_at(x)), DamageCounts::default()));
        frames.push(retreat_prompt());
    }
    frames.push(home());

    let (mut orchestrator, game) = build(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        frames,
    );
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A", "B", "C"]);
    assert_eq!(ending, SortieEnding::Retreated(RetreatReason::NodeCap { visited: 3 }));
    assert_eq!(orchestrator.state(), SortieState::Complete);
    assert_eq!(orchestrator.stats().completed, 1);
    assert_eq!(orchestrator.stats().nodes_fought, 3);
    assert!(orchestrator.primary_fleet().needs_resupply);
    assert!(game.finished().await);

    let actions = game.actions().await;
    let continues = actions
        .iter()
        .filter(|a| **a == Action::Click(Template::CombatContinue))
        .count();
    assert_eq!(continues, 2);
    assert_eq!(actions.last(), Some(&Action::Click(Template::CombatRetreat)));
}

#[tokio::test]
async fn damage_at_retreat_limit_ends_sortie_early() {
    let mut config = single_fleet_config();
    config.sortie.retreat_limit = Severity::Moderate;

    let mut frames = vec![launch_frame()];
    frames.extend(node_frames(Some(icon_at(100)), DamageCounts::new(0, 1, 0)));
    frames.push(retreat_prompt());
    frames.push(home());

    let (mut orchestrator, _game) = build(config, map_definition(Formation::LineAhead), frames);
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A"]);
    assert_eq!(
        ending,
        SortieEnding::Retreated(RetreatReason::DamageThreshold { count: 1 })
    );
    assert_eq!(orchestrator.primary_fleet().damage, DamageCounts::new(0, 1, 0));
}

#[tokio::test]
async fn combined_fleet_fcf_then_flagship_retreat() {
    let a = icon_at(100);
    let b = icon_at(300);
    let cf1 = Template::Formation(Formation::CombinedFleet1);
    let frames = vec![
        launch_frame(),
        // Node A
        Frame::showing(&[Template::Compass]).with_fleet_icon(a),
        Frame::showing(&[cf1]).with_fleet_icon(a),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next])
            .with_damage(ScreenRegion::CheckDamageCombat, DamageCounts::new(1, 0, 0)),
        Frame::showing(&[Template::MvpMarker, Template::Next]),
        Frame::showing(&[Template::FcfRetreatShip, Template::FcfContinueFleet]),
        retreat_prompt(),
        // Node B
        Frame::showing(&[Template::Compass]).with_fleet_icon(b),
        Frame::showing(&[cf1]).with_fleet_icon(b),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::FlagshipDamaged]),
        home(),
    ];

    let (mut orchestrator, game) = build(
        combined_fleet_config(),
        map_definition(Formation::CombinedFleet1),
        frames,
    );
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A", "B"]);
    assert_eq!(ending, SortieEnding::FlagshipRetreat);
    assert_eq!(orchestrator.stats().forced_retreats, 1);

    // FCF counters are folded back into each fleet's heavy tally
    let main = orchestrator.primary_fleet();
    let escort = orchestrator.escort_fleet().unwrap();
    assert_eq!(main.fcf_retreat_count, 0);
    assert_eq!(escort.fcf_retreat_count, 0);
    assert_eq!(main.damage.heavy(), 1);
    assert_eq!(escort.damage.heavy(), 1);

    let actions = game.actions().await;
    assert!(actions.contains(&Action::Click(Template::FcfRetreatShip)));
    assert!(actions.contains(&Action::Click(Template::CombatContinue)));
    assert!(actions.contains(&Action::SwitchFleet(FleetId::ESCORT)));
    assert!(actions.contains(&Action::SwitchFleet(FleetId::MAIN)));
}

#[tokio::test]
async fn flagship_damage_while_traveling() {
    let frames = vec![
        launch_frame(),
        Frame::showing(&[Template::FlagshipDamaged]),
        home(),
    ];
    let (mut orchestrator, game) = build(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        frames,
    );
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert!(nodes.is_empty());
    assert_eq!(ending, SortieEnding::FlagshipRetreat);
    assert_eq!(game.actions().await.last(), Some(&Action::Tap(ScreenRegion::Game)));
}

#[tokio::test]
async fn node_without_formation_prompt_is_recorded_as_unknown() {
    let frames = vec![
        launch_frame(),
        Frame::showing(&[Template::Next]),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next]),
        home(),
    ];
    let (mut orchestrator, _game) = build(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        frames,
    );
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["?"]);
    assert_eq!(ending, SortieEnding::ReturnedHome);
}

#[tokio::test]
async fn night_battle_engaged_on_configured_node() {
    let mut map = map_definition(Formation::LineAhead);
    map.nodes[0].night_battle = true;

    let a = icon_at(100);
    let frames = vec![
        launch_frame(),
        Frame::showing(&[Template::Compass]).with_fleet_icon(a),
        Frame::showing(&[Template::Formation(Formation::LineAhead)]).with_fleet_icon(a),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::NightBattleFight, Template::NightBattleRetreat]),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next]),
        home(),
    ];
    let (mut orchestrator, game) = build(single_fleet_config(), map, frames);
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A"]);
    assert_eq!(ending, SortieEnding::ReturnedHome);
    assert!(game.actions().await.contains(&Action::Click(Template::NightBattleFight)));
}

#[tokio::test]
async fn forced_route_clicks_target_node() {
    let mut config = single_fleet_config();
    config.sortie.node_selects.insert("A".into(), "B".into());

    let b = icon_at(300);
    let frames = vec![
        launch_frame(),
        Frame::showing(&[Template::NodeSelect]).with_fleet_icon(icon_at(100)),
        Frame::showing(&[Template::Formation(Formation::LineAhead)]).with_fleet_icon(b),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next]),
        home(),
    ];
    let (mut orchestrator, game) = build(config, map_definition(Formation::LineAhead), frames);
    let (nodes, _) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["B"]);
    assert!(game
        .actions()
        .await
        .contains(&Action::TapPoint(Position::new(320, 120))));
}

#[tokio::test]
async fn auxiliary_groups_launch_and_assign() {
    let aux = Arc::new(ScriptedAuxiliary::new(AuxiliaryScript {
        ready: true,
        delay_minutes: 0,
    }));

    let mut frames = vec![Frame::showing(&[Template::CombatStartLbas])];
    frames.extend(node_frames(Some(icon_at(100)), DamageCounts::default()));
    frames.push(home());

    let (orchestrator, game) = build(lbas_config(), map_definition(Formation::LineAhead), frames);
    let mut orchestrator = orchestrator.with_auxiliary(aux.clone());
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A"]);
    assert_eq!(ending, SortieEnding::ReturnedHome);
    assert_eq!(aux.prepared(), 1);
    assert_eq!(aux.assigned(), 1);
    assert!(game.actions().await.contains(&Action::Click(Template::CombatStartLbas)));
}

#[tokio::test]
async fn lbas_enabled_without_gate_uses_lbas_launch_control() {
    let mut frames = vec![Frame::showing(&[Template::CombatStartLbas])];
    frames.extend(node_frames(Some(icon_at(100)), DamageCounts::default()));
    frames.push(home());

    let (mut orchestrator, game) =
        build(lbas_config(), map_definition(Formation::LineAhead), frames);
    let (nodes, _) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A"]);
    assert!(game.actions().await.contains(&Action::Click(Template::CombatStartLbas)));
}

#[tokio::test]
async fn auxiliary_gate_ignored_when_lbas_disabled() {
    let aux = Arc::new(ScriptedAuxiliary::new(AuxiliaryScript {
        ready: false,
        delay_minutes: 10,
    }));

    let mut frames = vec![launch_frame()];
    frames.extend(node_frames(Some(icon_at(100)), DamageCounts::default()));
    frames.push(home());

    let (orchestrator, game) = build(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        frames,
    );
    let mut orchestrator = orchestrator.with_auxiliary(aux.clone());
    let (nodes, _) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A"]);
    assert_eq!(aux.prepared(), 0);
    assert_eq!(aux.assigned(), 0);
    assert!(game.actions().await.contains(&Action::Click(Template::CombatStart)));
}

// ============================================================================
// Declines and launch failures
// ============================================================================

#[tokio::test]
async fn high_fatigue_declines_for_twenty_five_minutes() {
    let mut config = single_fleet_config();
    config.sortie.check_fatigue = true;

    let frames = vec![Frame::showing(&[
        Template::CombatStart,
        Template::Fatigue(FatigueLevel::High),
    ])];
    let (mut orchestrator, game) = build(config, map_definition(Formation::LineAhead), frames);
    let outcome = orchestrator.run_sortie().await.unwrap();

    assert_eq!(
        outcome,
        SortieOutcome::Declined(DeclineReason::Vetoed(vec![Veto::HighFatigue]))
    );
    assert_eq!(orchestrator.state(), SortieState::Declined);
    assert_eq!(
        orchestrator.clock().last_delay(),
        Some(Duration::from_secs(25 * 60))
    );
    assert!(!orchestrator.needs_to_sortie());
    assert!(!game.actions().await.contains(&Action::Click(Template::CombatStart)));
    assert_eq!(orchestrator.stats().declined, 1);
    assert_eq!(orchestrator.stats().launched, 0);
}

#[tokio::test]
async fn last_veto_decides_the_delay() {
    let mut config = single_fleet_config();
    config.sortie.check_fatigue = true;

    // High fatigue (25 min) then damage (retry now): damage is evaluated later
    let frames = vec![
        Frame::showing(&[Template::CombatStart, Template::Fatigue(FatigueLevel::High)])
            .with_damage(ScreenRegion::CheckDamage, DamageCounts::new(1, 0, 0)),
    ];
    let (mut orchestrator, _game) = build(config, map_definition(Formation::LineAhead), frames);
    let outcome = orchestrator.run_sortie().await.unwrap();

    assert_eq!(
        outcome,
        SortieOutcome::Declined(DeclineReason::Vetoed(vec![
            Veto::HighFatigue,
            Veto::DamageOverThreshold { count: 1 },
        ]))
    );
    assert_eq!(orchestrator.clock().last_delay(), Some(Duration::ZERO));
    assert!(orchestrator.needs_to_sortie());
}

#[tokio::test]
async fn auxiliary_gate_not_ready_declines() {
    let aux = Arc::new(ScriptedAuxiliary::new(AuxiliaryScript {
        ready: false,
        delay_minutes: 10,
    }));
    let (orchestrator, game) = build(
        lbas_config(),
        map_definition(Formation::LineAhead),
        vec![Frame::showing(&[Template::CombatStartLbas])],
    );
    let mut orchestrator = orchestrator.with_auxiliary(aux.clone());
    let outcome = orchestrator.run_sortie().await.unwrap();

    assert_eq!(outcome, SortieOutcome::Declined(DeclineReason::AuxiliaryGate));
    assert_eq!(
        orchestrator.clock().last_delay(),
        Some(Duration::from_secs(10 * 60))
    );
    assert_eq!(aux.assigned(), 0);
    assert_eq!(game.frame_index().await, 0);
}

#[tokio::test]
async fn missing_launch_control_is_a_launch_failure() {
    let (mut orchestrator, _game) = build(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        vec![Frame::new()],
    );
    let outcome = orchestrator.run_sortie().await.unwrap();

    assert_eq!(outcome, SortieOutcome::LaunchFailed);
    assert!(!outcome.ran());
    assert_eq!(orchestrator.state(), SortieState::Idle);
    assert_eq!(orchestrator.stats().launch_failures, 1);
    assert_eq!(orchestrator.clock().last_delay(), Some(Duration::ZERO));
    assert!(orchestrator.last_report().is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn missing_results_screen_times_out() {
    let mut frames = vec![launch_frame()];
    frames.extend(node_frames(Some(icon_at(100)), DamageCounts::default()));
    // Results screen never shows the MVP marker
    frames[6] = Frame::showing(&[Template::Next]);

    let (mut orchestrator, _game) = build(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        frames,
    );
    let err = orchestrator.run_sortie().await.unwrap_err();

    assert!(
        matches!(
            err,
            SortieError::Timeout {
                template: Template::MvpMarker,
                ..
            }
        ),
        "unexpected error: {err}"
    );
    assert_eq!(orchestrator.state(), SortieState::Idle);
}

#[tokio::test]
async fn preflight_error_returns_to_idle() {
    // The second probe on the only frame fails: the supply check passes, then
    // the launch click errors out of the preflight state.
    let game = ScriptedGame::new(vec![Frame::new()]).with_poll_limit(1);
    let (mut orchestrator, _game) = build_on(
        single_fleet_config(),
        map_definition(Formation::LineAhead),
        game,
    );
    let err = orchestrator.run_sortie().await.unwrap_err();

    assert!(matches!(err, SortieError::Collaborator(_)), "unexpected error: {err}");
    assert_eq!(orchestrator.state(), SortieState::Idle);
    assert_eq!(orchestrator.stats().attempted, 1);
    assert_eq!(orchestrator.stats().launched, 0);
}

#[tokio::test]
async fn combat_error_restores_fcf_counters() {
    let a = icon_at(100);
    let b = icon_at(300);
    let cf1 = Template::Formation(Formation::CombinedFleet1);
    let frames = vec![
        launch_frame(),
        // Node A: FCF offered and accepted
        Frame::showing(&[Template::Compass]).with_fleet_icon(a),
        Frame::showing(&[cf1]).with_fleet_icon(a),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::MvpMarker, Template::Next])
            .with_damage(ScreenRegion::CheckDamageCombat, DamageCounts::new(1, 0, 0)),
        Frame::showing(&[Template::MvpMarker, Template::Next]),
        Frame::showing(&[Template::FcfRetreatShip, Template::FcfContinueFleet]),
        retreat_prompt(),
        // Node B: results screen never shows the MVP marker
        Frame::showing(&[Template::Compass]).with_fleet_icon(b),
        Frame::showing(&[cf1]).with_fleet_icon(b),
        Frame::new(),
        Frame::new(),
        Frame::showing(&[Template::Next]),
        Frame::showing(&[Template::Next]),
    ];

    let (mut orchestrator, game) = build(
        combined_fleet_config(),
        map_definition(Formation::CombinedFleet1),
        frames,
    );
    let err = orchestrator.run_sortie().await.unwrap_err();

    assert!(matches!(err, SortieError::Timeout { .. }), "unexpected error: {err}");
    assert!(game.actions().await.contains(&Action::Click(Template::FcfRetreatShip)));
    assert_eq!(orchestrator.state(), SortieState::Idle);

    let main = orchestrator.primary_fleet();
    let escort = orchestrator.escort_fleet().unwrap();
    assert_eq!(main.fcf_retreat_count, 0);
    assert_eq!(escort.fcf_retreat_count, 0);
    assert_eq!(main.damage.heavy(), 1);
}

#[tokio::test]
async fn forced_route_to_unknown_node_is_an_error() {
    let mut config = single_fleet_config();
    config.sortie.node_selects.insert("A".into(), "Z".into());

    let frames = vec![
        launch_frame(),
        Frame::showing(&[Template::NodeSelect]).with_fleet_icon(icon_at(100)),
    ];
    let (mut orchestrator, _game) = build(config, map_definition(Formation::LineAhead), frames);
    let err = orchestrator.run_sortie().await.unwrap_err();

    match err {
        SortieError::UnknownRouteTarget { from, to } => {
            assert_eq!(from, "A");
            assert_eq!(to, "Z");
        }
        other => panic!("expected UnknownRouteTarget, got {other}"),
    }
}

// ============================================================================
// Shipped scenario
// ============================================================================

#[tokio::test]
async fn shipped_combined_fleet_scenario_runs() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut config = SortieConfig::load_from_file(&root.join("sortie_config.example.toml")).unwrap();
    config.timing = TimingConfig::instant();
    let scenario = Scenario::load(&root.join("scenarios/combined_fleet.toml")).unwrap();

    let map = scenario.map.unwrap();
    assert_eq!(map.id, config.sortie.map);
    let (mut orchestrator, game) = build(config, map, scenario.frames);
    let (nodes, ending) = completed(orchestrator.run_sortie().await.unwrap());

    assert_eq!(nodes, vec!["A", "B"]);
    assert_eq!(ending, SortieEnding::FlagshipRetreat);
    assert!(game.finished().await);
}
