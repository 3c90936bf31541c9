//! sortie-pilot - sortie automation runner
//!
//! Polls the sortie clock and runs sorties whenever one is due. The screen is
//! provided by a scripted scenario (dry run); live vision backends plug in
//! through the `VisionService` trait.
//!
//! # Usage
//!
//! ```bash
//! # Dry run of one scripted combined-fleet sortie
//! sortie-pilot --config sortie_config.example.toml \
//!     --scenario scenarios/combined_fleet.toml --once
//!
//! # Explicit config, machine-readable outcomes
//! sortie-pilot --config sortie_config.toml --scenario run.toml --json
//! ```
//!
//! # Environment Variables
//!
//! - `SORTIE_CONFIG`: Path to the config file (default: ./sortie_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::Parser;
use sortie_pilot::config::{SortieConfig, TimingConfig};
use sortie_pilot::map::{MapDefinition, MapProvider, StaticMap};
use sortie_pilot::orchestrator::{Orchestrator, SortieOutcome};
use sortie_pilot::sim::{Scenario, ScriptedAuxiliary, ScriptedGame};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "sortie-pilot")]
#[command(about = "Sortie automation for a turn-based fleet game")]
#[command(version)]
struct CliArgs {
    /// Config file (default: $SORTIE_CONFIG, then ./sortie_config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scripted scenario to run against
    #[arg(long, value_name = "FILE")]
    scenario: PathBuf,

    /// Stop after the first sortie attempt
    #[arg(long)]
    once: bool,

    /// Print each outcome as one JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Keep the configured screen delays instead of running the script at
    /// full speed
    #[arg(long)]
    realtime: bool,
}

fn load_config(args: &CliArgs) -> Result<SortieConfig> {
    let mut config = match &args.config {
        Some(path) => SortieConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SortieConfig::load(),
    };
    if !args.realtime {
        config.timing = TimingConfig {
            scheduler_poll_secs: config.timing.scheduler_poll_secs,
            ..TimingConfig::instant()
        };
    }
    Ok(config)
}

fn map_definition(scenario: &mut Scenario, config: &SortieConfig) -> Result<MapDefinition> {
    if let Some(def) = scenario.map.take() {
        return Ok(def);
    }
    match &config.sortie.map_file {
        Some(path) => MapDefinition::load(path),
        None => bail!("Scenario has no [map] and sortie.map_file is not set"),
    }
}

fn emit(outcome: &SortieOutcome, orchestrator: &Orchestrator, json: bool) -> Result<()> {
    match outcome {
        SortieOutcome::Completed(report) => info!(
            nodes = report.nodes.len(),
            ending = ?report.ending,
            "✓ Sortie finished"
        ),
        SortieOutcome::Declined(reason) => warn!("Sortie declined: {}", reason),
        SortieOutcome::LaunchFailed => warn!("Sortie launch failed"),
    }

    if json {
        let report = match outcome {
            SortieOutcome::Completed(report) => Some(report),
            _ => None,
        };
        let reason = match outcome {
            SortieOutcome::Declined(reason) => Some(reason.to_string()),
            _ => None,
        };
        let line = serde_json::json!({
            "outcome": outcome.label(),
            "reason": reason,
            "report": report,
            "next_sortie": orchestrator.clock().next_sortie().to_rfc3339(),
            "stats": orchestrator.stats(),
        });
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let sortie_config = Arc::new(load_config(&args)?);

    let mut scenario = Scenario::load(&args.scenario)?;
    let map_def = map_definition(&mut scenario, &sortie_config)?;

    let game = Arc::new(ScriptedGame::new(std::mem::take(&mut scenario.frames)));
    let map: Arc<dyn MapProvider> = Arc::new(StaticMap::new(map_def, game.clone()));
    let mut orchestrator =
        Orchestrator::new(Arc::clone(&sortie_config), game.clone(), game.clone(), map);
    match scenario.auxiliary {
        Some(script) => {
            orchestrator = orchestrator.with_auxiliary(Arc::new(ScriptedAuxiliary::new(script)));
        }
        None if sortie_config.sortie.lbas_enabled => {
            warn!("sortie.lbas_enabled is set but the scenario has no [auxiliary] section, groups are assumed ready");
        }
        None => {}
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  sortie-pilot");
    info!("  Map: {} | Mode: {}", sortie_config.sortie.map, sortie_config.sortie.fleet_mode.as_str());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, stopping after the current step...");
        shutdown_token.cancel();
    });

    let poll = sortie_config.timing.scheduler_poll().max(Duration::from_secs(1));
    while !cancel_token.is_cancelled() {
        if orchestrator.needs_to_sortie() {
            orchestrator.goto_sortie_menu().await?;
            let outcome = match orchestrator.run_sortie().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Sortie failed");
                    return Err(e.into());
                }
            };
            emit(&outcome, &orchestrator, args.json)?;

            if args.once || game.finished().await {
                break;
            }
        }

        orchestrator.status_report();
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = tokio::time::sleep(poll) => {}
        }
    }

    let stats = orchestrator.stats();
    info!(
        attempted = stats.attempted,
        launched = stats.launched,
        declined = stats.declined,
        completed = stats.completed,
        nodes = stats.nodes_fought,
        "✓ sortie-pilot shutdown complete"
    );
    Ok(())
}
