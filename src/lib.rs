//! sortie-pilot: sortie automation for a turn-based fleet game
//!
//! The core is the sortie orchestrator: a state machine that decides when a
//! sortie may launch, drives the fleet across the map and resolves combat
//! prompts until the fleet is back in port.
//!
//! ## Architecture
//!
//! - **Eligibility Gate**: pre-sortie supply, damage, fatigue and port checks
//! - **Condition Sampler**: concurrent damage/fatigue probes
//! - **Position Tracker**: background task mapping the fleet icon to map nodes
//! - **Orchestrator**: traversal, battle, retreat and FCF decisions
//!
//! Screen access, menu navigation and map geometry are collaborators behind
//! the [`vision::VisionService`], [`navigator::Navigator`] and
//! [`map::MapProvider`] traits. [`sim::ScriptedGame`] implements the first two
//! for dry runs and tests.

pub mod auxiliary;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod map;
pub mod navigator;
pub mod orchestrator;
pub mod sampler;
pub mod schedule;
pub mod sim;
pub mod stats;
pub mod tracker;
pub mod types;
pub mod vision;

pub use config::SortieConfig;
pub use error::{SortieError, SortieResult};
pub use orchestrator::{
    Orchestrator, SortieEnding, SortieOutcome, SortieReport, SortieState,
};
pub use types::{
    CombatFleet, DamageCounts, FatigueLevel, FatigueState, FleetId, FleetMode, MapId, Node,
    Position, Severity,
};
