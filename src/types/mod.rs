//! Shared data structures for sortie orchestration
//!
//! - `fleet`: per-fleet damage/fatigue tallies and FCF bookkeeping
//! - `map`: map identity, nodes and in-game positions
//! - `screen`: named screen regions, visual templates and match geometry

mod fleet;
mod map;
mod screen;

pub use fleet::*;
pub use map::*;
pub use screen::*;
