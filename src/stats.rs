//! Running sortie counters

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortieStats {
    /// `run_sortie` calls
    pub attempted: u64,
    /// Sorties that passed every gate and were launched
    pub launched: u64,
    /// Sorties declined by a precondition (auxiliary gate or eligibility)
    pub declined: u64,
    /// Launch control not found
    pub launch_failures: u64,
    /// Launched sorties that reached a terminal screen
    pub completed: u64,
    /// Launched sorties that ended in a forced flagship retreat
    pub forced_retreats: u64,
    /// Combat nodes fought across all sorties
    pub nodes_fought: u64,
}
