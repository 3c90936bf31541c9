//! System-wide default constants.
//!
//! Centralises delays, tolerances and timeouts. Grouped by subsystem for easy
//! discovery. Operator-tunable values are exposed through `SortieConfig` and
//! default to these.

use std::time::Duration;

// ============================================================================
// Scheduling
// ============================================================================

/// Backoff after a fleet shows high fatigue.
pub const HIGH_FATIGUE_DELAY: Duration = Duration::from_secs(25 * 60);

/// Backoff after a fleet shows medium fatigue.
pub const MEDIUM_FATIGUE_DELAY: Duration = Duration::from_secs(15 * 60);

/// Backoff when the port is full.
pub const PORT_FULL_DELAY: Duration = Duration::from_secs(15 * 60);

/// Default backoff: retry on the caller's next poll.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::ZERO;

// ============================================================================
// Vision tolerances
// ============================================================================

/// Minimum similarity for damage-state icons.
pub const DAMAGE_SIMILARITY: f32 = 0.75;

/// Minimum similarity for fatigue-state icons.
pub const FATIGUE_SIMILARITY: f32 = 0.9;

/// Minimum similarity for the fleet icon on the sortie map.
pub const FLEET_ICON_SIMILARITY: f32 = 0.75;

// ============================================================================
// Timing (milliseconds unless noted)
// ============================================================================

/// Sleep between polls of the traversal and battle loops.
pub const POLL_INTERVAL_MS: u64 = 250;

/// Wait before clicking away the boss dialogue on node arrival.
pub const DIALOGUE_DELAY_MS: u64 = 5_000;

/// Generic settle time after a click.
pub const CLICK_SETTLE_MS: u64 = 1_000;

/// Interval between clicks while the compass is spinning.
pub const COMPASS_CLICK_INTERVAL_MS: u64 = 3_000;

/// Wait between main-fleet and escort-fleet result screens.
pub const ESCORT_RESULTS_DELAY_MS: u64 = 2_000;

/// Bound on waits for expected screen affordances (seconds).
pub const SCREEN_TIMEOUT_SECS: u64 = 30;

/// How often the binary checks whether a sortie is due (seconds).
pub const SCHEDULER_POLL_SECS: u64 = 30;

// ============================================================================
// Sortie
// ============================================================================

/// Default number of combat nodes before retreating.
pub const DEFAULT_NODE_CAP: usize = 5;

/// Buffer size of the fleet-icon subscription channel.
pub const FLEET_ICON_CHANNEL_CAPACITY: usize = 32;
