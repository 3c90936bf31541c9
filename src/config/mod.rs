//! Sortie Configuration Module
//!
//! Provides operator configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `SORTIE_CONFIG` environment variable (path to TOML file)
//! 2. `sortie_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The binary loads the config once at startup and hands it out as an
//! `Arc<SortieConfig>`; library code always takes it explicitly.
//!
//! ```ignore
//! let config = Arc::new(SortieConfig::load());
//! let cap = config.sortie.combat_nodes;
//! ```

mod sortie_config;
pub mod defaults;
pub mod validation;

pub use sortie_config::*;
