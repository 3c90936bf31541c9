//! Sortie error taxonomy
//!
//! Declines and launch failures are ordinary outcomes (see
//! `orchestrator::SortieOutcome`). Only violated screen-flow assumptions and
//! collaborator failures surface as errors.

use crate::types::{ScreenRegion, Template};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortieError {
    #[error("Timed out after {timeout:?} waiting for {template} in {region}")]
    Timeout {
        region: ScreenRegion,
        template: Template,
        timeout: Duration,
    },

    #[error("Forced route from node {from} targets unknown node {to}")]
    UnknownRouteTarget { from: String, to: String },

    #[error("Collaborator failure: {0:#}")]
    Collaborator(#[from] anyhow::Error),
}

pub type SortieResult<T> = Result<T, SortieError>;
