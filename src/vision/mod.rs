//! Vision/Input service seam
//!
//! Template detection, clicking and appearance subscriptions are provided by an
//! external service. The orchestrator only talks to it through
//! [`VisionService`]; [`crate::sim::ScriptedGame`] implements it for dry runs
//! and tests.

use crate::types::{Match, Pattern, Position, ScreenRegion};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Narrow contract the sortie core needs from the screen.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Whether `pattern` is currently visible in `region`.
    async fn exists(&self, region: ScreenRegion, pattern: &Pattern) -> Result<bool>;

    /// Wait up to `timeout` for `pattern` to appear. Returns `false` on timeout.
    async fn wait_for(
        &self,
        region: ScreenRegion,
        pattern: &Pattern,
        timeout: Duration,
    ) -> Result<bool>;

    /// Click `pattern` if it is visible. Returns `false` when it was not found.
    async fn click(&self, region: ScreenRegion, pattern: &Pattern) -> Result<bool>;

    /// Click somewhere inside `region` without looking for anything.
    async fn tap(&self, region: ScreenRegion) -> Result<()>;

    /// Click a point given relative to the origin of `region`.
    async fn tap_point(&self, region: ScreenRegion, point: Position) -> Result<()>;

    /// Number of matches of `pattern` inside `region`.
    async fn find_all(&self, region: ScreenRegion, pattern: &Pattern) -> Result<usize>;

    /// Start delivering a [`Match`] every time `pattern` appears in `region`.
    /// Delivery continues until the returned [`Subscription`] is dropped or closed.
    async fn subscribe(&self, region: ScreenRegion, pattern: &Pattern) -> Result<Subscription>;

    /// Move the cursor out of the way so hover effects don't hide templates.
    async fn park_cursor(&self, _region: ScreenRegion) -> Result<()> {
        Ok(())
    }

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}

/// Stream of appearance events. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Match>,
}

impl Subscription {
    /// Create a subscription plus the sender the vision backend publishes on.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Match>, Subscription) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Subscription { rx })
    }

    /// Next appearance event, or `None` once the backend stopped publishing.
    pub async fn next(&mut self) -> Option<Match> {
        self.rx.recv().await
    }

    /// Stop accepting events. Already-buffered events are discarded.
    pub fn close(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}
