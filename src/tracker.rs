//! Position Tracker
//!
//! Background task scoped to one sortie. It listens to fleet-icon appearance
//! events, converts each match to an in-game position and reconciles it
//! against the map's node geometry. The task is the only writer of the
//! current-node snapshot; the orchestrator reads it through
//! [`TrackerHandle::current_node`].

use crate::config::ViewportConfig;
use crate::map::MapProvider;
use crate::types::{Match, Node, Position};
use crate::vision::Subscription;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Latest fleet position and the node it resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub position: Option<Position>,
    pub node: Option<Node>,
}

/// Convert a fleet-icon match (screen coordinates) to the fleet's in-game
/// position: centre-x, bottom-y, relative to the viewport origin.
pub fn fleet_anchor(m: &Match, viewport: ViewportConfig) -> Position {
    Position::new(
        m.bounds.x + m.bounds.w / 2 - viewport.x,
        m.bounds.y + m.bounds.h - viewport.y,
    )
}

/// Fold one observation into the snapshot. The previous node is kept when the
/// position falls outside every node.
pub fn apply_match(
    previous: &TrackerSnapshot,
    m: &Match,
    viewport: ViewportConfig,
    map: &dyn MapProvider,
) -> TrackerSnapshot {
    let position = fleet_anchor(m, viewport);
    let node = map.nearest_node(position).or_else(|| previous.node.clone());
    TrackerSnapshot {
        position: Some(position),
        node,
    }
}

pub struct PositionTracker;

impl PositionTracker {
    /// Spawn the tracking task. Must be called from within a tokio runtime.
    pub fn start(
        mut subscription: Subscription,
        map: Arc<dyn MapProvider>,
        viewport: ViewportConfig,
    ) -> TrackerHandle {
        let snapshot = Arc::new(ArcSwap::from_pointee(TrackerSnapshot::default()));
        let cancel = CancellationToken::new();

        let task_snapshot = Arc::clone(&snapshot);
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            info!("[Tracker] Started");
            loop {
                let event = tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    event = subscription.next() => event,
                };
                let Some(m) = event else {
                    warn!("[Tracker] Fleet icon subscription ended");
                    break;
                };

                let next = {
                    let previous = task_snapshot.load();
                    let next = apply_match(&previous, &m, viewport, map.as_ref());
                    if next.node != previous.node {
                        debug!(
                            node = ?next.node.as_ref().map(|n| n.name.as_str()),
                            position = ?next.position,
                            "[Tracker] Fleet moved"
                        );
                    }
                    next
                };
                task_snapshot.store(Arc::new(next));
            }
            subscription.close();
            debug!("[Tracker] Stopped");
        });

        TrackerHandle {
            cancel,
            task: Some(task),
            snapshot,
        }
    }
}

/// Owner of a running tracker. Dropping it cancels the task.
pub struct TrackerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    snapshot: Arc<ArcSwap<TrackerSnapshot>>,
}

impl TrackerHandle {
    /// Node the fleet was last seen at, if any.
    pub fn current_node(&self) -> Option<Node> {
        self.snapshot.load().node.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Cancel the task and wait for it to exit. No snapshot writes happen
    /// after this returns. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.cancel.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "[Tracker] Task ended abnormally");
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
