//! Realtime reconciliation with the source of truth.
//!
//! The adapter consumes change notifications for the active organization
//! and reacts to every one of them the same way: a full `load_for_date`
//! for the currently viewed date. Field-level patching is deliberately not
//! attempted; the full reload is the correctness contract. Bursts of events
//! inside the coalescing window collapse into a single reload.
//!
//! A reload never touches an in-progress drag session: the session carries
//! its own origin values, and the mutation it resolves to goes through the
//! store like any other, with the next reconciliation as arbiter.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::persistence::{ChangeEvent, SchedulePersistence};
use crate::store::DispatchStore;

/// Background consumer of realtime change events.
pub struct SyncAdapter {
    handle: Option<JoinHandle<()>>,
}

impl SyncAdapter {
    /// Subscribe to the backend's change stream and start reconciling.
    pub fn start(store: DispatchStore, backend: Arc<dyn SchedulePersistence>) -> Self {
        let rx = backend.subscribe(store.org());
        let coalesce = store.config().coalesce_window;
        let handle = tokio::spawn(run_loop(store, rx, coalesce));
        Self {
            handle: Some(handle),
        }
    }

    /// Stop consuming events. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SyncAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(
    store: DispatchStore,
    mut rx: broadcast::Receiver<ChangeEvent>,
    coalesce: std::time::Duration,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                debug!(?event, "realtime change received");
                // Let the burst settle, then drop whatever queued up: the
                // single reload below covers all of it.
                tokio::time::sleep(coalesce).await;
                let mut collapsed = 0usize;
                while rx.try_recv().is_ok() {
                    collapsed += 1;
                }
                if collapsed > 0 {
                    debug!(collapsed, "coalesced change events into one reload");
                }
                reconcile(&store).await;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // Missed events still mean the snapshot is stale.
                warn!(missed, "change stream lagged, reconciling");
                reconcile(&store).await;
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("change stream closed, sync adapter exiting");
                return;
            }
        }
    }
}

async fn reconcile(store: &DispatchStore) {
    let Some(date) = store.date() else {
        debug!("no date loaded yet, skipping reconciliation");
        return;
    };
    if let Err(err) = store.load_for_date(date).await {
        warn!(%date, error = %err, "reconciliation load failed");
    }
}
