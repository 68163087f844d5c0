//! Authoritative in-memory schedule state and its mutation operations.
//!
//! The store owns the [`DaySnapshot`] for the viewed date. Every mutation
//! applies optimistically in memory first, then a persistence call is
//! spawned fire-and-forget; the caller is never blocked on the network.
//! Invalid or unknown targets degrade to silent no-ops (`None` returns) per
//! the board's optimistic-UI contract. Persistence failures are logged and
//! handed to an error hook (the toast layer) without rolling local state
//! back; the next realtime reconciliation is the corrective path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::models::{
    BacklogJob, BlockId, BlockStatus, DaySnapshot, JobId, OrgId, Priority, ScheduleBlock,
    TechnicianId,
};
use crate::persistence::SchedulePersistence;

/// Prior placement returned by [`DispatchStore::move_block`], for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePrior {
    pub start_hour: f64,
    pub technician_id: TechnicianId,
}

/// Hook invoked when a fire-and-forget persistence call fails.
pub type PersistErrorHook = Arc<dyn Fn(&DispatchError) + Send + Sync>;

struct StoreState {
    snapshot: DaySnapshot,
    loading: bool,
}

/// The dispatch board's domain store. Cheap to clone; all clones share the
/// same underlying state.
#[derive(Clone)]
pub struct DispatchStore {
    org: OrgId,
    config: DispatchConfig,
    backend: Arc<dyn SchedulePersistence>,
    state: Arc<RwLock<StoreState>>,
    error_hook: Arc<RwLock<Option<PersistErrorHook>>>,
    disposed: Arc<AtomicBool>,
}

impl DispatchStore {
    /// Create a store for one organization. The config is validated here.
    pub fn init(
        org: OrgId,
        config: DispatchConfig,
        backend: Arc<dyn SchedulePersistence>,
    ) -> DispatchResult<Self> {
        let config = config.validated()?;
        Ok(Self {
            org,
            config,
            backend,
            state: Arc::new(RwLock::new(StoreState {
                snapshot: DaySnapshot::default(),
                loading: false,
            })),
            error_hook: Arc::new(RwLock::new(None)),
            disposed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stop issuing persistence calls. In-memory state stays readable so a
    /// teardown render does not observe an empty board.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Register the hook notified when a background persist fails.
    pub fn set_persist_error_hook(&self, hook: PersistErrorHook) {
        *self.error_hook.write() = Some(hook);
    }

    pub fn org(&self) -> &OrgId {
        &self.org
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Whether a reload is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// The date the board is showing, once loaded.
    pub fn date(&self) -> Option<NaiveDate> {
        self.state.read().snapshot.date
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> DaySnapshot {
        self.state.read().snapshot.clone()
    }

    /// Replace the whole snapshot from the source of truth.
    ///
    /// On failure the previous snapshot is left intact and the error is
    /// returned to the caller.
    pub async fn load_for_date(&self, date: NaiveDate) -> DispatchResult<()> {
        self.state.write().loading = true;
        let result = self.backend.load_schedule(&self.org, date).await;
        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(mut snapshot) => {
                snapshot.date = Some(date);
                info!(%date, blocks = snapshot.blocks.len(), "schedule loaded");
                state.snapshot = snapshot;
                Ok(())
            }
            Err(err) => {
                warn!(%date, error = %err, "schedule load failed, keeping previous snapshot");
                Err(err)
            }
        }
    }

    /// Relocate a block to a new start hour and technician.
    ///
    /// Returns the prior placement for undo construction, or `None` when the
    /// id is unknown, the target technician does not exist, or the block
    /// would leave the day window.
    pub fn move_block(
        &self,
        id: &BlockId,
        new_start_hour: f64,
        new_technician_id: &TechnicianId,
    ) -> Option<MovePrior> {
        let prior = {
            let mut state = self.state.write();
            if !state
                .snapshot
                .technicians
                .iter()
                .any(|t| &t.id == new_technician_id)
            {
                debug!(%new_technician_id, "move rejected: unknown technician");
                return None;
            }
            let Some(block) = state.snapshot.blocks.iter_mut().find(|b| &b.id == id) else {
                debug!(%id, "move rejected: unknown block");
                return None;
            };
            if !within_day(&self.config, new_start_hour, block.duration) {
                debug!(%id, new_start_hour, "move rejected: outside day window");
                return None;
            }
            let prior = MovePrior {
                start_hour: block.start_hour,
                technician_id: block.technician_id.clone(),
            };
            block.start_hour = new_start_hour;
            block.technician_id = new_technician_id.clone();
            prior
        };

        let backend = self.backend.clone();
        let block_id = id.clone();
        let tech = new_technician_id.clone();
        self.spawn_persist("move", async move {
            backend.persist_move(&block_id, new_start_hour, &tech).await
        });
        Some(prior)
    }

    /// Change a block's duration, clamped to the slot granularity and the
    /// day end. Returns the prior duration.
    pub fn resize_block(&self, id: &BlockId, new_duration: f64) -> Option<f64> {
        let (prior, clamped) = {
            let mut state = self.state.write();
            let Some(block) = state.snapshot.blocks.iter_mut().find(|b| &b.id == id) else {
                debug!(%id, "resize rejected: unknown block");
                return None;
            };
            let max = self.config.day_end - block.start_hour;
            let clamped = new_duration.max(self.config.granularity).min(max);
            let prior = block.duration;
            block.duration = clamped;
            (prior, clamped)
        };

        let backend = self.backend.clone();
        let block_id = id.clone();
        self.spawn_persist("resize", async move {
            backend.persist_resize(&block_id, clamped).await
        });
        Some(prior)
    }

    /// Soft-remove a block, returning its full snapshot for undo.
    pub fn delete_block(&self, id: &BlockId) -> Option<ScheduleBlock> {
        let removed = {
            let mut state = self.state.write();
            let idx = state.snapshot.blocks.iter().position(|b| &b.id == id)?;
            state.snapshot.blocks.remove(idx)
        };

        let backend = self.backend.clone();
        let block_id = id.clone();
        self.spawn_persist("delete", async move {
            backend.persist_delete(&block_id).await
        });
        Some(removed)
    }

    /// Reinsert a block captured by [`Self::delete_block`].
    pub fn restore_block(&self, block: ScheduleBlock) {
        {
            let mut state = self.state.write();
            // Tolerate a reconciliation having already brought the row back.
            if state.snapshot.block(&block.id).is_some() {
                debug!(id = %block.id, "restore skipped: block already present");
                return;
            }
            state.snapshot.blocks.push(block.clone());
        }

        let backend = self.backend.clone();
        self.spawn_persist("restore", async move {
            backend.persist_restore(&block).await
        });
    }

    /// Remove a block from the timeline and return the job to the backlog.
    /// The synthesized backlog entry preserves the underlying job identity.
    pub fn unschedule_block(&self, id: &BlockId) -> Option<BacklogJob> {
        let job = {
            let mut state = self.state.write();
            let idx = state.snapshot.blocks.iter().position(|b| &b.id == id)?;
            let block = state.snapshot.blocks.remove(idx);
            let job = BacklogJob {
                id: block.job_id.clone(),
                display_id: block.job_id.value().to_uppercase(),
                title: block.title,
                client: block.client,
                location: block.location,
                priority: Priority::Medium,
                estimated_minutes: (block.duration * 60.0).round() as u32,
            };
            state.snapshot.backlog.push(job.clone());
            job
        };

        let backend = self.backend.clone();
        let block_id = id.clone();
        self.spawn_persist("unschedule", async move {
            backend.persist_unschedule(&block_id).await.map(|_| ())
        });
        Some(job)
    }

    /// Place a backlog job onto a technician's timeline.
    ///
    /// Removes exactly one backlog entry and inserts exactly one block with
    /// status `Scheduled`. `None` when the job is unknown, the technician
    /// does not exist, or the placement leaves the day window.
    pub fn assign_backlog_job(
        &self,
        job_id: &JobId,
        technician_id: &TechnicianId,
        start_hour: f64,
    ) -> Option<ScheduleBlock> {
        let block = {
            let mut state = self.state.write();
            if !state
                .snapshot
                .technicians
                .iter()
                .any(|t| &t.id == technician_id)
            {
                debug!(%technician_id, "assign rejected: unknown technician");
                return None;
            }
            let idx = state.snapshot.backlog.iter().position(|j| &j.id == job_id)?;
            let duration = state.snapshot.backlog[idx]
                .estimated_hours()
                .max(self.config.granularity);
            if !within_day(&self.config, start_hour, duration) {
                debug!(%job_id, start_hour, "assign rejected: outside day window");
                return None;
            }
            let job = state.snapshot.backlog.remove(idx);
            let block = ScheduleBlock {
                id: BlockId::new(Uuid::new_v4().to_string()),
                job_id: job.id.clone(),
                technician_id: technician_id.clone(),
                title: job.title,
                client: job.client,
                location: job.location,
                start_hour,
                duration,
                status: BlockStatus::Scheduled,
                conflict: false,
                travel_time_min: None,
            };
            state.snapshot.blocks.push(block.clone());
            block
        };

        let backend = self.backend.clone();
        let job_id = job_id.clone();
        let tech = technician_id.clone();
        self.spawn_persist("assign", async move {
            backend.persist_assign(&job_id, &tech, start_hour).await.map(|_| ())
        });
        Some(block)
    }

    fn spawn_persist<F>(&self, operation: &'static str, fut: F)
    where
        F: std::future::Future<Output = DispatchResult<()>> + Send + 'static,
    {
        if self.disposed.load(Ordering::SeqCst) {
            debug!(operation, "persist skipped: store disposed");
            return;
        }
        let hook = self.error_hook.clone();
        tokio::spawn(async move {
            if let Err(err) = fut.await {
                warn!(operation, error = %err, "background persist failed");
                if let Some(hook) = hook.read().as_ref() {
                    hook(&err);
                }
            }
        });
    }
}

fn within_day(config: &DispatchConfig, start_hour: f64, duration: f64) -> bool {
    start_hour >= config.day_start && start_hour + duration <= config.day_end
}
