//! In-memory persistence backend.
//!
//! A feature-complete stand-in for the real backend, used by unit and
//! integration tests and for local development. Data lives in a
//! `parking_lot::RwLock` keyed by date; change notifications go out over a
//! `tokio::sync::broadcast` channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{DispatchError, DispatchResult};
use crate::models::{
    BacklogJob, BlockId, BlockStatus, DaySnapshot, JobId, OrgId, Priority, ScheduleBlock,
    TechnicianId,
};
use crate::persistence::{ChangeEvent, SchedulePersistence};

/// In-memory implementation of [`SchedulePersistence`].
pub struct LocalBackend {
    days: RwLock<HashMap<NaiveDate, DaySnapshot>>,
    changes: broadcast::Sender<ChangeEvent>,
    fail_persists: AtomicBool,
    load_count: AtomicUsize,
}

impl LocalBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            days: RwLock::new(HashMap::new()),
            changes,
            fail_persists: AtomicBool::new(false),
            load_count: AtomicUsize::new(0),
        }
    }

    /// Install the snapshot served for a date.
    pub fn seed_day(&self, date: NaiveDate, mut snapshot: DaySnapshot) {
        snapshot.date = Some(date);
        self.days.write().insert(date, snapshot);
    }

    /// Make every subsequent persist call fail, for error-path tests.
    pub fn set_fail_persists(&self, fail: bool) {
        self.fail_persists.store(fail, Ordering::SeqCst);
    }

    /// Number of `load_schedule` calls served so far.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Emit a change notification, as the real backend would after a row
    /// changed on the server side.
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.changes.send(event);
    }

    fn check_available(&self) -> DispatchResult<()> {
        if self.fail_persists.load(Ordering::SeqCst) {
            return Err(DispatchError::persistence("backend unavailable"));
        }
        Ok(())
    }

    fn with_block<R>(
        &self,
        block_id: &BlockId,
        f: impl FnOnce(&mut DaySnapshot, usize) -> R,
    ) -> DispatchResult<R> {
        let mut days = self.days.write();
        for snapshot in days.values_mut() {
            if let Some(idx) = snapshot.blocks.iter().position(|b| &b.id == block_id) {
                return Ok(f(snapshot, idx));
            }
        }
        Err(DispatchError::not_found(format!(
            "block {block_id} not in backend"
        )))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulePersistence for LocalBackend {
    async fn load_schedule(&self, _org: &OrgId, date: NaiveDate) -> DispatchResult<DaySnapshot> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let days = self.days.read();
        days.get(&date).cloned().ok_or_else(|| {
            DispatchError::not_found(format!("no schedule seeded for {date}"))
        })
    }

    async fn persist_move(
        &self,
        block_id: &BlockId,
        new_start_hour: f64,
        new_technician_id: &TechnicianId,
    ) -> DispatchResult<()> {
        self.check_available()?;
        self.with_block(block_id, |snapshot, idx| {
            snapshot.blocks[idx].start_hour = new_start_hour;
            snapshot.blocks[idx].technician_id = new_technician_id.clone();
        })
    }

    async fn persist_resize(&self, block_id: &BlockId, new_duration: f64) -> DispatchResult<()> {
        self.check_available()?;
        self.with_block(block_id, |snapshot, idx| {
            snapshot.blocks[idx].duration = new_duration;
        })
    }

    async fn persist_delete(&self, block_id: &BlockId) -> DispatchResult<()> {
        self.check_available()?;
        self.with_block(block_id, |snapshot, idx| {
            snapshot.blocks.remove(idx);
        })
    }

    async fn persist_restore(&self, restored: &ScheduleBlock) -> DispatchResult<()> {
        self.check_available()?;
        let mut days = self.days.write();
        // Restore lands on the day currently holding blocks for that
        // technician; fall back to the first seeded day.
        if let Some(snapshot) = days
            .values_mut()
            .find(|s| s.technicians.iter().any(|t| t.id == restored.technician_id))
        {
            snapshot.blocks.push(restored.clone());
            return Ok(());
        }
        if let Some(snapshot) = days.values_mut().next() {
            snapshot.blocks.push(restored.clone());
            return Ok(());
        }
        Err(DispatchError::persistence("no day to restore into"))
    }

    async fn persist_unschedule(&self, block_id: &BlockId) -> DispatchResult<BacklogJob> {
        self.check_available()?;
        self.with_block(block_id, |snapshot, idx| {
            let block = snapshot.blocks.remove(idx);
            let job = BacklogJob {
                id: block.job_id.clone(),
                display_id: block.job_id.value().to_uppercase(),
                title: block.title.clone(),
                client: block.client.clone(),
                location: block.location.clone(),
                priority: Priority::Medium,
                estimated_minutes: (block.duration * 60.0).round() as u32,
            };
            snapshot.backlog.push(job.clone());
            job
        })
    }

    async fn persist_assign(
        &self,
        job_id: &JobId,
        technician_id: &TechnicianId,
        start_hour: f64,
    ) -> DispatchResult<ScheduleBlock> {
        self.check_available()?;
        let mut days = self.days.write();
        for snapshot in days.values_mut() {
            if let Some(idx) = snapshot.backlog.iter().position(|j| &j.id == job_id) {
                let job = snapshot.backlog.remove(idx);
                let block = ScheduleBlock {
                    id: BlockId::new(Uuid::new_v4().to_string()),
                    job_id: job.id.clone(),
                    technician_id: technician_id.clone(),
                    title: job.title.clone(),
                    client: job.client.clone(),
                    location: job.location.clone(),
                    start_hour,
                    duration: job.estimated_hours().max(crate::config::SLOT_GRANULARITY_HOURS),
                    status: BlockStatus::Scheduled,
                    conflict: false,
                    travel_time_min: None,
                };
                snapshot.blocks.push(block.clone());
                return Ok(block);
            }
        }
        Err(DispatchError::not_found(format!(
            "backlog job {job_id} not in backend"
        )))
    }

    fn subscribe(&self, _org: &OrgId) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
