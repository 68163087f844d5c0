//! Persistence boundary for the dispatch board.
//!
//! The store talks to the host environment through the
//! [`SchedulePersistence`] trait: one load call returning the full day
//! snapshot, a set of idempotent upsert calls for mutations, and a change
//! subscription feeding the realtime sync adapter. Transport is the host's
//! concern; implementations may be REST, websocket, or in-memory.
//!
//! [`LocalBackend`] is the in-memory implementation used by tests and local
//! development.

pub mod local;

pub use local::LocalBackend;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::DispatchResult;
use crate::models::{BacklogJob, BlockId, DaySnapshot, JobId, OrgId, ScheduleBlock, TechnicianId};

/// What changed about a job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobChange {
    /// The job's lifecycle status moved.
    StatusChanged,
    /// The job was assigned to a different technician.
    AssignmentChanged,
}

/// A change notification from the source of truth.
///
/// The sync adapter reacts to both variants the same way: a full reload of
/// the viewed date. The distinction exists for logging and filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A schedule-block row changed.
    BlockChanged { block_id: BlockId },
    /// A job row changed in a way that affects the board.
    JobChanged { job_id: JobId, change: JobChange },
}

/// Contract with the external source of truth.
///
/// All persist calls are idempotent upserts; the store never awaits them on
/// the mutation path. Dropping the receiver returned by [`subscribe`] ends
/// the subscription.
///
/// [`subscribe`]: SchedulePersistence::subscribe
#[async_trait]
pub trait SchedulePersistence: Send + Sync {
    /// Load the full schedule snapshot for one org and date.
    async fn load_schedule(&self, org: &OrgId, date: NaiveDate) -> DispatchResult<DaySnapshot>;

    /// Persist a block relocation.
    async fn persist_move(
        &self,
        block_id: &BlockId,
        new_start_hour: f64,
        new_technician_id: &TechnicianId,
    ) -> DispatchResult<()>;

    /// Persist a block duration change.
    async fn persist_resize(&self, block_id: &BlockId, new_duration: f64) -> DispatchResult<()>;

    /// Persist a soft delete.
    async fn persist_delete(&self, block_id: &BlockId) -> DispatchResult<()>;

    /// Reinsert a previously deleted block.
    async fn persist_restore(&self, snapshot: &ScheduleBlock) -> DispatchResult<()>;

    /// Convert a block back into a backlog job, returning the job row.
    async fn persist_unschedule(&self, block_id: &BlockId) -> DispatchResult<BacklogJob>;

    /// Convert a backlog job into a schedule block, returning the block row.
    async fn persist_assign(
        &self,
        job_id: &JobId,
        technician_id: &TechnicianId,
        start_hour: f64,
    ) -> DispatchResult<ScheduleBlock>;

    /// Subscribe to change notifications scoped to the org.
    fn subscribe(&self, org: &OrgId) -> broadcast::Receiver<ChangeEvent>;
}
