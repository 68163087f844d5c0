//! Undo-able toasts around store mutations.
//!
//! Every relocating or destructive mutation goes through the
//! [`UndoCoordinator`]: the store call applies optimistically, a toast
//! describes the change, and reversible mutations carry an undo action that
//! replays the inverse call with the prior values the store returned. The
//! undo action goes inert once the toast's display window elapses; expiry
//! is judged lazily against the deadline, no timer fires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::{BlockId, JobId, TechnicianId};
use crate::store::DispatchStore;

/// Visual category of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

type UndoAction = Box<dyn FnOnce() + Send>;

struct ToastEntry {
    message: String,
    kind: ToastKind,
    deadline: Instant,
    undo: Option<UndoAction>,
}

/// A toast as presented to the host UI.
#[derive(Debug, Clone)]
pub struct ToastView {
    pub id: Uuid,
    pub message: String,
    pub kind: ToastKind,
    pub undoable: bool,
}

/// Registry of live toasts. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ToastCenter {
    inner: Arc<Mutex<HashMap<Uuid, ToastEntry>>>,
    undo_window: Duration,
}

impl ToastCenter {
    pub fn new(undo_window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            undo_window,
        }
    }

    /// Surface a toast, optionally carrying an undo action.
    pub fn push(
        &self,
        message: impl Into<String>,
        kind: ToastKind,
        undo: Option<UndoAction>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let entry = ToastEntry {
            message: message.into(),
            kind,
            deadline: Instant::now() + self.undo_window,
            undo,
        };
        self.inner.lock().insert(id, entry);
        id
    }

    /// Execute the undo action attached to a toast, if it is still live.
    /// Returns whether an undo ran.
    pub fn undo(&self, id: Uuid) -> bool {
        let action = {
            let mut toasts = self.inner.lock();
            let Some(entry) = toasts.get_mut(&id) else {
                return false;
            };
            if Instant::now() > entry.deadline {
                debug!(%id, "undo window elapsed, action inert");
                entry.undo = None;
                return false;
            }
            entry.undo.take()
        };
        match action {
            Some(run) => {
                run();
                self.inner.lock().remove(&id);
                true
            }
            None => false,
        }
    }

    /// Toasts whose display window has not yet elapsed.
    pub fn active(&self) -> Vec<ToastView> {
        let now = Instant::now();
        self.inner
            .lock()
            .iter()
            .filter(|(_, e)| now <= e.deadline)
            .map(|(id, e)| ToastView {
                id: *id,
                message: e.message.clone(),
                kind: e.kind,
                undoable: e.undo.is_some(),
            })
            .collect()
    }

    /// Drop expired toasts.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.inner.lock().retain(|_, e| now <= e.deadline);
    }
}

/// Wraps store mutations with toast + undo affordances.
#[derive(Clone)]
pub struct UndoCoordinator {
    store: DispatchStore,
    toasts: ToastCenter,
}

impl UndoCoordinator {
    pub fn new(store: DispatchStore) -> Self {
        let toasts = ToastCenter::new(store.config().undo_window);
        Self { store, toasts }
    }

    pub fn toasts(&self) -> &ToastCenter {
        &self.toasts
    }

    pub fn store(&self) -> &DispatchStore {
        &self.store
    }

    /// Route background persistence failures into error toasts.
    pub fn install_persist_error_hook(&self) {
        let toasts = self.toasts.clone();
        self.store.set_persist_error_hook(Arc::new(move |err| {
            toasts.push(
                format!("Change could not be saved: {err}"),
                ToastKind::Error,
                None,
            );
        }));
    }

    /// Move a block, surfacing an undo-able toast summarizing the new
    /// time and technician. Returns the toast id when the move applied.
    pub fn move_block(
        &self,
        id: &BlockId,
        new_start_hour: f64,
        new_technician_id: &TechnicianId,
    ) -> Option<Uuid> {
        let snapshot = self.store.snapshot();
        let title = snapshot.block(id)?.title.clone();
        let tech_name = snapshot
            .technicians
            .iter()
            .find(|t| &t.id == new_technician_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| new_technician_id.value().to_string());

        let prior = self.store.move_block(id, new_start_hour, new_technician_id)?;
        let store = self.store.clone();
        let undo_id = id.clone();
        let toast = self.toasts.push(
            format!(
                "Moved {title} to {} with {tech_name}",
                format_hour(new_start_hour)
            ),
            ToastKind::Success,
            Some(Box::new(move || {
                store.move_block(&undo_id, prior.start_hour, &prior.technician_id);
            })),
        );
        Some(toast)
    }

    /// Resize a block with an undo restoring the prior duration.
    pub fn resize_block(&self, id: &BlockId, new_duration: f64) -> Option<Uuid> {
        let title = self.store.snapshot().block(id)?.title.clone();
        let prior = self.store.resize_block(id, new_duration)?;
        let store = self.store.clone();
        let undo_id = id.clone();
        let toast = self.toasts.push(
            format!("Resized {title}"),
            ToastKind::Success,
            Some(Box::new(move || {
                store.resize_block(&undo_id, prior);
            })),
        );
        Some(toast)
    }

    /// Delete a block with an undo reinserting the captured snapshot.
    pub fn delete_block(&self, id: &BlockId) -> Option<Uuid> {
        let removed = self.store.delete_block(id)?;
        let store = self.store.clone();
        let message = format!("Deleted {}", removed.title);
        let toast = self.toasts.push(
            message,
            ToastKind::Info,
            Some(Box::new(move || {
                store.restore_block(removed);
            })),
        );
        Some(toast)
    }

    /// Return a block's job to the backlog; undo re-assigns it to its
    /// original technician and hour.
    pub fn unschedule_block(&self, id: &BlockId) -> Option<Uuid> {
        let snapshot = self.store.snapshot();
        let block = snapshot.block(id)?;
        let prior_tech = block.technician_id.clone();
        let prior_hour = block.start_hour;

        let job = self.store.unschedule_block(id)?;
        let store = self.store.clone();
        let job_id = job.id.clone();
        let toast = self.toasts.push(
            format!("Returned {} to backlog", job.title),
            ToastKind::Info,
            Some(Box::new(move || {
                store.assign_backlog_job(&job_id, &prior_tech, prior_hour);
            })),
        );
        Some(toast)
    }

    /// Schedule a backlog job; undo sends it back to the backlog.
    pub fn assign_backlog_job(
        &self,
        job_id: &JobId,
        technician_id: &TechnicianId,
        start_hour: f64,
    ) -> Option<Uuid> {
        let block = self
            .store
            .assign_backlog_job(job_id, technician_id, start_hour)?;
        let store = self.store.clone();
        let block_id = block.id.clone();
        let toast = self.toasts.push(
            format!("Scheduled {} at {}", block.title, format_hour(start_hour)),
            ToastKind::Success,
            Some(Box::new(move || {
                store.unschedule_block(&block_id);
            })),
        );
        Some(toast)
    }
}

/// Render a decimal hour as a clock label, e.g. `9.25` → `"9:15 AM"`.
pub fn format_hour(hour: f64) -> String {
    let total_minutes = (hour * 60.0).round() as i64;
    let h24 = (total_minutes / 60).rem_euclid(24);
    let minutes = total_minutes % 60;
    let (h12, suffix) = match h24 {
        0 => (12, "AM"),
        1..=11 => (h24, "AM"),
        12 => (12, "PM"),
        _ => (h24 - 12, "PM"),
    };
    format!("{h12}:{minutes:02} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour(9.25), "9:15 AM");
        assert_eq!(format_hour(13.5), "1:30 PM");
        assert_eq!(format_hour(12.0), "12:00 PM");
        assert_eq!(format_hour(6.0), "6:00 AM");
    }

    #[test]
    fn test_undo_runs_within_window() {
        let center = ToastCenter::new(Duration::from_secs(60));
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let id = center.push(
            "Moved job",
            ToastKind::Success,
            Some(Box::new(move || *flag.lock() = true)),
        );
        assert!(center.undo(id));
        assert!(*ran.lock());
        // Consumed: a second undo is a no-op.
        assert!(!center.undo(id));
    }

    #[test]
    fn test_undo_inert_after_window() {
        let center = ToastCenter::new(Duration::ZERO);
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let id = center.push(
            "Moved job",
            ToastKind::Success,
            Some(Box::new(move || *flag.lock() = true)),
        );
        std::thread::sleep(Duration::from_millis(5));
        assert!(!center.undo(id));
        assert!(!*ran.lock());
    }

    #[test]
    fn test_undo_unknown_id() {
        let center = ToastCenter::new(Duration::from_secs(5));
        assert!(!center.undo(Uuid::new_v4()));
    }

    #[test]
    fn test_active_excludes_expired() {
        let center = ToastCenter::new(Duration::ZERO);
        center.push("old", ToastKind::Info, None);
        std::thread::sleep(Duration::from_millis(5));
        assert!(center.active().is_empty());
        center.purge_expired();
    }

    #[test]
    fn test_active_reports_undoable() {
        let center = ToastCenter::new(Duration::from_secs(60));
        center.push("plain", ToastKind::Info, None);
        center.push("undoable", ToastKind::Success, Some(Box::new(|| {})));
        let active = center.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active.iter().filter(|t| t.undoable).count(), 1);
    }
}
