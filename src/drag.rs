//! Pointer-gesture state machine for the dispatch timeline.
//!
//! Tracks a single in-progress drag (`Idle → Dragging… → Dropped|Cancelled
//! → Idle`) and resolves it into a store mutation on drop. The host
//! environment drives the explicit capture interface — `begin_*`,
//! `on_move(dx, dy)`, `end()`, `cancel()` — from whatever pointer events it
//! has. Movement updates are presentation-only; no mutation happens before
//! `end()`.

use tracing::debug;
use uuid::Uuid;

use crate::grid::{DropTarget, GridGeometry};
use crate::models::{BlockId, JobId, TechnicianId};
use crate::undo::UndoCoordinator;

/// What kind of gesture is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize,
    BacklogAssign,
}

/// What the gesture is dragging.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    Block {
        id: BlockId,
        origin_hour: f64,
        origin_technician: TechnicianId,
        origin_duration: f64,
    },
    BacklogJob {
        id: JobId,
    },
}

/// An in-progress pointer interaction. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub mode: DragMode,
    pub source: DragSource,
    /// Pointer position at gesture start, host coordinates.
    pub pointer_origin: (f64, f64),
    /// Live pointer delta since start.
    pub delta: (f64, f64),
    /// Current drop target, recomputed on every movement.
    pub live_target: Option<DropTarget>,
}

/// How a gesture resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// A move mutation applied; toast id attached.
    Moved { toast: Uuid },
    /// A resize mutation applied.
    Resized { toast: Uuid },
    /// A backlog job was placed on the timeline.
    Assigned { toast: Uuid },
    /// Dropped back where it started; nothing mutated.
    NoChange,
    /// Cancelled explicitly, dropped outside a valid target, or rejected
    /// by the store. Nothing mutated.
    Cancelled,
}

/// Drives drag gestures against the store through the undo coordinator.
pub struct GestureController {
    coordinator: UndoCoordinator,
    geometry: GridGeometry,
    scroll: (f64, f64),
    session: Option<DragSession>,
    popover_open: bool,
}

impl GestureController {
    pub fn new(coordinator: UndoCoordinator, geometry: GridGeometry) -> Self {
        Self {
            coordinator,
            geometry,
            scroll: (0.0, 0.0),
            session: None,
            popover_open: false,
        }
    }

    /// Current session, if a gesture is active.
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// The coordinator this controller resolves gestures through.
    pub fn coordinator(&self) -> &UndoCoordinator {
        &self.coordinator
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Record the host's scroll offsets, used for target resolution.
    pub fn set_scroll(&mut self, scroll: (f64, f64)) {
        self.scroll = scroll;
    }

    /// Mark a block detail popover as open; any gesture start closes it.
    pub fn set_popover_open(&mut self, open: bool) {
        self.popover_open = open;
    }

    pub fn is_popover_open(&self) -> bool {
        self.popover_open
    }

    /// Start moving a block. Returns false when the block is unknown.
    /// An already-active session is cancelled first.
    pub fn begin_move(&mut self, id: &BlockId, pointer: (f64, f64)) -> bool {
        self.begin_block_gesture(id, pointer, DragMode::Move)
    }

    /// Start resizing a block from its trailing edge.
    pub fn begin_resize(&mut self, id: &BlockId, pointer: (f64, f64)) -> bool {
        self.begin_block_gesture(id, pointer, DragMode::Resize)
    }

    /// Start dragging a backlog job toward the timeline.
    pub fn begin_assign(&mut self, job_id: &JobId, pointer: (f64, f64)) -> bool {
        let snapshot = self.coordinator_store_snapshot();
        if !snapshot.backlog.iter().any(|j| &j.id == job_id) {
            debug!(%job_id, "assign gesture rejected: job not in backlog");
            return false;
        }
        self.start_session(DragSession {
            mode: DragMode::BacklogAssign,
            source: DragSource::BacklogJob { id: job_id.clone() },
            pointer_origin: pointer,
            delta: (0.0, 0.0),
            live_target: None,
        });
        true
    }

    /// Update the live pointer delta and recompute the drop target.
    /// Presentation-only; produces no mutation.
    pub fn on_move(&mut self, dx: f64, dy: f64) {
        let scroll = self.scroll;
        let technician_count = self.coordinator_store_snapshot().technicians.len();
        let geometry = self.geometry;
        if let Some(session) = self.session.as_mut() {
            session.delta = (dx, dy);
            let pointer = (
                session.pointer_origin.0 + dx,
                session.pointer_origin.1 + dy,
            );
            session.live_target = match session.mode {
                // Resize never changes row or start; no target needed.
                DragMode::Resize => None,
                _ => geometry.resolve_drop_target(pointer, scroll, technician_count),
            };
        }
    }

    /// The duration a resize gesture would commit right now.
    pub fn live_resize_duration(&self) -> Option<f64> {
        let session = self.session.as_ref()?;
        if session.mode != DragMode::Resize {
            return None;
        }
        let DragSource::Block {
            origin_duration, ..
        } = &session.source
        else {
            return None;
        };
        let raw = origin_duration + session.delta.0 / self.geometry.hour_width;
        Some(
            self.geometry
                .snap_to_grid(raw)
                .max(self.geometry.granularity),
        )
    }

    /// Release the pointer and resolve the gesture into a mutation.
    pub fn end(&mut self) -> DropOutcome {
        let Some(session) = self.session.take() else {
            return DropOutcome::Cancelled;
        };
        match session.mode {
            DragMode::Move => self.resolve_move(&session),
            DragMode::Resize => self.resolve_resize(&session),
            DragMode::BacklogAssign => self.resolve_assign(&session),
        }
    }

    /// Discard the session without mutating anything.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            debug!("drag session cancelled");
        }
    }

    fn begin_block_gesture(&mut self, id: &BlockId, pointer: (f64, f64), mode: DragMode) -> bool {
        let snapshot = self.coordinator_store_snapshot();
        let Some(block) = snapshot.block(id) else {
            debug!(%id, "gesture rejected: unknown block");
            return false;
        };
        let source = DragSource::Block {
            id: id.clone(),
            origin_hour: block.start_hour,
            origin_technician: block.technician_id.clone(),
            origin_duration: block.duration,
        };
        self.start_session(DragSession {
            mode,
            source,
            pointer_origin: pointer,
            delta: (0.0, 0.0),
            live_target: None,
        });
        true
    }

    fn start_session(&mut self, session: DragSession) {
        if self.session.is_some() {
            self.cancel();
        }
        self.popover_open = false;
        self.session = Some(session);
    }

    fn resolve_move(&self, session: &DragSession) -> DropOutcome {
        let DragSource::Block {
            id,
            origin_hour,
            origin_technician,
            ..
        } = &session.source
        else {
            return DropOutcome::Cancelled;
        };
        let Some(target) = session.live_target else {
            return DropOutcome::Cancelled;
        };
        let snapshot = self.coordinator_store_snapshot();
        let Some(tech) = snapshot.technicians.get(target.technician_index) else {
            return DropOutcome::Cancelled;
        };
        if target.hour == *origin_hour && tech.id == *origin_technician {
            return DropOutcome::NoChange;
        }
        match self.coordinator.move_block(id, target.hour, &tech.id) {
            Some(toast) => DropOutcome::Moved { toast },
            None => DropOutcome::Cancelled,
        }
    }

    fn resolve_resize(&self, session: &DragSession) -> DropOutcome {
        let DragSource::Block {
            id,
            origin_duration,
            ..
        } = &session.source
        else {
            return DropOutcome::Cancelled;
        };
        let raw = origin_duration + session.delta.0 / self.geometry.hour_width;
        let new_duration = self
            .geometry
            .snap_to_grid(raw)
            .max(self.geometry.granularity);
        if new_duration == *origin_duration {
            return DropOutcome::NoChange;
        }
        match self.coordinator.resize_block(id, new_duration) {
            Some(toast) => DropOutcome::Resized { toast },
            None => DropOutcome::Cancelled,
        }
    }

    fn resolve_assign(&self, session: &DragSession) -> DropOutcome {
        let DragSource::BacklogJob { id } = &session.source else {
            return DropOutcome::Cancelled;
        };
        let Some(target) = session.live_target else {
            return DropOutcome::Cancelled;
        };
        let snapshot = self.coordinator_store_snapshot();
        let Some(tech) = snapshot.technicians.get(target.technician_index) else {
            return DropOutcome::Cancelled;
        };
        match self
            .coordinator
            .assign_backlog_job(id, &tech.id, target.hour)
        {
            Some(toast) => DropOutcome::Assigned { toast },
            None => DropOutcome::Cancelled,
        }
    }

    fn coordinator_store_snapshot(&self) -> crate::models::DaySnapshot {
        self.coordinator.store().snapshot()
    }
}
