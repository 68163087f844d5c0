//! # Dispatch Core
//!
//! Scheduling-timeline engine for a field-service dispatch board.
//!
//! This crate owns the hard part of the dispatch screen: placing job blocks
//! onto technician timelines, resolving drag-move / drag-resize / backlog
//! drop gestures, deriving conflict and delay signals, wrapping mutations
//! in reversible undo toasts, and reconciling with the remote source of
//! truth through realtime change notifications. Rendering, transport, and
//! authentication belong to the host environment.
//!
//! ## Architecture
//!
//! - [`models`]: domain types — technicians, schedule blocks, backlog jobs,
//!   calendar events, day snapshots
//! - [`config`]: board constants and per-instance configuration
//! - [`grid`]: pure time↔position mapping and snap-to-grid
//! - [`persistence`]: the external source-of-truth contract plus an
//!   in-memory backend for tests and local development
//! - [`store`]: the authoritative in-memory schedule state and its
//!   optimistic mutation operations
//! - [`conflict`]: derived overlap / cascading-delay / travel signals
//! - [`undo`]: toast surface with time-bounded reversible undo
//! - [`drag`]: the pointer-gesture state machine
//! - [`sync`]: realtime change consumption and full-reload reconciliation
//!
//! ## Consistency model
//!
//! Mutations apply optimistically in memory and persist fire-and-forget;
//! the backend is reconciled by replacing the whole day snapshot whenever a
//! realtime change event arrives. Local state is never rolled back on a
//! persistence failure; the next reconciliation is authoritative.

pub mod config;
pub mod conflict;
pub mod drag;
pub mod error;
pub mod grid;
pub mod models;
pub mod persistence;
pub mod store;
pub mod sync;
pub mod undo;

pub use config::DispatchConfig;
pub use error::{DispatchError, DispatchResult};
pub use store::DispatchStore;
