//! Domain types for the dispatch scheduling timeline.
//!
//! All types derive Serialize/Deserialize so snapshots can cross the
//! persistence boundary as JSON. Times within a day are decimal hours
//! (e.g. 9.25 = 09:15); schedule events, which can span day boundaries,
//! carry full UTC timestamps instead.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Organization identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);

/// Schedule block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub String);

/// Underlying job identifier, stable across backlog/schedule conversions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Technician identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TechnicianId(pub String);

macro_rules! string_id_impls {
    ($($name:ident),*) => {
        $(
            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    $name(value.into())
                }

                pub fn value(&self) -> &str {
                    &self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_id_impls!(OrgId, BlockId, JobId, TechnicianId);

/// Presence status of a technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Away,
    Offline,
}

/// A field technician with a timeline row on the dispatch board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub name: String,
    pub initials: String,
    pub presence: Presence,
    /// Hours of availability in the working window.
    pub hours_available: f64,
    /// Hours already booked with schedule blocks.
    pub hours_booked: f64,
}

impl Technician {
    /// Booked-to-available ratio used to signal overload. Zero when the
    /// technician has no availability.
    pub fn capacity_ratio(&self) -> f64 {
        if self.hours_available <= 0.0 {
            return 0.0;
        }
        self.hours_booked / self.hours_available
    }
}

/// Lifecycle status of a schedule block. Transitions arrive only through
/// realtime reconciliation, never from local gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Scheduled,
    EnRoute,
    OnSite,
    InProgress,
    Complete,
    Cancelled,
}

impl BlockStatus {
    /// Statuses that mean the technician is already committed to the job.
    pub fn is_underway(&self) -> bool {
        matches!(self, Self::EnRoute | Self::OnSite | Self::InProgress)
    }
}

/// A scheduled placement of a job onto a technician's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: BlockId,
    pub job_id: JobId,
    pub technician_id: TechnicianId,
    pub title: String,
    pub client: String,
    pub location: String,
    /// Start within the day, decimal hours.
    pub start_hour: f64,
    /// Length in decimal hours, never below the slot granularity.
    pub duration: f64,
    pub status: BlockStatus,
    /// Derived overlap flag; recomputed by the conflict detector, never
    /// persisted.
    #[serde(default)]
    pub conflict: bool,
    /// Minutes of travel required to arrive on site, when known.
    #[serde(default)]
    pub travel_time_min: Option<u32>,
}

impl ScheduleBlock {
    /// End of the block in decimal hours.
    pub fn end_hour(&self) -> f64 {
        self.start_hour + self.duration
    }

    /// Whether this block participates in overlap/travel detection.
    pub fn is_active(&self) -> bool {
        self.status != BlockStatus::Cancelled
    }

    /// Half-open occupied interval `[start, end)`.
    pub fn interval(&self) -> (f64, f64) {
        (self.start_hour, self.end_hour())
    }

    /// Whether two blocks occupy intersecting intervals.
    pub fn overlaps(&self, other: &ScheduleBlock) -> bool {
        self.start_hour < other.end_hour() && other.start_hour < self.end_hour()
    }
}

/// Priority of an unscheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// A job waiting in the backlog: no technician, no scheduled time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogJob {
    pub id: JobId,
    /// Human-facing job number (e.g. "JOB-1042").
    pub display_id: String,
    pub title: String,
    pub client: String,
    pub location: String,
    pub priority: Priority,
    /// Estimated duration in minutes.
    pub estimated_minutes: u32,
}

impl BacklogJob {
    /// Estimated duration in decimal hours.
    pub fn estimated_hours(&self) -> f64 {
        f64::from(self.estimated_minutes) / 60.0
    }
}

/// Kind of a non-job calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Break,
    Meeting,
    Personal,
    Other,
}

/// A non-job calendar entry on a technician's timeline. Excluded from
/// conflict and travel logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub id: String,
    pub technician_id: TechnicianId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
    pub title: String,
}

/// Full in-memory schedule state for one viewed date.
///
/// The store hands out clones of this; the conflict detector and tests
/// consume it as an immutable value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub date: Option<NaiveDate>,
    pub technicians: Vec<Technician>,
    pub blocks: Vec<ScheduleBlock>,
    pub backlog: Vec<BacklogJob>,
    pub events: Vec<ScheduleEvent>,
}

impl DaySnapshot {
    /// Look up a block by id.
    pub fn block(&self, id: &BlockId) -> Option<&ScheduleBlock> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Active blocks for one technician, unsorted.
    pub fn active_blocks_for(&self, tech: &TechnicianId) -> Vec<&ScheduleBlock> {
        self.blocks
            .iter()
            .filter(|b| &b.technician_id == tech && b.is_active())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, tech: &str, start: f64, duration: f64) -> ScheduleBlock {
        ScheduleBlock {
            id: BlockId::new(id),
            job_id: JobId::new(format!("job-{id}")),
            technician_id: TechnicianId::new(tech),
            title: "Water heater".into(),
            client: "Acme".into(),
            location: "12 Main St".into(),
            start_hour: start,
            duration,
            status: BlockStatus::Scheduled,
            conflict: false,
            travel_time_min: None,
        }
    }

    #[test]
    fn test_end_hour() {
        assert_eq!(block("b1", "t1", 9.0, 1.5).end_hour(), 10.5);
    }

    #[test]
    fn test_overlap_detection() {
        let a = block("a", "t1", 9.0, 1.5);
        let b = block("b", "t1", 10.0, 1.0);
        let c = block("c", "t1", 10.5, 1.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Half-open intervals: touching blocks do not overlap.
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_cancelled_block_inactive() {
        let mut b = block("b", "t1", 9.0, 1.0);
        b.status = BlockStatus::Cancelled;
        assert!(!b.is_active());
    }

    #[test]
    fn test_status_underway() {
        assert!(BlockStatus::EnRoute.is_underway());
        assert!(BlockStatus::OnSite.is_underway());
        assert!(BlockStatus::InProgress.is_underway());
        assert!(!BlockStatus::Scheduled.is_underway());
        assert!(!BlockStatus::Complete.is_underway());
    }

    #[test]
    fn test_capacity_ratio() {
        let tech = Technician {
            id: TechnicianId::new("t1"),
            name: "Dana Reyes".into(),
            initials: "DR".into(),
            presence: Presence::Online,
            hours_available: 8.0,
            hours_booked: 6.0,
        };
        assert_eq!(tech.capacity_ratio(), 0.75);
    }

    #[test]
    fn test_capacity_ratio_no_availability() {
        let tech = Technician {
            id: TechnicianId::new("t1"),
            name: "Dana Reyes".into(),
            initials: "DR".into(),
            presence: Presence::Offline,
            hours_available: 0.0,
            hours_booked: 2.0,
        };
        assert_eq!(tech.capacity_ratio(), 0.0);
    }

    #[test]
    fn test_backlog_estimated_hours() {
        let job = BacklogJob {
            id: JobId::new("j1"),
            display_id: "JOB-1042".into(),
            title: "Panel inspection".into(),
            client: "Acme".into(),
            location: "12 Main St".into(),
            priority: Priority::High,
            estimated_minutes: 90,
        };
        assert_eq!(job.estimated_hours(), 1.5);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&BlockStatus::EnRoute).unwrap();
        assert_eq!(json, "\"en_route\"");
    }

    #[test]
    fn test_snapshot_active_blocks_filters_cancelled() {
        let mut cancelled = block("x", "t1", 8.0, 1.0);
        cancelled.status = BlockStatus::Cancelled;
        let snap = DaySnapshot {
            blocks: vec![block("a", "t1", 9.0, 1.0), cancelled, block("b", "t2", 9.0, 1.0)],
            ..Default::default()
        };
        let active = snap.active_blocks_for(&TechnicianId::new("t1"));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.value(), "a");
    }
}
