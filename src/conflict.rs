//! Derived conflict signals over a schedule snapshot.
//!
//! Three independent signals, all recomputed on demand from an immutable
//! snapshot plus the current instant, with no cache kept:
//!
//! - **Overlap**: two active blocks for the same technician occupy
//!   intersecting intervals; both are flagged.
//! - **Cascading delay**: an upstream block is running past its planned end
//!   while still underway, threatening downstream `Scheduled` blocks.
//! - **Travel warning**: the gap before a block is shorter than its declared
//!   travel time.
//!
//! Non-job calendar events never participate.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{BlockId, BlockStatus, DaySnapshot, ScheduleBlock, TechnicianId};

/// A block whose lead-in gap is shorter than its declared travel time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelWarning {
    pub block_id: BlockId,
    /// Minutes of travel the block declares.
    pub required_min: u32,
    /// Minutes actually available before its start. Negative when the
    /// preceding block has not even ended.
    pub available_min: f64,
}

/// All derived conflict signals for one snapshot at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Blocks participating in at least one overlap.
    pub overlapping: HashSet<BlockId>,
    /// `Scheduled` blocks threatened by an overrunning upstream block.
    pub delayed: HashSet<BlockId>,
    /// Travel-time warnings, distinct from overlap conflicts.
    pub travel: Vec<TravelWarning>,
}

impl ConflictReport {
    pub fn is_clean(&self) -> bool {
        self.overlapping.is_empty() && self.delayed.is_empty() && self.travel.is_empty()
    }
}

/// Compute every conflict signal for the snapshot at `now_hour` (decimal
/// hours within the viewed day).
pub fn detect(snapshot: &DaySnapshot, now_hour: f64) -> ConflictReport {
    let by_tech = blocks_by_technician(snapshot);
    let mut report = ConflictReport::default();

    for blocks in by_tech.values() {
        collect_overlaps(blocks, &mut report.overlapping);
        collect_delays(blocks, now_hour, &mut report.delayed);
        collect_travel_warnings(blocks, &mut report.travel);
    }
    report
}

/// Run [`detect`] and write the overlap result back into the blocks'
/// derived `conflict` flags.
pub fn annotate(snapshot: &mut DaySnapshot, now_hour: f64) -> ConflictReport {
    let report = detect(snapshot, now_hour);
    for block in &mut snapshot.blocks {
        block.conflict = report.overlapping.contains(&block.id);
    }
    report
}

/// Active blocks per technician, sorted by start hour.
fn blocks_by_technician(snapshot: &DaySnapshot) -> HashMap<&TechnicianId, Vec<&ScheduleBlock>> {
    let mut by_tech: HashMap<&TechnicianId, Vec<&ScheduleBlock>> = HashMap::new();
    for block in snapshot.blocks.iter().filter(|b| b.is_active()) {
        by_tech.entry(&block.technician_id).or_default().push(block);
    }
    for blocks in by_tech.values_mut() {
        blocks.sort_by(|a, b| a.start_hour.total_cmp(&b.start_hour));
    }
    by_tech
}

fn collect_overlaps(blocks: &[&ScheduleBlock], out: &mut HashSet<BlockId>) {
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            if a.overlaps(b) {
                out.insert(a.id.clone());
                out.insert(b.id.clone());
            }
        }
    }
}

fn collect_delays(blocks: &[&ScheduleBlock], now_hour: f64, out: &mut HashSet<BlockId>) {
    for (i, b) in blocks.iter().enumerate() {
        if b.status != BlockStatus::Scheduled {
            continue;
        }
        let threatened = blocks[..i]
            .iter()
            .any(|a| a.status.is_underway() && a.end_hour() < now_hour);
        if threatened {
            out.insert(b.id.clone());
        }
    }
}

fn collect_travel_warnings(blocks: &[&ScheduleBlock], out: &mut Vec<TravelWarning>) {
    for (i, b) in blocks.iter().enumerate() {
        let Some(required_min) = b.travel_time_min else {
            continue;
        };
        // Only the immediately preceding block matters for arrival.
        let Some(prev) = blocks[..i].last() else {
            continue;
        };
        let available_min = (b.start_hour - prev.end_hour()) * 60.0;
        if available_min < f64::from(required_min) {
            out.push(TravelWarning {
                block_id: b.id.clone(),
                required_min,
                available_min,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobId, TechnicianId};

    fn block(id: &str, tech: &str, start: f64, duration: f64) -> ScheduleBlock {
        ScheduleBlock {
            id: BlockId::new(id),
            job_id: JobId::new(format!("job-{id}")),
            technician_id: TechnicianId::new(tech),
            title: "Drain cleanout".into(),
            client: "Acme".into(),
            location: "12 Main St".into(),
            start_hour: start,
            duration,
            status: BlockStatus::Scheduled,
            conflict: false,
            travel_time_min: None,
        }
    }

    fn snapshot(blocks: Vec<ScheduleBlock>) -> DaySnapshot {
        DaySnapshot {
            blocks,
            ..Default::default()
        }
    }

    #[test]
    fn test_overlapping_pair_both_flagged() {
        let snap = snapshot(vec![
            block("a", "t1", 9.0, 1.5),
            block("b", "t1", 10.0, 1.0),
        ]);
        let report = detect(&snap, 8.0);
        assert!(report.overlapping.contains(&BlockId::new("a")));
        assert!(report.overlapping.contains(&BlockId::new("b")));
    }

    #[test]
    fn test_touching_blocks_do_not_overlap() {
        let snap = snapshot(vec![
            block("a", "t1", 9.0, 1.0),
            block("b", "t1", 10.0, 1.0),
        ]);
        assert!(detect(&snap, 8.0).overlapping.is_empty());
    }

    #[test]
    fn test_overlap_only_within_same_technician() {
        let snap = snapshot(vec![
            block("a", "t1", 9.0, 2.0),
            block("b", "t2", 9.5, 2.0),
        ]);
        assert!(detect(&snap, 8.0).overlapping.is_empty());
    }

    #[test]
    fn test_cancelled_blocks_excluded_from_overlap() {
        let mut cancelled = block("a", "t1", 9.0, 2.0);
        cancelled.status = BlockStatus::Cancelled;
        let snap = snapshot(vec![cancelled, block("b", "t1", 9.5, 1.0)]);
        assert!(detect(&snap, 8.0).overlapping.is_empty());
    }

    #[test]
    fn test_nonadjacent_overlap_detected() {
        // A long first block swallowing a later, non-adjacent one.
        let snap = snapshot(vec![
            block("a", "t1", 8.0, 5.0),
            block("b", "t1", 9.0, 0.5),
            block("c", "t1", 12.0, 1.0),
        ]);
        let report = detect(&snap, 6.0);
        assert!(report.overlapping.contains(&BlockId::new("a")));
        assert!(report.overlapping.contains(&BlockId::new("b")));
        assert!(report.overlapping.contains(&BlockId::new("c")));
    }

    #[test]
    fn test_annotate_sets_conflict_flags() {
        let mut snap = snapshot(vec![
            block("a", "t1", 9.0, 1.5),
            block("b", "t1", 10.0, 1.0),
            block("c", "t1", 13.0, 1.0),
        ]);
        annotate(&mut snap, 8.0);
        assert!(snap.block(&BlockId::new("a")).unwrap().conflict);
        assert!(snap.block(&BlockId::new("b")).unwrap().conflict);
        assert!(!snap.block(&BlockId::new("c")).unwrap().conflict);
    }

    #[test]
    fn test_annotate_clears_stale_flags() {
        let mut stale = block("a", "t1", 9.0, 1.0);
        stale.conflict = true;
        let mut snap = snapshot(vec![stale]);
        annotate(&mut snap, 8.0);
        assert!(!snap.block(&BlockId::new("a")).unwrap().conflict);
    }

    #[test]
    fn test_cascading_delay_scenario() {
        // A at [9:00–10:30] in progress, now 10:45, B at [10:00–11:00]
        // scheduled for the same technician: B is threatened.
        let mut a = block("a", "t1", 9.0, 1.5);
        a.status = BlockStatus::InProgress;
        let b = block("b", "t1", 10.0, 1.0);
        let report = detect(&snapshot(vec![a, b]), 10.75);
        assert!(report.delayed.contains(&BlockId::new("b")));
    }

    #[test]
    fn test_no_delay_before_upstream_end() {
        let mut a = block("a", "t1", 9.0, 1.5);
        a.status = BlockStatus::InProgress;
        let b = block("b", "t1", 10.0, 1.0);
        // At 10:15 A still has time.
        let report = detect(&snapshot(vec![a, b]), 10.25);
        assert!(report.delayed.is_empty());
    }

    #[test]
    fn test_no_delay_from_completed_upstream() {
        let mut a = block("a", "t1", 9.0, 1.0);
        a.status = BlockStatus::Complete;
        let b = block("b", "t1", 10.0, 1.0);
        let report = detect(&snapshot(vec![a, b]), 12.0);
        assert!(report.delayed.is_empty());
    }

    #[test]
    fn test_delay_from_en_route_upstream() {
        let mut a = block("a", "t1", 8.0, 1.0);
        a.status = BlockStatus::EnRoute;
        let b = block("b", "t1", 11.0, 1.0);
        let report = detect(&snapshot(vec![a, b]), 10.0);
        assert!(report.delayed.contains(&BlockId::new("b")));
    }

    #[test]
    fn test_travel_warning_when_gap_too_short() {
        let a = block("a", "t1", 9.0, 1.0);
        let mut b = block("b", "t1", 10.25, 1.0);
        b.travel_time_min = Some(30);
        let report = detect(&snapshot(vec![a, b]), 8.0);
        assert_eq!(report.travel.len(), 1);
        assert_eq!(report.travel[0].block_id.value(), "b");
        assert_eq!(report.travel[0].required_min, 30);
        assert!((report.travel[0].available_min - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_travel_warning_with_enough_gap() {
        let a = block("a", "t1", 9.0, 1.0);
        let mut b = block("b", "t1", 11.0, 1.0);
        b.travel_time_min = Some(30);
        assert!(detect(&snapshot(vec![a, b]), 8.0).travel.is_empty());
    }

    #[test]
    fn test_no_travel_warning_without_predecessor() {
        let mut a = block("a", "t1", 9.0, 1.0);
        a.travel_time_min = Some(45);
        assert!(detect(&snapshot(vec![a]), 8.0).travel.is_empty());
    }

    #[test]
    fn test_travel_distinct_from_overlap() {
        let a = block("a", "t1", 9.0, 1.5);
        let mut b = block("b", "t1", 10.75, 1.0);
        b.travel_time_min = Some(30);
        let report = detect(&snapshot(vec![a, b]), 8.0);
        // Gap is 15 min < 30: travel warning, but no interval overlap.
        assert!(report.overlapping.is_empty());
        assert_eq!(report.travel.len(), 1);
    }
}
