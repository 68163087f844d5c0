//! Time/position mapping for the dispatch timeline grid.
//!
//! Pure, stateless conversions between decimal hours and one-dimensional
//! board coordinates, plus snapping and drop-target resolution. Each
//! technician occupies one row of `row_height` units; each hour occupies
//! `hour_width` units starting at `day_start`.

use serde::{Deserialize, Serialize};

use crate::config::DispatchConfig;

/// Resolved landing spot for a drag, in grid terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropTarget {
    /// Row index into the technician list.
    pub technician_index: usize,
    /// Snapped start hour within the day window.
    pub hour: f64,
}

/// Geometry of the timeline grid.
#[derive(Debug, Clone, Copy)]
pub struct GridGeometry {
    /// Horizontal units per hour.
    pub hour_width: f64,
    /// Vertical units per technician row.
    pub row_height: f64,
    /// First visible hour.
    pub day_start: f64,
    /// Last visible hour.
    pub day_end: f64,
    /// Snapping granularity in decimal hours.
    pub granularity: f64,
}

impl GridGeometry {
    /// Build a geometry from the board configuration and the host's pixel
    /// metrics.
    pub fn new(config: &DispatchConfig, hour_width: f64, row_height: f64) -> Self {
        Self {
            hour_width,
            row_height,
            day_start: config.day_start,
            day_end: config.day_end,
            granularity: config.granularity,
        }
    }

    /// Linear map from a decimal hour to a horizontal coordinate.
    pub fn hour_to_position(&self, hour: f64) -> f64 {
        (hour - self.day_start) * self.hour_width
    }

    /// Inverse of [`Self::hour_to_position`].
    pub fn position_to_hour(&self, pos: f64) -> f64 {
        pos / self.hour_width + self.day_start
    }

    /// Round to the nearest multiple of the granularity. Idempotent.
    pub fn snap_to_grid(&self, hour: f64) -> f64 {
        (hour / self.granularity).round() * self.granularity
    }

    /// Latest hour at which a minimum-length block can still start.
    pub fn last_start_hour(&self) -> f64 {
        self.day_end - self.granularity
    }

    /// Resolve a raw pointer position into a grid target.
    ///
    /// `pointer` and `scroll` are `(x, y)` in the host's coordinate space,
    /// relative to the top-left of the resource area. Returns `None` when
    /// the pointer falls outside the technician rows; the hour is clamped
    /// into `[day_start, day_end - granularity]`.
    pub fn resolve_drop_target(
        &self,
        pointer: (f64, f64),
        scroll: (f64, f64),
        technician_count: usize,
    ) -> Option<DropTarget> {
        if technician_count == 0 {
            return None;
        }
        let x = pointer.0 + scroll.0;
        let y = pointer.1 + scroll.1;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let row = (y / self.row_height).floor() as usize;
        if row >= technician_count {
            return None;
        }
        let hour = self
            .snap_to_grid(self.position_to_hour(x))
            .clamp(self.day_start, self.last_start_hour());
        Some(DropTarget {
            technician_index: row,
            hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> GridGeometry {
        GridGeometry::new(&DispatchConfig::default(), 100.0, 64.0)
    }

    #[test]
    fn test_hour_to_position_origin() {
        let g = geometry();
        assert_eq!(g.hour_to_position(6.0), 0.0);
        assert_eq!(g.hour_to_position(9.5), 350.0);
    }

    #[test]
    fn test_position_hour_roundtrip() {
        let g = geometry();
        for hour in [6.0, 7.25, 12.5, 18.75] {
            let pos = g.hour_to_position(hour);
            assert!((g.position_to_hour(pos) - hour).abs() < 1e-9);
        }
    }

    #[test]
    fn test_snap_to_quarter_hour() {
        let g = geometry();
        assert_eq!(g.snap_to_grid(9.13), 9.25);
        assert_eq!(g.snap_to_grid(9.12), 9.0);
        assert_eq!(g.snap_to_grid(10.38), 10.5);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let g = geometry();
        for hour in [6.07, 9.13, 11.99, 18.4] {
            let once = g.snap_to_grid(hour);
            assert_eq!(g.snap_to_grid(once), once);
        }
    }

    #[test]
    fn test_resolve_drop_target_basic() {
        let g = geometry();
        // Row 1, pointer at 3.13 hours past day start.
        let target = g
            .resolve_drop_target((313.0, 70.0), (0.0, 0.0), 4)
            .unwrap();
        assert_eq!(target.technician_index, 1);
        assert_eq!(target.hour, 9.25);
    }

    #[test]
    fn test_resolve_drop_target_applies_scroll() {
        let g = geometry();
        let target = g
            .resolve_drop_target((13.0, 6.0), (300.0, 128.0), 4)
            .unwrap();
        assert_eq!(target.technician_index, 2);
        assert_eq!(target.hour, 9.25);
    }

    #[test]
    fn test_resolve_drop_target_clamps_hour() {
        let g = geometry();
        // Far right of the board, beyond 19:00.
        let target = g
            .resolve_drop_target((5000.0, 10.0), (0.0, 0.0), 2)
            .unwrap();
        assert_eq!(target.hour, 18.75);
    }

    #[test]
    fn test_resolve_drop_target_outside_rows() {
        let g = geometry();
        assert!(g.resolve_drop_target((100.0, 64.0 * 5.0), (0.0, 0.0), 4).is_none());
        assert!(g.resolve_drop_target((100.0, -10.0), (0.0, 0.0), 4).is_none());
        assert!(g.resolve_drop_target((-500.0, 10.0), (0.0, 0.0), 4).is_none());
    }

    #[test]
    fn test_resolve_drop_target_no_technicians() {
        let g = geometry();
        assert!(g.resolve_drop_target((100.0, 10.0), (0.0, 0.0), 0).is_none());
    }
}
