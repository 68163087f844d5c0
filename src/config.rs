//! Dispatch board configuration.
//!
//! Fixed domain constants live here: the visible day window, the working
//! window shown with full opacity, and the minimum placement granularity.
//! Hosts construct a [`DispatchConfig`] once and hand it to the store and
//! geometry layers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DispatchError, DispatchResult};

/// First visible hour of the dispatch day (06:00).
pub const DAY_START_HOUR: f64 = 6.0;
/// Last visible hour of the dispatch day (19:00).
pub const DAY_END_HOUR: f64 = 19.0;
/// Start of the normal working window (07:00).
pub const WORK_START_HOUR: f64 = 7.0;
/// End of the normal working window (17:00).
pub const WORK_END_HOUR: f64 = 17.0;
/// Minimum placement granularity in decimal hours (15 minutes).
pub const SLOT_GRANULARITY_HOURS: f64 = 0.25;

/// Configuration for a dispatch board instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// First visible hour of the day.
    pub day_start: f64,
    /// Last visible hour of the day.
    pub day_end: f64,
    /// Start of the working window.
    pub work_start: f64,
    /// End of the working window.
    pub work_end: f64,
    /// Minimum placement granularity in decimal hours.
    pub granularity: f64,
    /// How long an undo affordance stays live after a mutation.
    #[serde(with = "duration_millis")]
    pub undo_window: Duration,
    /// Realtime events arriving within this window collapse into one reload.
    #[serde(with = "duration_millis")]
    pub coalesce_window: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            day_start: DAY_START_HOUR,
            day_end: DAY_END_HOUR,
            work_start: WORK_START_HOUR,
            work_end: WORK_END_HOUR,
            granularity: SLOT_GRANULARITY_HOURS,
            undo_window: Duration::from_secs(5),
            coalesce_window: Duration::from_millis(250),
        }
    }
}

impl DispatchConfig {
    /// Validate the configuration, returning it on success.
    pub fn validated(self) -> DispatchResult<Self> {
        if self.day_start >= self.day_end {
            return Err(DispatchError::configuration(format!(
                "day window is empty: {} >= {}",
                self.day_start, self.day_end
            )));
        }
        if self.work_start < self.day_start || self.work_end > self.day_end {
            return Err(DispatchError::configuration(
                "working window must lie inside the day window",
            ));
        }
        if self.granularity <= 0.0 {
            return Err(DispatchError::configuration(
                "granularity must be positive",
            ));
        }
        Ok(self)
    }

    /// Number of visible hours in the day window.
    pub fn day_span(&self) -> f64 {
        self.day_end - self.day_start
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_domain_constants() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.day_start, 6.0);
        assert_eq!(cfg.day_end, 19.0);
        assert_eq!(cfg.work_start, 7.0);
        assert_eq!(cfg.work_end, 17.0);
        assert_eq!(cfg.granularity, 0.25);
    }

    #[test]
    fn test_default_validates() {
        assert!(DispatchConfig::default().validated().is_ok());
    }

    #[test]
    fn test_empty_day_window_rejected() {
        let cfg = DispatchConfig {
            day_start: 19.0,
            day_end: 6.0,
            ..Default::default()
        };
        assert!(cfg.validated().is_err());
    }

    #[test]
    fn test_working_window_outside_day_rejected() {
        let cfg = DispatchConfig {
            work_start: 5.0,
            ..Default::default()
        };
        assert!(cfg.validated().is_err());
    }

    #[test]
    fn test_day_span() {
        assert_eq!(DispatchConfig::default().day_span(), 13.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let cfg = DispatchConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: DispatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.day_end, cfg.day_end);
        assert_eq!(back.undo_window, cfg.undo_window);
    }
}
