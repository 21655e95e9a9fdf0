//! Perceptual volume mapping: a 0–100 control value interpolated linearly
//! in decibels between a range's floor and ceiling.

use serde::{Deserialize, Serialize};

/// Decibel range a 0–100 control spans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    pub min_db: f64,
    pub max_db: f64,
}

impl VolumeRange {
    pub const fn new(min_db: f64, max_db: f64) -> Self {
        VolumeRange { min_db, max_db }
    }
}

/// Control value (clamped to 0..=100) to decibels.
pub fn to_db(control: f64, range: VolumeRange) -> f64 {
    let control = if control.is_nan() { 0.0 } else { control.clamp(0.0, 100.0) };
    range.min_db + (range.max_db - range.min_db) * control / 100.0
}

/// Control value to linear gain.
pub fn to_gain(control: f64, range: VolumeRange) -> f64 {
    db_to_gain(to_db(control, range))
}

/// Inverse of [`to_db`]: the control value that lands on `db`.
pub fn to_control(db: f64, range: VolumeRange) -> f64 {
    ((db - range.min_db) / (range.max_db - range.min_db) * 100.0).clamp(0.0, 100.0)
}

#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: VolumeRange = VolumeRange::new(-40.0, 0.0);

    #[test]
    fn endpoints_hit_the_range() {
        assert_eq!(to_db(0.0, MAIN), -40.0);
        assert_eq!(to_db(100.0, MAIN), 0.0);
        assert!((to_gain(100.0, MAIN) - 1.0).abs() < 1e-12);
        assert!((to_gain(0.0, MAIN) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn mapping_is_monotonic() {
        let mut last = f64::NEG_INFINITY;
        for control in 0..=100 {
            let db = to_db(control as f64, MAIN);
            assert!(db >= last, "control {control} went down to {db}");
            last = db;
        }
    }

    #[test]
    fn out_of_range_controls_clamp() {
        assert_eq!(to_db(-5.0, MAIN), -40.0);
        assert_eq!(to_db(250.0, MAIN), 0.0);
        assert_eq!(to_db(f64::NAN, MAIN), -40.0);
    }

    #[test]
    fn per_sound_range_can_boost() {
        let range = VolumeRange::new(-30.0, 6.0);
        assert_eq!(to_db(100.0, range), 6.0);
        assert!(to_gain(100.0, range) > 1.9);
        assert!((to_db(50.0, range) - (-12.0)).abs() < 1e-12);
    }

    #[test]
    fn control_round_trips_through_db() {
        assert!((to_control(-9.0, MAIN) - 77.5).abs() < 1e-12);
        assert!((to_db(to_control(-9.0, MAIN), MAIN) + 9.0).abs() < 1e-12);
        assert_eq!(to_control(-90.0, MAIN), 0.0);
    }

    #[test]
    fn db_conversion() {
        assert!((db_to_gain(-6.0) - 0.501187).abs() < 1e-5);
        assert_eq!(db_to_gain(0.0), 1.0);
    }
}
