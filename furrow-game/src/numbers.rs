//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;
use std::time::Duration;

/// Growth stage reached after `turns_grown` of `growth_turns`, spread over `total_stages`.
///
/// Computes `floor(turns_grown / growth_turns * total_stages)` in integer space and
/// clamps the result to the last stage.
#[must_use]
pub fn stage_for_growth(turns_grown: u32, growth_turns: u32, total_stages: usize) -> usize {
    let last = total_stages.saturating_sub(1);
    if growth_turns == 0 {
        return last;
    }
    let stages = cast::<usize, u64>(total_stages).unwrap_or(u64::MAX);
    let scaled = u64::from(turns_grown).saturating_mul(stages) / u64::from(growth_turns);
    cast::<u64, usize>(scaled).unwrap_or(usize::MAX).min(last)
}

/// Convert a configured number of seconds into a `Duration`, returning zero for
/// negative or non-finite input.
#[must_use]
pub fn duration_from_secs(secs: f32) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tracks_floor_of_growth_fraction() {
        assert_eq!(stage_for_growth(0, 3, 4), 0);
        assert_eq!(stage_for_growth(1, 3, 4), 1);
        assert_eq!(stage_for_growth(2, 3, 4), 2);
        assert_eq!(stage_for_growth(3, 3, 4), 3);
        assert_eq!(stage_for_growth(9, 3, 4), 3);
        assert_eq!(stage_for_growth(1, 0, 4), 3);
        assert_eq!(stage_for_growth(1, 5, 1), 0);
    }

    #[test]
    fn duration_rejects_bad_seconds() {
        assert_eq!(duration_from_secs(f32::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(-2.0), Duration::ZERO);
        assert_eq!(duration_from_secs(1.5), Duration::from_millis(1_500));
    }

    #[test]
    fn float_conversions_keep_sign_and_magnitude() {
        assert!((i64_to_f64(-250) + 250.0).abs() < f64::EPSILON);
        assert!(i64_to_f64(0).abs() < f64::EPSILON);
        assert!((usize_to_f64(12) - 12.0).abs() < f64::EPSILON);
    }
}
