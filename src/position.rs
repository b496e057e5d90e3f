//! Position arithmetic for time-estimated covers.
//!
//! Positions are percentages: `0.0` is fully closed, `100.0` fully open.
//! Nothing here touches the clock or the transmitter, so every function can
//! be tested directly.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use rf_cover::position::{move_duration, Direction};
//!
//! // A cover that takes 20 s to open fully needs 5 s to go from 0 to 25.
//! let d = move_duration(Direction::Open, 0.0, 25.0, 20.0, 18.0);
//! assert_eq!(d, Duration::from_secs(5));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fully closed.
pub const CLOSED: f64 = 0.0;
/// Fully open.
pub const OPEN: f64 = 100.0;

/// Shortest move ever scheduled.
///
/// Used when a request asks to travel a zero or negative distance in the
/// requested direction.
pub const MIN_MOVE_DURATION: Duration = Duration::from_millis(50);

/// Longest traverse time a cover may be configured with, one day.
pub const MAX_TRAVERSE_SECS: f64 = 86_400.0;

/// Two positions closer than this are the same position.
pub const POSITION_EPSILON: f64 = 1e-6;

/// Direction of cover travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards 100.
    Open,
    /// Towards 0.
    Close,
}

impl Direction {
    /// Lowercase name, which is also the name of the matching pulse.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Open => "open",
            Direction::Close => "close",
        }
    }

    /// Direction needed to get from `from` to `to`.
    ///
    /// Equal positions resolve to [`Direction::Close`]; such a move is a
    /// no-op anyway.
    pub fn towards(from: f64, to: f64) -> Self {
        if to > from {
            Direction::Open
        } else {
            Direction::Close
        }
    }

    /// The endpoint this direction travels to.
    pub const fn endpoint(&self) -> f64 {
        match self {
            Direction::Open => OPEN,
            Direction::Close => CLOSED,
        }
    }
}

/// Clamp into `[0, 100]`. NaN becomes closed.
pub fn clamp_position(position: f64) -> f64 {
    if position.is_nan() {
        CLOSED
    } else {
        position.clamp(CLOSED, OPEN)
    }
}

/// Whether `position` is exactly fully open or fully closed.
pub fn is_endpoint(position: f64) -> bool {
    position == CLOSED || position == OPEN
}

/// Whether two positions are the same for move purposes.
pub fn same_position(a: f64, b: f64) -> bool {
    (a - b).abs() < POSITION_EPSILON
}

/// Signed travel in the given direction.
///
/// Positive for a well-formed request, zero or negative when the target
/// lies behind the cover.
pub fn distance(direction: Direction, from: f64, to: f64) -> f64 {
    match direction {
        Direction::Open => to - from,
        Direction::Close => from - to,
    }
}

/// Time needed to travel from `from` to `to`.
///
/// `distance / 100 * traverse_secs` for the direction's traverse time,
/// never shorter than [`MIN_MOVE_DURATION`] and never longer than
/// [`MAX_TRAVERSE_SECS`].
pub fn move_duration(
    direction: Direction,
    from: f64,
    to: f64,
    open_traverse_secs: f64,
    close_traverse_secs: f64,
) -> Duration {
    let traverse = match direction {
        Direction::Open => open_traverse_secs,
        Direction::Close => close_traverse_secs,
    };
    let secs = distance(direction, from, to) / 100.0 * traverse;
    if !secs.is_finite() || secs <= 0.0 {
        return MIN_MOVE_DURATION;
    }
    Duration::try_from_secs_f64(secs.min(MAX_TRAVERSE_SECS))
        .map_or(MIN_MOVE_DURATION, |d| d.max(MIN_MOVE_DURATION))
}

/// Linear interpolation between `from` and `to`, clamped into `[0, 100]`.
///
/// `progress` is clamped into `[0, 1]`.
pub fn interpolate(from: f64, to: f64, progress: f64) -> f64 {
    let progress = progress.clamp(0.0, 1.0);
    clamp_position(from + (to - from) * progress)
}

/// Position after `elapsed` of a move that was planned to take `total`.
///
/// Credits only the fraction of travel actually elapsed:
/// `from + (to - from) * min(1, elapsed / total)`.
pub fn reconcile(from: f64, to: f64, elapsed: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return clamp_position(to);
    }
    let progress = (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0);
    interpolate(from, to, progress)
}

/// A position as it was saved by whatever persists cover state.
///
/// Saved attributes are loosely typed; all of these forms are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedPosition {
    /// Whole number, e.g. `40`.
    Integer(i64),
    /// Fractional number, e.g. `40.7`.
    Float(f64),
    /// Text, e.g. `"40"`.
    Text(String),
}

/// Starting position from a persisted value.
///
/// Integers are clamped, floats truncated then clamped, text must hold an
/// integer. Anything else, or nothing, starts the cover closed.
///
/// ```rust
/// use rf_cover::position::{restore_position, PersistedPosition};
///
/// assert_eq!(restore_position(Some(&PersistedPosition::Integer(140))), 100.0);
/// assert_eq!(restore_position(Some(&PersistedPosition::Text("42".into()))), 42.0);
/// assert_eq!(restore_position(Some(&PersistedPosition::Text("half".into()))), 0.0);
/// assert_eq!(restore_position(None), 0.0);
/// ```
pub fn restore_position(persisted: Option<&PersistedPosition>) -> f64 {
    let whole = match persisted {
        None => return CLOSED,
        Some(PersistedPosition::Integer(value)) => *value,
        Some(PersistedPosition::Float(value)) if value.is_finite() => value.trunc() as i64,
        Some(PersistedPosition::Float(_)) => return CLOSED,
        Some(PersistedPosition::Text(text)) => match text.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => return CLOSED,
        },
    };
    whole.clamp(0, 100) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn direction_towards_target() {
        assert_eq!(Direction::towards(40.0, 70.0), Direction::Open);
        assert_eq!(Direction::towards(60.0, 20.0), Direction::Close);
        assert_eq!(Direction::towards(50.0, 50.0), Direction::Close);
    }

    #[test]
    fn direction_names_match_pulses() {
        assert_eq!(Direction::Open.as_str(), "open");
        assert_eq!(Direction::Close.as_str(), "close");
        assert_eq!(Direction::Open.endpoint(), 100.0);
        assert_eq!(Direction::Close.endpoint(), 0.0);
    }

    #[rstest]
    #[case(Direction::Open, 0.0, 100.0, 20.0)]
    #[case(Direction::Open, 40.0, 70.0, 6.0)]
    #[case(Direction::Close, 100.0, 0.0, 18.0)]
    #[case(Direction::Close, 60.0, 20.0, 7.2)]
    fn duration_uses_direction_traverse_time(
        #[case] direction: Direction,
        #[case] from: f64,
        #[case] to: f64,
        #[case] expected_secs: f64,
    ) {
        let d = move_duration(direction, from, to, 20.0, 18.0);
        assert!((d.as_secs_f64() - expected_secs).abs() < 1e-6);
    }

    #[test]
    fn negative_distance_gets_minimum_duration() {
        // Opening towards a lower target is malformed
        let d = move_duration(Direction::Open, 70.0, 30.0, 20.0, 20.0);
        assert_eq!(d, MIN_MOVE_DURATION);

        let d = move_duration(Direction::Close, 50.0, 50.0, 20.0, 20.0);
        assert_eq!(d, MIN_MOVE_DURATION);
    }

    #[rstest]
    #[case(1e20)]
    #[case(f64::MAX)]
    #[case(MAX_TRAVERSE_SECS * 2.0)]
    fn huge_traverse_is_capped(#[case] traverse: f64) {
        let d = move_duration(Direction::Open, 0.0, 100.0, traverse, 20.0);
        assert_eq!(d, Duration::from_secs_f64(MAX_TRAVERSE_SECS));

        let d = move_duration(Direction::Close, 100.0, 0.0, 20.0, f64::INFINITY);
        assert_eq!(d, MIN_MOVE_DURATION);
    }

    #[test]
    fn interpolate_is_linear_and_clamped() {
        assert_eq!(interpolate(0.0, 100.0, 0.25), 25.0);
        assert_eq!(interpolate(80.0, 20.0, 0.5), 50.0);
        assert_eq!(interpolate(0.0, 100.0, 1.5), 100.0);
        assert_eq!(interpolate(0.0, 100.0, -1.0), 0.0);
    }

    #[test]
    fn reconcile_credits_elapsed_fraction_only() {
        let total = Duration::from_secs(20);
        assert_eq!(reconcile(0.0, 100.0, Duration::from_secs(5), total), 25.0);
        assert_eq!(reconcile(60.0, 20.0, Duration::from_secs(10), total), 40.0);
        // Never beyond the target, even if the task was late to notice
        assert_eq!(reconcile(0.0, 100.0, Duration::from_secs(30), total), 100.0);
        assert_eq!(reconcile(0.0, 50.0, Duration::ZERO, Duration::ZERO), 50.0);
    }

    #[test]
    fn endpoints() {
        assert!(is_endpoint(0.0));
        assert!(is_endpoint(100.0));
        assert!(!is_endpoint(0.5));
        assert!(!is_endpoint(99.999));
    }

    #[test]
    fn clamp_handles_nan() {
        assert_eq!(clamp_position(f64::NAN), 0.0);
        assert_eq!(clamp_position(-3.0), 0.0);
        assert_eq!(clamp_position(250.0), 100.0);
    }

    #[rstest]
    #[case(Some(PersistedPosition::Integer(57)), 57.0)]
    #[case(Some(PersistedPosition::Integer(-5)), 0.0)]
    #[case(Some(PersistedPosition::Float(57.9)), 57.0)]
    #[case(Some(PersistedPosition::Float(f64::INFINITY)), 0.0)]
    #[case(Some(PersistedPosition::Text(" 33 ".into())), 33.0)]
    #[case(Some(PersistedPosition::Text("33.5".into())), 0.0)]
    #[case(Some(PersistedPosition::Text("unknown".into())), 0.0)]
    #[case(None, 0.0)]
    fn restore_from_persisted(#[case] persisted: Option<PersistedPosition>, #[case] expected: f64) {
        assert_eq!(restore_position(persisted.as_ref()), expected);
    }

    #[test]
    fn persisted_position_deserializes_any_form() {
        let v: PersistedPosition = serde_json::from_str("40").unwrap();
        assert_eq!(v, PersistedPosition::Integer(40));
        let v: PersistedPosition = serde_json::from_str("40.5").unwrap();
        assert_eq!(v, PersistedPosition::Float(40.5));
        let v: PersistedPosition = serde_json::from_str("\"40\"").unwrap();
        assert_eq!(v, PersistedPosition::Text("40".into()));
    }
}
