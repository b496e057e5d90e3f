//! Cover state: the authoritative estimate and its presentation view.

use serde::{Deserialize, Serialize};

use crate::position::{clamp_position, Direction, CLOSED};

/// Position estimate and motion flags of one cover.
///
/// Owned by the [`MoveController`](crate::controller::MoveController); other
/// code only ever sees [`CoverSnapshot`]s.
///
/// `opening` and `closing` are never both set, and both are clear whenever
/// `moving` is clear.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverState {
    position: f64,
    moving: bool,
    direction: Option<Direction>,
    last_direction: Option<Direction>,
}

impl CoverState {
    /// Stopped cover at `position` (clamped into `[0, 100]`).
    pub fn new(position: f64) -> Self {
        Self {
            position: clamp_position(position),
            moving: false,
            direction: None,
            last_direction: None,
        }
    }

    /// Current estimate.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Overwrite the estimate, clamped into `[0, 100]`.
    pub fn set_position(&mut self, position: f64) {
        self.position = clamp_position(position);
    }

    /// Mark the cover as moving in `direction`.
    pub fn begin(&mut self, direction: Direction) {
        self.moving = true;
        self.direction = Some(direction);
        self.last_direction = Some(direction);
    }

    /// Clear the moving and direction flags.
    pub fn halt(&mut self) {
        self.moving = false;
        self.direction = None;
    }

    /// Whether a move is in progress.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Whether a move towards open is in progress.
    pub fn is_opening(&self) -> bool {
        self.moving && self.direction == Some(Direction::Open)
    }

    /// Whether a move towards closed is in progress.
    pub fn is_closing(&self) -> bool {
        self.moving && self.direction == Some(Direction::Close)
    }

    /// Direction of the most recent move, if any.
    pub fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    /// Presentation view of this state.
    pub fn snapshot(&self) -> CoverSnapshot {
        CoverSnapshot {
            position: self.position.round() as u8,
            exact_position: self.position,
            moving: self.moving,
            opening: self.is_opening(),
            closing: self.is_closing(),
            closed: self.position == CLOSED,
            last_direction: self.last_direction,
        }
    }
}

impl Default for CoverState {
    fn default() -> Self {
        Self::new(CLOSED)
    }
}

/// What the outside world sees of a cover.
///
/// Published after every mutation of the cover state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverSnapshot {
    /// Position rounded to the nearest whole percent.
    pub position: u8,
    /// Unrounded estimate.
    pub exact_position: f64,
    /// Whether a move is in progress.
    pub moving: bool,
    /// Whether the cover is moving towards open.
    pub opening: bool,
    /// Whether the cover is moving towards closed.
    pub closing: bool,
    /// Whether the estimate is exactly fully closed.
    pub closed: bool,
    /// Direction of the most recent move.
    pub last_direction: Option<Direction>,
}

impl CoverSnapshot {
    /// Home Assistant style state: `opening`, `closing`, `closed` or `open`.
    pub fn state_str(&self) -> &'static str {
        if self.opening {
            "opening"
        } else if self.closing {
            "closing"
        } else if self.closed {
            "closed"
        } else {
            "open"
        }
    }
}

impl Default for CoverSnapshot {
    fn default() -> Self {
        CoverState::default().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_clamped_and_stopped() {
        let state = CoverState::new(130.0);
        assert_eq!(state.position(), 100.0);
        assert!(!state.is_moving());
        assert!(state.last_direction().is_none());
    }

    #[test]
    fn flags_follow_direction() {
        let mut state = CoverState::new(10.0);
        state.begin(Direction::Open);
        assert!(state.is_moving());
        assert!(state.is_opening());
        assert!(!state.is_closing());

        state.begin(Direction::Close);
        assert!(state.is_closing());
        assert!(!state.is_opening());

        state.halt();
        assert!(!state.is_moving());
        assert!(!state.is_opening());
        assert!(!state.is_closing());
        assert_eq!(state.last_direction(), Some(Direction::Close));
    }

    #[test]
    fn snapshot_rounds_position() {
        let mut state = CoverState::new(0.0);
        state.set_position(24.6);
        let snap = state.snapshot();
        assert_eq!(snap.position, 25);
        assert_eq!(snap.exact_position, 24.6);
        assert!(!snap.closed);
        assert_eq!(snap.state_str(), "open");
    }

    #[test]
    fn closed_means_exactly_zero() {
        let mut state = CoverState::new(0.0);
        assert!(state.snapshot().closed);
        assert_eq!(state.snapshot().state_str(), "closed");

        // Rounds to 0 but is not closed
        state.set_position(0.3);
        let snap = state.snapshot();
        assert_eq!(snap.position, 0);
        assert!(!snap.closed);
    }

    #[test]
    fn moving_state_strings() {
        let mut state = CoverState::new(50.0);
        state.begin(Direction::Open);
        assert_eq!(state.snapshot().state_str(), "opening");
        state.begin(Direction::Close);
        assert_eq!(state.snapshot().state_str(), "closing");
    }
}
