//! The move controller: one cover, one transmitter, one running move at most.
//!
//! `MoveController` owns the position estimate of a cover that reports
//! nothing back. It turns open/close/stop requests into pulses and runs a
//! timed task that advances the estimate while the motor is believed to be
//! running.
//!
//! # Serialization
//!
//! Every operation takes the move slot (an async mutex) for its whole
//! duration: cancel the running move, wait for it to reconcile, send the
//! pulse, start the next move. Two requests therefore never interleave, and
//! the transmitter never sees two pulses at once.
//!
//! The estimate itself sits behind a plain mutex that is only held for the
//! length of a single update. Each update publishes a fresh
//! [`CoverSnapshot`] on a watch channel.
//!
//! # Teardown
//!
//! The move slot belongs to the controller handles, not to the move task.
//! When the last handle is dropped the running move is cancelled the same
//! way [`MoveController::shutdown`] cancels it: the estimate is reconciled
//! and no pulse is sent.
//!
//! # Example
//!
//! ```rust
//! use rf_cover::{CommandKeys, CoverConfig, MoveController};
//! use rf_cover::hal::MockTransmitter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = CoverConfig::new("Office")
//!     .with_commands(CommandKeys::for_device("office_blind"))
//!     .with_traverse_secs(20.0, 20.0);
//! let tx = MockTransmitter::new();
//! let controller = MoveController::new(&config, tx.clone()).unwrap();
//!
//! controller.move_to_position(40.0).await.unwrap();
//! assert!(controller.is_moving());
//! controller.shutdown().await;
//! assert_eq!(tx.commands(), vec!["open"]);
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{CommandKeys, CoverConfig};
use crate::error::CoverError;
use crate::motion::{ActiveMove, MoveOutcome, MovePlan, MoveResult};
use crate::position::{
    clamp_position, is_endpoint, move_duration, restore_position, same_position, Direction,
    CLOSED, OPEN,
};
use crate::state::{CoverSnapshot, CoverState};
use crate::traits::{CommandSink, Pulse};

// ============================================================================
// Shared Inner State
// ============================================================================

/// State shared between the controller handles and the running move task.
///
/// Holds no move slot, so a running task never keeps its own controller
/// alive.
pub(crate) struct Inner<S> {
    pub(crate) id: String,
    keys: CommandKeys,
    open_time_secs: f64,
    close_time_secs: f64,
    tick: Duration,
    bump: f64,
    sink: S,
    state: Mutex<CoverState>,
    events: watch::Sender<CoverSnapshot>,
}

impl<S: CommandSink> Inner<S> {
    /// Mutate the state and publish the result.
    ///
    /// The snapshot is sent while the lock is held, so subscribers see
    /// updates in the order they were made.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut CoverState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state);
        self.events.send_replace(state.snapshot());
        result
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&CoverState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Send one pulse.
    ///
    /// A pulse whose key is not configured is skipped with a warning and
    /// counts as sent.
    pub(crate) async fn pulse(&self, pulse: Pulse) -> Result<(), CoverError> {
        let (device, command) = match self.keys.resolve(pulse) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(cover = %self.id, error = %e, "pulse skipped");
                return Ok(());
            }
        };
        debug!(cover = %self.id, device, command, "sending pulse");
        self.sink.send_command(device, command).await?;
        Ok(())
    }

    /// Cancel whatever move is in the slot and wait for it to settle.
    async fn settle(&self, active: &mut Option<ActiveMove>) -> Option<MoveOutcome> {
        let running = active.take()?;
        match running.cancel().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(cover = %self.id, error = %e, "move task failed");
                self.update(|state| state.halt());
                None
            }
        }
    }

    fn bumped_start(&self, from: f64, to: f64) -> Option<f64> {
        if self.bump <= 0.0 {
            return None;
        }
        let nudge = self.bump.min((to - from).abs());
        Some(clamp_position(from + nudge.copysign(to - from)))
    }
}

// ============================================================================
// Move Controller
// ============================================================================

/// Drives one cover through a [`CommandSink`].
///
/// Cheap to clone; all clones drive the same cover. Dropping the last clone
/// cancels the running move without a pulse.
pub struct MoveController<S: CommandSink> {
    inner: Arc<Inner<S>>,
    active: Arc<AsyncMutex<Option<ActiveMove>>>,
}

impl<S: CommandSink> Clone for MoveController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            active: Arc::clone(&self.active),
        }
    }
}

impl<S: CommandSink> MoveController<S> {
    /// Create a stopped controller.
    ///
    /// The starting position comes from `config.initial_position`, or
    /// fully closed when there is none.
    pub fn new(config: &CoverConfig, sink: S) -> Result<Self, CoverError> {
        config.validate()?;
        let state = CoverState::new(restore_position(config.initial_position.as_ref()));
        let (events, _) = watch::channel(state.snapshot());

        Ok(Self {
            inner: Arc::new(Inner {
                id: config.id.clone(),
                keys: config.commands.clone(),
                open_time_secs: config.open_time_secs,
                close_time_secs: config.close_time_secs,
                tick: config.tick_interval(),
                bump: config.bump,
                sink,
                state: Mutex::new(state),
                events,
            }),
            active: Arc::new(AsyncMutex::new(None)),
        })
    }

    /// Id of the cover this controller drives.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Current presentation view.
    pub fn snapshot(&self) -> CoverSnapshot {
        self.inner.read(CoverState::snapshot)
    }

    /// Current position estimate.
    pub fn position(&self) -> f64 {
        self.inner.read(CoverState::position)
    }

    /// Whether a move is in progress.
    pub fn is_moving(&self) -> bool {
        self.inner.read(CoverState::is_moving)
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<CoverSnapshot> {
        self.inner.events.subscribe()
    }

    /// Direction a move to `target` would take from the current estimate.
    pub fn direction_towards(&self, target: f64) -> Direction {
        Direction::towards(self.position(), clamp_position(target))
    }

    /// Move to fully open.
    pub async fn open(&self) -> Result<MoveResult, CoverError> {
        self.move_to(Direction::Open, OPEN).await
    }

    /// Move to fully closed.
    pub async fn close(&self) -> Result<MoveResult, CoverError> {
        self.move_to(Direction::Close, CLOSED).await
    }

    /// Move to `target`, picking the direction from the current estimate.
    pub async fn move_to_position(&self, target: f64) -> Result<MoveResult, CoverError> {
        let target = clamp_position(target);
        let mut active = self.active.lock().await;
        self.inner.settle(&mut active).await;
        let direction = self.direction_towards(target);
        self.start(&mut active, direction, target).await
    }

    /// Move to `target` using the `direction` pulse.
    ///
    /// Any running move is cancelled and reconciled first. If the cover is
    /// already at `target` nothing is sent. Otherwise the direction pulse is
    /// sent and, once the transmitter confirms it, a timed move starts.
    ///
    /// A transmitter failure is returned and leaves the cover stopped at its
    /// reconciled position.
    pub async fn move_to(
        &self,
        direction: Direction,
        target: f64,
    ) -> Result<MoveResult, CoverError> {
        let target = clamp_position(target);
        let mut active = self.active.lock().await;
        self.inner.settle(&mut active).await;
        self.start(&mut active, direction, target).await
    }

    async fn start(
        &self,
        active: &mut Option<ActiveMove>,
        direction: Direction,
        target: f64,
    ) -> Result<MoveResult, CoverError> {
        let inner = &self.inner;
        let from = inner.read(CoverState::position);
        if same_position(from, target) {
            debug!(cover = %inner.id, position = from, "already at target");
            return Ok(MoveResult::Unchanged { position: from });
        }

        inner.pulse(direction.into()).await?;

        let duration = move_duration(
            direction,
            from,
            target,
            inner.open_time_secs,
            inner.close_time_secs,
        );
        let plan = MovePlan {
            direction,
            from,
            to: target,
            duration,
            tick: inner.tick,
            started: Instant::now(),
            bumped: inner.bumped_start(from, target),
        };

        inner.update(|state| {
            state.begin(direction);
            if let Some(bumped) = plan.bumped {
                state.set_position(bumped);
            }
        });
        info!(
            cover = %inner.id,
            direction = direction.as_str(),
            from,
            to = target,
            duration_ms = duration.as_millis() as u64,
            "move started"
        );

        *active = Some(ActiveMove::spawn(Arc::clone(inner), plan));
        Ok(MoveResult::Started {
            direction,
            from,
            to: target,
            duration,
        })
    }

    /// Halt the cover.
    ///
    /// Cancels any running move, then sends the stop pulse unless the
    /// estimate sits exactly at an endpoint. Safe to call repeatedly.
    pub async fn stop(&self) -> Result<Option<MoveOutcome>, CoverError> {
        let inner = &self.inner;
        let mut active = self.active.lock().await;
        let outcome = inner.settle(&mut active).await;

        let position = inner.update(|state| {
            state.halt();
            state.position()
        });
        if is_endpoint(position) {
            debug!(cover = %inner.id, position, "at endpoint, no stop pulse");
        } else {
            inner.pulse(Pulse::Stop).await?;
        }

        info!(cover = %inner.id, position, "stopped");
        Ok(outcome)
    }

    /// Cancel any running move without sending a pulse.
    pub async fn shutdown(&self) -> Option<MoveOutcome> {
        let mut active = self.active.lock().await;
        let outcome = self.inner.settle(&mut active).await;
        debug!(cover = %self.inner.id, "controller shut down");
        outcome
    }
}
