//! Timed moves: planning, the interpolation task, and its outcome.
//!
//! A move is a spawned task that walks the position estimate from `from` to
//! `to` in equal time steps. It ends in exactly one of two ways:
//!
//! - it runs every step and forces the estimate to the target
//!   ([`MoveOutcome::Completed`]), or
//! - it is told to stop at one of its sleeps and credits only the elapsed
//!   fraction of travel ([`MoveOutcome::Cancelled`]).
//!
//! Whoever cancels a move awaits the task, so the reconciled position is in
//! place before they read it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::controller::Inner;
use crate::position::{interpolate, is_endpoint, reconcile, Direction};
use crate::traits::{CommandSink, Pulse};

/// Everything a move task needs to know up front.
#[derive(Clone, Debug, PartialEq)]
pub struct MovePlan {
    /// Direction pulse that started the move.
    pub direction: Direction,
    /// Estimate when the move started.
    pub from: f64,
    /// Target position.
    pub to: f64,
    /// Planned travel time.
    pub duration: Duration,
    /// Desired time between position updates.
    pub tick: Duration,
    /// When the motor started.
    pub started: Instant,
    /// Position shown immediately at start, if a bump is configured.
    pub bumped: Option<f64>,
}

impl MovePlan {
    /// Number of position updates, at least one.
    pub fn steps(&self) -> u32 {
        if self.tick.is_zero() {
            return 1;
        }
        let ratio = self.duration.as_secs_f64() / self.tick.as_secs_f64();
        ratio.ceil().clamp(1.0, u32::MAX as f64) as u32
    }

    /// When update `step` of `steps` is due. The last one lands exactly on
    /// the end of the move.
    pub fn deadline(&self, step: u32, steps: u32) -> Instant {
        self.started + self.duration * step / steps
    }

    /// Displayed position after update `step` of `steps`.
    ///
    /// Plain linear interpolation, except that it never shows less progress
    /// than the start-of-move bump.
    pub fn position_at(&self, step: u32, steps: u32) -> f64 {
        let position = interpolate(self.from, self.to, step as f64 / steps as f64);
        match self.bumped {
            Some(bumped) if (self.to - self.from) * (position - bumped) < 0.0 => bumped,
            _ => position,
        }
    }

    /// Position after `elapsed` of travel, for an interrupted move.
    pub fn reconcile(&self, elapsed: Duration) -> f64 {
        reconcile(self.from, self.to, elapsed, self.duration)
    }
}

/// How a move task ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Ran to the end; the estimate is exactly the target.
    Completed {
        /// Final position (the target).
        position: f64,
    },
    /// Interrupted by a stop or a newer move.
    Cancelled {
        /// Reconciled position.
        position: f64,
        /// Travel time credited.
        elapsed: Duration,
    },
}

impl MoveOutcome {
    /// Position the move left the cover at.
    pub fn position(&self) -> f64 {
        match self {
            MoveOutcome::Completed { position } | MoveOutcome::Cancelled { position, .. } => {
                *position
            }
        }
    }
}

/// Result of asking a controller to move.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveResult {
    /// A pulse was sent and a move task is running.
    Started {
        /// Direction of travel.
        direction: Direction,
        /// Reconciled start position.
        from: f64,
        /// Target position.
        to: f64,
        /// Planned travel time.
        duration: Duration,
    },
    /// The cover is already at the target; nothing was sent.
    Unchanged {
        /// Current position.
        position: f64,
    },
}

/// Handle to the one running move task.
pub(crate) struct ActiveMove {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<MoveOutcome>,
}

impl ActiveMove {
    pub(crate) fn spawn<S: CommandSink>(inner: Arc<Inner<S>>, plan: MovePlan) -> Self {
        let (cancel, cancelled) = oneshot::channel();
        let handle = tokio::spawn(run(inner, plan, cancelled));
        Self { cancel, handle }
    }

    /// Signal the task and wait until it has finished its cleanup.
    ///
    /// A task that already completed just hands back its outcome.
    pub(crate) async fn cancel(self) -> Result<MoveOutcome, tokio::task::JoinError> {
        let _ = self.cancel.send(());
        self.handle.await
    }
}

async fn run<S: CommandSink>(
    inner: Arc<Inner<S>>,
    plan: MovePlan,
    mut cancelled: oneshot::Receiver<()>,
) -> MoveOutcome {
    let steps = plan.steps();
    debug!(
        cover = %inner.id,
        steps,
        duration_ms = plan.duration.as_millis() as u64,
        "move task running"
    );

    for step in 1..=steps {
        tokio::select! {
            biased;
            _ = &mut cancelled => return cancel(&inner, &plan),
            _ = time::sleep_until(plan.deadline(step, steps)) => {}
        }
        let position = plan.position_at(step, steps);
        inner.update(|state| state.set_position(position));
    }

    inner.update(|state| state.set_position(plan.to));
    if !is_endpoint(plan.to) {
        if let Err(e) = inner.pulse(Pulse::Stop).await {
            warn!(cover = %inner.id, error = %e, "stop pulse after move failed");
        }
    }
    inner.update(|state| state.halt());

    info!(cover = %inner.id, position = plan.to, "move completed");
    MoveOutcome::Completed { position: plan.to }
}

fn cancel<S: CommandSink>(inner: &Inner<S>, plan: &MovePlan) -> MoveOutcome {
    let elapsed = plan.started.elapsed();
    let position = plan.reconcile(elapsed);
    inner.update(|state| {
        state.set_position(position);
        state.halt();
    });

    info!(
        cover = %inner.id,
        position,
        elapsed_ms = elapsed.as_millis() as u64,
        "move cancelled"
    );
    MoveOutcome::Cancelled { position, elapsed }
}
