//! Coalescing of bursty position requests.
//!
//! A slider drag produces a stream of `set position` calls. Moving the cover
//! for each of them would send a pulse per call and fight the motor, so the
//! debouncer holds the latest request back until a quiet window has passed
//! without a newer one.
//!
//! Each request gets a token from a monotonically increasing counter. When a
//! request's timer fires it only acts if its token is still the latest one
//! issued; anything older is discarded silently. Issuing a token and
//! installing its request happen under one lock, as do the staleness check
//! and the commit in the timer task.
//!
//! Dropping the debouncer drops any request still waiting out its window.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, warn};

use crate::controller::MoveController;
use crate::position::clamp_position;
use crate::traits::CommandSink;

/// A request that is waiting out its quiet window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingRequest {
    /// Token the request was issued with.
    pub token: u64,
    /// Requested position.
    pub target: f64,
    /// When the request arrived.
    pub issued_at: Instant,
}

struct Pending {
    request: PendingRequest,
    fired: bool,
    // Dropping the sender wakes the timer task, which then exits.
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    latest: u64,
    pending: Option<Pending>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
}

impl Shared {
    fn with_slot<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut slot)
    }

    fn take_pending(&self) -> Option<Pending> {
        self.with_slot(|slot| slot.pending.take())
    }
}

/// Debounces `set position` requests for one cover.
pub struct RequestDebouncer<S: CommandSink> {
    controller: MoveController<S>,
    window: Duration,
    shared: Arc<Shared>,
}

impl<S: CommandSink> RequestDebouncer<S> {
    /// Debouncer that commits requests to `controller` after `window` of quiet.
    pub fn new(controller: MoveController<S>, window: Duration) -> Self {
        Self {
            controller,
            window,
            shared: Arc::new(Shared::default()),
        }
    }

    /// The quiet window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `target`, replacing any earlier pending one.
    ///
    /// Returns the request's token. Must be called inside a tokio runtime.
    pub fn request_position(&self, target: f64) -> u64 {
        let target = clamp_position(target);
        let issued_at = Instant::now();

        let (token, previous) = self.shared.with_slot(|slot| {
            slot.latest += 1;
            let request = PendingRequest {
                token: slot.latest,
                target,
                issued_at,
            };
            let (cancel, cancelled) = oneshot::channel();
            let handle = tokio::spawn(fire(
                self.controller.clone(),
                Arc::clone(&self.shared),
                request,
                self.window,
                cancelled,
            ));
            let previous = slot.pending.replace(Pending {
                request,
                fired: false,
                cancel,
                handle,
            });
            (request.token, previous)
        });
        if let Some(previous) = previous.filter(|p| !p.fired) {
            debug!(
                cover = self.controller.id(),
                superseded = previous.request.token,
                token,
                requested = target,
                "position request superseded"
            );
        }
        token
    }

    /// The request still waiting to fire, if any.
    pub fn pending(&self) -> Option<PendingRequest> {
        self.shared.with_slot(|slot| {
            slot.pending
                .as_ref()
                .filter(|p| !p.fired)
                .map(|p| p.request)
        })
    }

    /// Drop any pending request.
    ///
    /// If its timer already fired, waits until the resulting move has been
    /// handed to the controller.
    pub async fn cancel(&self) {
        let Some(pending) = self.shared.take_pending() else {
            return;
        };
        let Pending {
            request,
            fired,
            cancel,
            handle,
        } = pending;
        drop(cancel);
        if !fired {
            debug!(cover = self.controller.id(), token = request.token, "position request cancelled");
        }
        if let Err(e) = handle.await {
            warn!(cover = self.controller.id(), error = %e, "debounce task failed");
        }
    }
}

impl<S: CommandSink> Drop for RequestDebouncer<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.shared.take_pending().filter(|p| !p.fired) {
            debug!(
                cover = self.controller.id(),
                token = pending.request.token,
                "position request dropped with debouncer"
            );
        }
    }
}

async fn fire<S: CommandSink>(
    controller: MoveController<S>,
    shared: Arc<Shared>,
    request: PendingRequest,
    window: Duration,
    mut cancelled: oneshot::Receiver<()>,
) {
    tokio::select! {
        biased;
        _ = &mut cancelled => return,
        _ = time::sleep_until(request.issued_at + window) => {}
    }

    let committed = shared.with_slot(|slot| {
        let latest = slot.latest;
        match slot.pending.as_mut() {
            Some(p) if p.request.token == request.token && latest == request.token && !p.fired => {
                p.fired = true;
                true
            }
            _ => false,
        }
    });
    if !committed {
        debug!(cover = controller.id(), token = request.token, "stale position request dropped");
        return;
    }

    debug!(
        cover = controller.id(),
        token = request.token,
        requested = request.target,
        direction = controller.direction_towards(request.target).as_str(),
        "position request committed"
    );
    if let Err(e) = controller.move_to_position(request.target).await {
        warn!(cover = controller.id(), requested = request.target, error = %e, "debounced move failed");
    }
}
