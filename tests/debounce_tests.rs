//! Debounced position requests through a full cover.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;
use tokio::time::sleep;

use rf_cover::hal::MockTransmitter;
use rf_cover::{CommandKeys, CommandOutcome, Cover, CoverCommand, CoverConfig, Direction, PersistedPosition};

fn cover_at(position: PersistedPosition) -> (Cover<MockTransmitter>, MockTransmitter) {
    let config = CoverConfig::new("Bedroom")
        .with_commands(CommandKeys::for_device("bedroom_blind"))
        .with_traverse_secs(10.0, 10.0)
        .with_debounce_ms(2_500)
        .with_initial_position(position);
    let tx = MockTransmitter::new();
    (Cover::new(&config, tx.clone()).unwrap(), tx)
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_requests_sends_one_pulse() {
    let (cover, tx) = cover_at(PersistedPosition::Text("60".into()));

    for _ in 0..3 {
        let outcome = cover.apply(CoverCommand::SetPosition(20)).await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Scheduled { target: 20, .. }));
        sleep(Duration::from_millis(500)).await;
    }
    // Nothing goes out while requests keep arriving
    assert!(tx.commands().is_empty());
    assert_eq!(cover.snapshot().position, 60);

    // Last request at 1.0 s fires at 3.5 s
    sleep(Duration::from_millis(2_100)).await;
    assert_eq!(tx.commands(), vec!["close"]);
    assert!(cover.snapshot().closing);
    assert_eq!(cover.snapshot().last_direction, Some(Direction::Close));

    // 40 % of the close time
    sleep(Duration::from_millis(4_100)).await;
    assert_eq!(cover.controller().position(), 20.0);
    assert!(!cover.controller().is_moving());
    assert_eq!(tx.commands(), vec!["close", "stop"]);
}

#[tokio::test(start_paused = true)]
async fn last_request_wins() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(0));

    let debouncer = cover.debouncer();
    let first = debouncer.request_position(30.0);
    sleep(Duration::from_millis(200)).await;
    debouncer.request_position(80.0);
    sleep(Duration::from_millis(200)).await;
    let last = debouncer.request_position(55.0);
    assert!(last > first);
    assert_eq!(debouncer.pending().map(|p| p.target), Some(55.0));

    sleep(Duration::from_secs(10)).await;
    assert_eq!(cover.controller().position(), 55.0);
    assert_eq!(tx.count("open"), 1);
    assert_eq!(tx.commands(), vec!["open", "stop"]);
}

#[tokio::test(start_paused = true)]
async fn pending_clears_once_fired() {
    let (cover, _tx) = cover_at(PersistedPosition::Integer(0));
    let token = cover.debouncer().request_position(40.0);

    let pending = cover.debouncer().pending().unwrap();
    assert_eq!(pending.token, token);
    assert_eq!(pending.target, 40.0);

    sleep(Duration::from_millis(2_600)).await;
    assert!(cover.debouncer().pending().is_none());
    assert!(cover.controller().is_moving());
    cover.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn request_for_current_position_sends_nothing() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(45));
    cover.apply(CoverCommand::SetPosition(45)).await.unwrap();

    sleep(Duration::from_secs(5)).await;
    assert!(tx.commands().is_empty());
    assert!(!cover.controller().is_moving());
}

// ============================================================================
// Interaction with Moves
// ============================================================================

#[tokio::test(start_paused = true)]
async fn spaced_requests_retarget_running_move() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(0));

    cover.apply(CoverCommand::SetPosition(80)).await.unwrap();
    // Fires at 2.5 s; the move then takes 8 s
    sleep(Duration::from_millis(4_500)).await;
    cover.apply(CoverCommand::SetPosition(10)).await.unwrap();

    // Fires at 7.0 s, 4.5 s into the move: 45 % open
    sleep(Duration::from_millis(2_600)).await;
    assert_eq!(tx.commands(), vec!["open", "close"]);
    assert!(cover.snapshot().closing);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(cover.controller().position(), 10.0);
    assert_eq!(tx.commands(), vec!["open", "close", "stop"]);
}

#[tokio::test(start_paused = true)]
async fn stop_drops_pending_request() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(30));
    cover.apply(CoverCommand::SetPosition(70)).await.unwrap();

    sleep(Duration::from_secs(1)).await;
    cover.apply(CoverCommand::Stop).await.unwrap();
    assert!(cover.debouncer().pending().is_none());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(tx.commands(), vec!["stop"]);
    assert_eq!(cover.controller().position(), 30.0);
}

#[tokio::test(start_paused = true)]
async fn open_overrides_pending_request() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(0));
    cover.apply(CoverCommand::SetPosition(20)).await.unwrap();

    sleep(Duration::from_secs(1)).await;
    cover.apply(CoverCommand::Open).await.unwrap();

    // Past the quiet window: the old request must not retarget the move
    sleep(Duration::from_secs(3)).await;
    assert!(cover.snapshot().opening);
    assert_eq!(tx.commands(), vec!["open"]);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(cover.controller().position(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn failed_debounced_move_is_not_retried() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(0));
    tx.fail_next(rf_cover::DispatchError::Unavailable("offline".into()));
    cover.apply(CoverCommand::SetPosition(50)).await.unwrap();

    sleep(Duration::from_secs(10)).await;
    assert_eq!(tx.attempts(), 1);
    assert!(tx.commands().is_empty());
    assert_eq!(cover.controller().position(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn dropped_cover_sends_nothing_more() {
    let (cover, tx) = cover_at(PersistedPosition::Integer(0));
    let mut rx = cover.controller().subscribe();

    cover.apply(CoverCommand::SetPosition(70)).await.unwrap();
    // Fires at 2.5 s; a newer request is waiting when the cover goes away
    sleep(Duration::from_secs(4)).await;
    cover.apply(CoverCommand::SetPosition(20)).await.unwrap();
    assert_eq!(tx.commands(), vec!["open"]);

    drop(cover);
    sleep(Duration::from_secs(30)).await;

    let snap = rx.borrow_and_update().clone();
    assert!(!snap.moving);
    assert_eq!(snap.position, 15);
    assert_eq!(tx.commands(), vec!["open"]);
}

// ============================================================================
// Concurrent Requests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_commit_exactly_the_latest() {
    const CALLERS: usize = 8;

    for _ in 0..10 {
        let config = CoverConfig::new("Study")
            .with_commands(CommandKeys::for_device("study_blind"))
            .with_traverse_secs(0.2, 0.2)
            .with_tick_interval_ms(10)
            .with_debounce_ms(100);
        let tx = MockTransmitter::new();
        let cover = Arc::new(Cover::new(&config, tx.clone()).unwrap());
        let barrier = Arc::new(Barrier::new(CALLERS));

        let callers: Vec<_> = (0..CALLERS)
            .map(|i| {
                let cover = Arc::clone(&cover);
                let barrier = Arc::clone(&barrier);
                let target = 10.0 + 10.0 * i as f64;
                tokio::spawn(async move {
                    barrier.wait().await;
                    (cover.debouncer().request_position(target), target)
                })
            })
            .collect();

        let mut issued = Vec::new();
        for caller in callers {
            issued.push(caller.await.unwrap());
        }
        let (_, winner) = issued.iter().copied().max_by_key(|(token, _)| *token).unwrap();

        sleep(Duration::from_millis(800)).await;
        assert_eq!(tx.count("open"), 1, "requests issued: {issued:?}");
        assert_eq!(cover.controller().position(), winner);
        assert!(!cover.controller().is_moving());
    }
}
