//! End-to-end race scenarios: full races, pauses, and cancellation.
//!
//! Run with: cargo test --package racetrack_core --test race_scenarios

use parking_lot::Mutex;
use racetrack_core::{
    EventBus, LaneId, RaceConfig, RaceControl, RaceCoordinator, RaceEvent, RaceObserver,
    RaceReport,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn config(step_interval_ms: u64) -> RaceConfig {
    RaceConfig {
        step_interval_ms,
        ..RaceConfig::default()
    }
}

fn wait_until_parked(control: &RaceControl, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while control.parked() < count {
        assert!(Instant::now() < deadline, "runners never parked");
        thread::sleep(Duration::from_millis(1));
    }
}

fn rank_set(report: &RaceReport) -> HashSet<u32> {
    report.ranks.iter().flatten().copied().collect()
}

#[derive(Default)]
struct CountingObserver {
    progress: Mutex<Vec<usize>>,
    finished: AtomicUsize,
}

impl RaceObserver for CountingObserver {
    fn on_progress(&self, lane: LaneId, _current: usize, _total: usize) {
        let mut progress = self.progress.lock();
        if progress.len() <= lane {
            progress.resize(lane + 1, 0);
        }
        progress[lane] += 1;
    }

    fn on_race_finished(&self, _report: &RaceReport) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn four_lanes_no_pauses() {
    let coordinator = RaceCoordinator::new(config(2));
    let report = coordinator.run_race(4, 5).unwrap();

    let expected: HashSet<u32> = (1..=4).collect();
    assert_eq!(rank_set(&report), expected);
    assert!(report.ranks.iter().all(Option::is_some));
    assert_eq!(report.issued, 4);
    assert!(report.is_complete());

    let winner = report.winner.expect("a winner");
    assert_eq!(report.rank_of(winner), Some(1));
    assert_eq!(report.podium()[0], winner);
}

#[test]
fn every_track_reaches_exactly_its_length() {
    let observer = Arc::new(CountingObserver::default());
    let coordinator =
        RaceCoordinator::with_observer(config(1), Arc::clone(&observer) as Arc<dyn RaceObserver>);

    let handle = coordinator.start_race(6, 7).unwrap();
    let tracks = handle.tracks().to_vec();
    let report = coordinator.await_completion(handle);

    assert!(tracks.iter().all(|t| t.is_complete() && t.current_progress() == 7));
    assert_eq!(*observer.progress.lock(), vec![7; 6]);
    assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
    assert_eq!(report.finishers(), 6);
}

#[test]
fn pause_holds_every_lane() {
    let step_ms = 10;
    let length = 5;
    let hold = Duration::from_millis(500);
    let coordinator = RaceCoordinator::new(config(step_ms));

    let handle = coordinator.start_race(4, length).unwrap();
    handle.pause();
    let control = handle.control();
    wait_until_parked(&control, 4);

    let before = handle.progress();
    thread::sleep(hold);
    let after = handle.progress();
    assert_eq!(before, after, "progress changed while paused");
    assert_eq!(control.parked(), 4);

    handle.resume();
    let report = coordinator.await_completion(handle);

    let unpaused_floor = Duration::from_millis(step_ms) * u32::try_from(length).unwrap();
    assert!(report.elapsed >= hold + unpaused_floor);
    assert_eq!(report.finishers(), 4);
}

#[test]
fn progress_frozen_as_soon_as_pause_returns() {
    let coordinator = RaceCoordinator::new(config(0));

    for _ in 0..50 {
        let handle = coordinator.start_race(8, 100_000).unwrap();
        thread::sleep(Duration::from_millis(1));

        handle.pause();
        let before = handle.progress();
        thread::sleep(Duration::from_millis(20));
        let after = handle.progress();

        assert_eq!(before, after, "a lane advanced after pause() returned");
        handle.cancel();
        coordinator.await_completion(handle);
    }
}

#[test]
fn resume_after_repeated_pauses() {
    let coordinator = RaceCoordinator::new(config(2));
    let handle = coordinator.start_race(5, 10).unwrap();
    let control = handle.control();

    for _ in 0..3 {
        control.pause();
        thread::sleep(Duration::from_millis(15));
        control.resume();
        thread::sleep(Duration::from_millis(5));
    }

    let report = coordinator.await_completion(handle);
    let expected: HashSet<u32> = (1..=5).collect();
    assert_eq!(rank_set(&report), expected);
}

#[test]
fn cancel_one_lane_mid_race() {
    let coordinator = RaceCoordinator::new(config(5));
    let handle = coordinator.start_race(4, 40).unwrap();

    thread::sleep(Duration::from_millis(30));
    handle.cancel_lane(2).unwrap();

    let report = coordinator.await_completion(handle);

    assert_eq!(report.cancelled, vec![2]);
    assert_eq!(report.rank_of(2), None);
    assert_eq!(report.issued, 3);
    let expected: HashSet<u32> = (1..=3).collect();
    assert_eq!(rank_set(&report), expected);
    assert_ne!(report.winner, Some(2));
    assert!(report.winner.is_some());
}

#[test]
fn cancel_while_paused_releases_everyone() {
    let coordinator = RaceCoordinator::new(config(5));
    let handle = coordinator.start_race(6, 50).unwrap();
    let control = handle.control();
    control.pause();
    wait_until_parked(&control, 6);

    let start = Instant::now();
    control.cancel();
    let report = coordinator.await_completion(handle);

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(report.winner, None);
    assert_eq!(report.issued, 0);
    assert_eq!(report.cancelled.len(), 6);
    assert_eq!(report.finishers(), 0);
}

#[test]
fn control_from_another_thread_while_awaiting() {
    let coordinator = Arc::new(RaceCoordinator::new(config(5)));
    let handle = coordinator.start_race(3, 200).unwrap();
    let control = handle.control();

    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.await_completion(handle))
    };

    thread::sleep(Duration::from_millis(20));
    control.pause();
    wait_until_parked(&control, 3);
    control.cancel();

    let report = waiter.join().unwrap();
    assert_eq!(report.cancelled.len(), 3);
}

#[test]
fn repeated_races_start_fresh() {
    let coordinator = RaceCoordinator::new(config(1));

    for _ in 0..3 {
        let report = coordinator.run_race(3, 4).unwrap();
        let expected: HashSet<u32> = (1..=3).collect();
        assert_eq!(rank_set(&report), expected);
        assert_eq!(report.issued, 3);
        assert!(report.winner.is_some());
    }
}

#[test]
fn event_bus_delivers_progress_and_finish() {
    let bus = EventBus::new(1024);
    let progress = bus.receiver();
    let finished = bus.finished();
    let coordinator = RaceCoordinator::with_observer(config(1), Arc::new(bus.observer()));

    let renderer = thread::spawn(move || {
        let report = finished
            .recv_timeout(Duration::from_secs(10))
            .expect("finish report");
        let steps = progress
            .try_iter()
            .filter(|e| matches!(e, RaceEvent::Progress { .. }))
            .count();
        (steps, report)
    });

    let report = coordinator.run_race(3, 5).unwrap();
    let (steps, delivered) = renderer.join().unwrap();

    assert_eq!(steps, 15);
    assert_eq!(delivered, report);
}

#[test]
fn undrained_event_bus_never_blocks_completion() {
    let bus = EventBus::new(4);
    let observer = Arc::new(bus.observer());
    let coordinator = Arc::new(RaceCoordinator::with_observer(
        config(0),
        Arc::clone(&observer) as Arc<dyn RaceObserver>,
    ));

    let race = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.run_race(4, 5).unwrap())
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while !race.is_finished() {
        assert!(Instant::now() < deadline, "await_completion blocked on a full bus");
        thread::sleep(Duration::from_millis(5));
    }
    let report = race.join().unwrap();

    assert_eq!(observer.dropped(), 16);
    let events: Vec<RaceEvent> = bus.drain().collect();
    assert_eq!(events.len(), 5);
    assert!(matches!(&events[4], RaceEvent::Finished(r) if *r == report));
}
