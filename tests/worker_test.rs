use std::thread;
use std::time::Duration;

use lockon_rs::{
    Detection, Rect, SessionConfig, TrackerError, TrackingState, TrackingWorker, WorkerConfig,
    WorkerEvent,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn cup() -> Detection {
    Detection::from_rect(Rect::from_center(30.0, 30.0, 20.0, 20.0), "cup", 0.9)
}

#[test]
fn test_commands_processed_in_order() {
    let worker = TrackingWorker::spawn(SessionConfig::default()).unwrap();

    worker.process_detections(vec![cup()], None).unwrap();
    worker.tap((32.0, 28.0)).unwrap();
    worker.process_detections(vec![], None).unwrap();
    worker.clear_lock().unwrap();

    let events = worker.events();
    match events.recv_timeout(TIMEOUT).unwrap() {
        WorkerEvent::Frame(output) => assert_eq!(output.results.len(), 1),
        other => panic!("unexpected event {other:?}"),
    }
    match events.recv_timeout(TIMEOUT).unwrap() {
        WorkerEvent::Tap { selected, lock } => {
            assert!(selected);
            assert_eq!(lock.state, TrackingState::Locked);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match events.recv_timeout(TIMEOUT).unwrap() {
        WorkerEvent::Frame(output) => {
            assert!(output.changed);
            assert_eq!(output.lock.state, TrackingState::Predicting);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match events.recv_timeout(TIMEOUT).unwrap() {
        WorkerEvent::Cleared(lock) => assert_eq!(lock.state, TrackingState::Idle),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_tap_from_another_thread() {
    let worker = TrackingWorker::spawn(SessionConfig::default()).unwrap();
    worker.process_detections(vec![cup()], None).unwrap();

    let results = match worker.events().recv_timeout(TIMEOUT).unwrap() {
        WorkerEvent::Frame(output) => output.results,
        other => panic!("unexpected event {other:?}"),
    };

    let handle = worker.handle();
    thread::spawn(move || handle.tap_with((30.0, 30.0), results).unwrap())
        .join()
        .unwrap();

    match worker.events().recv_timeout(TIMEOUT).unwrap() {
        WorkerEvent::Tap { selected, lock } => {
            assert!(selected);
            assert_eq!(lock.target_id, Some(1));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_tap_without_results_fails() {
    let worker = TrackingWorker::spawn(SessionConfig::default()).unwrap();
    worker.tap((0.0, 0.0)).unwrap();
    assert_eq!(
        worker.events().recv_timeout(TIMEOUT).unwrap(),
        WorkerEvent::Tap {
            selected: false,
            lock: Default::default(),
        }
    );
}

#[test]
fn test_send_after_shutdown() {
    let worker = TrackingWorker::spawn(SessionConfig::default()).unwrap();
    let handle = worker.handle();
    worker.shutdown();
    assert_eq!(handle.reset(), Err(TrackerError::WorkerDisconnected));
}

#[test]
fn test_invalid_config() {
    let mut config = SessionConfig::default();
    config.tracker.max_tracks = 0;
    assert!(matches!(
        TrackingWorker::spawn(config),
        Err(TrackerError::InvalidConfig { .. })
    ));
}

#[test]
fn test_undrained_events_stay_bounded() {
    let config = WorkerConfig {
        event_capacity: 4,
        ..WorkerConfig::default()
    };
    let worker = TrackingWorker::with_config(config).unwrap();
    let events = worker.events().clone();

    for _ in 0..50 {
        worker.process_detections(vec![cup()], None).unwrap();
    }
    worker.tap((30.0, 30.0)).unwrap();
    // Shutdown waits for every queued command to run.
    worker.shutdown();

    assert_eq!(events.len(), 4);
    match events.try_recv().unwrap() {
        WorkerEvent::Frame(output) => assert_eq!(output.results[0].id, 1),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_zero_event_capacity_rejected() {
    let config = WorkerConfig {
        event_capacity: 0,
        ..WorkerConfig::default()
    };
    assert!(matches!(
        TrackingWorker::with_config(config),
        Err(TrackerError::InvalidConfig { field: "worker.event_capacity", .. })
    ));
}
