use lockon_rs::{
    Detection, Embedding, LockConfig, LockOnController, Rect, TrackRegistry, TrackingState,
};

fn cup_at(cx: f32, cy: f32) -> Detection {
    Detection::from_rect(Rect::from_center(cx, cy, 20.0, 20.0), "cup", 0.9)
}

fn reference() -> Embedding {
    Embedding::new(vec![1.0, 0.0, 0.0]).unwrap()
}

/// Unit vector whose similarity to `reference()` is `similarity`, up to rounding.
fn look_alike(similarity: f32) -> Embedding {
    Embedding::new(vec![similarity, (1.0 - similarity * similarity).sqrt(), 0.0]).unwrap()
}

#[test]
fn scenario_a_tap_locks_nearest() {
    let mut registry = TrackRegistry::default();
    let mut controller = LockOnController::default();

    let results = registry.update(&[cup_at(30.0, 30.0)]);
    assert!(controller.select_nearest((32.0, 28.0), &results));
    assert_eq!(controller.state(), TrackingState::Locked);
    assert_eq!(controller.lock().unwrap().target_id, results[0].id);
    assert_eq!(controller.snapshot().label.as_deref(), Some("cup"));
}

#[test]
fn scenario_b_target_lost_goes_predicting_then_searching() {
    let mut registry = TrackRegistry::default();
    let mut controller = LockOnController::default();

    let results = registry.update(&[cup_at(30.0, 30.0).with_embedding(reference())]);
    assert!(controller.select_nearest((30.0, 30.0), &results));

    for frame in 2..=21 {
        // An unrelated cup that does not look like the target.
        let decoy = cup_at(400.0, 400.0).with_embedding(look_alike(0.5));
        let results = registry.update(&[decoy]);
        controller.advance(&results);

        let expected = if frame <= 15 {
            TrackingState::Predicting
        } else {
            TrackingState::Searching
        };
        assert_eq!(controller.state(), expected, "frame {frame}");
    }
}

#[test]
fn scenario_c_target_reacquired_by_appearance() {
    let mut registry = TrackRegistry::default();
    let mut controller = LockOnController::default();

    let results = registry.update(&[cup_at(30.0, 30.0).with_embedding(reference())]);
    let original = results[0].id;
    assert!(controller.select_nearest((30.0, 30.0), &results));

    for _ in 0..10 {
        let results = registry.update(&[]);
        controller.advance(&results);
        assert_eq!(controller.state(), TrackingState::Predicting);
    }
    // The registry has already forgotten the target.
    assert!(registry.is_empty());

    let mut frames_visible = 0;
    while controller.state() != TrackingState::Locked {
        frames_visible += 1;
        assert!(frames_visible <= 15, "target never re-acquired");
        let results = registry.update(&[cup_at(200.0, 120.0).with_embedding(look_alike(0.85))]);
        controller.advance(&results);
    }

    let lock = controller.lock().unwrap();
    assert_ne!(lock.target_id, original);
    assert_eq!(lock.missed_frames, 0);
    assert_eq!(controller.state(), TrackingState::Locked);
}

#[test]
fn relock_threshold_is_inclusive() {
    let config = LockConfig {
        loss_horizon: 2,
        relock_threshold: 0.6,
    };
    let mut registry = TrackRegistry::default();
    let mut controller = LockOnController::new(config);

    let results = registry.update(&[cup_at(30.0, 30.0).with_embedding(reference())]);
    controller.select_nearest((30.0, 30.0), &results);
    controller.advance(&registry.update(&[]));
    assert_eq!(controller.state(), TrackingState::Predicting);

    // Similarity is exactly 3/5.
    let exact = Embedding::new(vec![3.0, 4.0, 0.0]).unwrap();
    let results = registry.update(&[cup_at(300.0, 300.0).with_embedding(exact)]);
    controller.advance(&results);
    assert_eq!(controller.state(), TrackingState::Locked);
}

#[test]
fn clear_returns_to_idle_from_any_state() {
    let mut registry = TrackRegistry::default();
    let mut controller = LockOnController::default();

    let results = registry.update(&[cup_at(30.0, 30.0)]);
    controller.select_nearest((30.0, 30.0), &results);
    controller.advance(&registry.update(&[]));
    assert_eq!(controller.state(), TrackingState::Predicting);

    controller.clear();
    assert_eq!(controller.state(), TrackingState::Idle);
    assert!(!controller.advance(&registry.update(&[cup_at(30.0, 30.0)])));
    assert_eq!(controller.state(), TrackingState::Idle);
}
