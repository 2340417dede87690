//! Single-target lock-on built on the registry's per-frame output.
//!
//! The controller never looks inside the registry. It keeps its own shadow record of the
//! target (label, appearance, last box), so a target whose track was already pruned by
//! the registry can still be re-acquired by appearance under a new id.

use log::debug;

use crate::error::{TrackerError, ensure_unit_interval};
use crate::tracker::appearance::Embedding;
use crate::tracker::matching;
use crate::tracker::rect::Rect;
use crate::tracker::strack::TrackedResult;
use crate::tracker::track_state::TrackingState;

/// Configuration for the [`LockOnController`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockConfig {
    /// Missed frames after which the target is treated as lost and searched for.
    pub loss_horizon: u32,
    /// Minimum appearance similarity accepted when re-acquiring a lost target.
    pub relock_threshold: f32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            loss_horizon: 15,
            relock_threshold: 0.78,
        }
    }
}

impl LockConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.loss_horizon == 0 {
            return Err(TrackerError::invalid("lock.loss_horizon", "must be positive"));
        }
        ensure_unit_interval("lock.relock_threshold", self.relock_threshold)
    }
}

/// The controller's record of the selected target.
#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub target_id: u64,
    pub reference_label: String,
    pub reference_embedding: Option<Embedding>,
    pub confidence: f32,
    /// Box from the last frame the target was seen in
    pub last_box: Rect,
    pub missed_frames: u32,
}

impl Lock {
    fn from_result(result: &TrackedResult) -> Self {
        Self {
            target_id: result.id,
            reference_label: result.label.clone(),
            reference_embedding: result.embedding.clone(),
            confidence: result.confidence,
            last_box: result.bbox,
            missed_frames: 0,
        }
    }

    fn refresh(&mut self, result: &TrackedResult) {
        self.target_id = result.id;
        self.reference_label.clone_from(&result.label);
        if let Some(embedding) = &result.embedding {
            self.reference_embedding = Some(embedding.clone());
        }
        self.confidence = result.confidence;
        self.last_box = result.bbox;
        self.missed_frames = 0;
    }
}

/// Immutable copy of the externally visible lock-on state.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockSnapshot {
    pub state: TrackingState,
    pub target_id: Option<u64>,
    pub bbox: Option<Rect>,
    pub label: Option<String>,
    pub confidence: f32,
}

/// Tracks one user-selected target across frames.
#[derive(Debug, Clone, Default)]
pub struct LockOnController {
    config: LockConfig,
    lock: Option<Lock>,
    state: TrackingState,
}

impl LockOnController {
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            lock: None,
            state: TrackingState::Idle,
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn lock(&self) -> Option<&Lock> {
        self.lock.as_ref()
    }

    pub fn snapshot(&self) -> LockSnapshot {
        match &self.lock {
            Some(lock) => LockSnapshot {
                state: self.state,
                target_id: Some(lock.target_id),
                bbox: Some(lock.last_box),
                label: Some(lock.reference_label.clone()),
                confidence: lock.confidence,
            },
            None => LockSnapshot {
                state: self.state,
                ..LockSnapshot::default()
            },
        }
    }

    /// Lock onto the result whose box center is closest to `point`.
    ///
    /// Returns `false` without touching the current lock when `results` is empty.
    /// Equal distances resolve to the earliest result.
    pub fn select_nearest(&mut self, point: (f32, f32), results: &[TrackedResult]) -> bool {
        let Some(nearest) = results.iter().min_by(|a, b| {
            a.bbox
                .center_distance_sq(point)
                .total_cmp(&b.bbox.center_distance_sq(point))
        }) else {
            return false;
        };

        debug!("locked onto track {} ({})", nearest.id, nearest.label);
        self.lock = Some(Lock::from_result(nearest));
        self.state = TrackingState::Locked;
        true
    }

    /// Fold one frame of registry output into the lock.
    ///
    /// Returns whether the snapshot changed, so callers know when to redraw.
    pub fn advance(&mut self, results: &[TrackedResult]) -> bool {
        let before = self.snapshot();
        self.step(results);
        self.snapshot() != before
    }

    /// Drop the lock entirely.
    pub fn clear(&mut self) {
        if let Some(lock) = self.lock.take() {
            debug!("lock on track {} cleared", lock.target_id);
        }
        self.state = TrackingState::Idle;
    }

    fn step(&mut self, results: &[TrackedResult]) {
        let Some(lock) = self.lock.as_mut() else {
            self.state = TrackingState::Idle;
            return;
        };

        if let Some(result) = results.iter().find(|r| r.id == lock.target_id) {
            lock.refresh(result);
            self.state = TrackingState::Locked;
            return;
        }

        lock.missed_frames = lock.missed_frames.saturating_add(1);
        if lock.missed_frames < self.config.loss_horizon {
            self.state = TrackingState::Predicting;
            return;
        }

        match reacquire(lock, results, self.config.relock_threshold) {
            Some(result) => {
                debug!(
                    "re-acquired target as track {} (was {}) after {} missed frames",
                    result.id, lock.target_id, lock.missed_frames
                );
                lock.refresh(result);
                self.state = TrackingState::Locked;
            }
            None => {
                if self.state != TrackingState::Searching {
                    debug!("target {} lost, searching", lock.target_id);
                }
                self.state = TrackingState::Searching;
            }
        }
    }
}

/// Same-label result most similar to the stored appearance, if similar enough.
fn reacquire<'a>(
    lock: &Lock,
    results: &'a [TrackedResult],
    threshold: f32,
) -> Option<&'a TrackedResult> {
    let reference = lock.reference_embedding.as_ref()?;
    let candidates = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.label == lock.reference_label)
        .filter_map(|(i, r)| r.embedding.as_ref().map(|e| (i, e)));

    let (idx, similarity) = matching::best_appearance_match(reference, candidates)?;
    (similarity >= threshold).then(|| &results[idx])
}
