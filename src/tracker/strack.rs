//! Single object track owned by the registry.

use crate::tracker::appearance::Embedding;
use crate::tracker::kalman_filter::{MotionConfig, MotionFilter};
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;

/// Identity-stable output for one track that was matched or created this frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackedResult {
    /// Stable track identifier
    pub id: u64,
    pub label: String,
    /// Confidence of the detection matched this frame
    pub confidence: f32,
    /// Box after the motion filter correction
    pub bbox: Rect,
    pub embedding: Option<Embedding>,
}

/// Single tracked object.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    label: String,
    score: f32,
    /// Consecutive frames without a matched detection
    miss_streak: u32,
    /// Total frames with a matched detection, including the spawning one
    hits: u32,
    /// Frames since the track was created
    age: u32,
    embedding: Option<Embedding>,
    current: Rect,
    filter: MotionFilter,
}

impl Track {
    /// Seed a new track from an unmatched detection.
    pub(crate) fn new(id: u64, detection: &Detection, motion: MotionConfig) -> Self {
        Self {
            id,
            label: detection.label.clone(),
            score: detection.score,
            miss_streak: 0,
            hits: 1,
            age: 0,
            embedding: detection.embedding.clone(),
            current: detection.bbox,
            filter: MotionFilter::initiate(motion, detection.bbox),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn miss_streak(&self) -> u32 {
        self.miss_streak
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    /// Latest box: corrected if matched this frame, predicted otherwise.
    pub fn rect(&self) -> Rect {
        self.current
    }

    pub fn filter(&self) -> &MotionFilter {
        &self.filter
    }

    /// True once the filter has coasted past its prediction horizon.
    pub fn is_lost(&self) -> bool {
        self.filter.is_lost()
    }

    pub(crate) fn predict(&mut self) -> Rect {
        self.age = self.age.saturating_add(1);
        if let Some(predicted) = self.filter.predict() {
            self.current = predicted;
        }
        self.current
    }

    /// Apply a matched detection. A detection without an embedding keeps the
    /// previous appearance.
    pub(crate) fn update(&mut self, detection: &Detection) {
        self.current = self.filter.update(detection.bbox);
        self.label.clone_from(&detection.label);
        self.score = detection.score;
        if let Some(embedding) = &detection.embedding {
            self.embedding = Some(embedding.clone());
        }
        self.miss_streak = 0;
        self.hits = self.hits.saturating_add(1);
    }

    pub(crate) fn mark_missed(&mut self) {
        self.miss_streak = self.miss_streak.saturating_add(1);
    }

    pub(crate) fn result(&self) -> TrackedResult {
        TrackedResult {
            id: self.id,
            label: self.label.clone(),
            confidence: self.score,
            bbox: self.current,
            embedding: self.embedding.clone(),
        }
    }
}
