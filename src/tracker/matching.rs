//! Matching utilities for frame-to-frame data association.

use ndarray::Array2;

use crate::tracker::appearance::Embedding;
use crate::tracker::rect::Rect;

/// Detection input for the tracker, one per object per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box, TLWH internally
    pub bbox: Rect,
    /// Class label reported by the detector
    pub label: String,
    /// Detection confidence score in [0, 1]
    pub score: f32,
    /// Appearance descriptor, if the caller already computed one
    pub embedding: Option<Embedding>,
}

impl Detection {
    /// Create a detection from TLBR corners (x1, y1, x2, y2).
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, label: impl Into<String>, score: f32) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), label, score)
    }

    pub fn from_rect(bbox: Rect, label: impl Into<String>, score: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Greedy assignment on a similarity matrix (rows: tracks, columns: detections).
///
/// Repeatedly commits the highest remaining entry while it is strictly above `thresh`.
/// The scan is row-major and only a strictly larger value replaces the current best, so
/// ties resolve to the lowest track index, then the lowest detection index.
pub fn greedy_assignment(scores: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = scores.dim();
    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::new();

    loop {
        let mut best: Option<(usize, usize, f32)> = None;
        for ((i, j), &score) in scores.indexed_iter() {
            if row_used[i] || col_used[j] || score.is_nan() || score <= thresh {
                continue;
            }
            if best.is_none_or(|(_, _, top)| score > top) {
                best = Some((i, j, score));
            }
        }

        let Some((i, j, _)) = best else {
            break;
        };
        row_used[i] = true;
        col_used[j] = true;
        matches.push((i, j));
    }

    AssignmentResult {
        matches,
        unmatched_tracks: unused_indices(&row_used),
        unmatched_detections: unused_indices(&col_used),
    }
}

fn unused_indices(used: &[bool]) -> Vec<usize> {
    used.iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { None } else { Some(i) })
        .collect()
}

/// Most similar candidate to `reference` as `(index, similarity)`.
///
/// Ties keep the earliest candidate. No threshold is applied here; callers decide
/// whether the best similarity is good enough.
pub fn best_appearance_match<'a, I>(reference: &Embedding, candidates: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = (usize, &'a Embedding)>,
{
    let mut best: Option<(usize, f32)> = None;
    for (idx, embedding) in candidates {
        let similarity = reference.similarity(embedding);
        if best.is_none_or(|(_, top)| similarity > top) {
            best = Some((idx, similarity));
        }
    }
    best
}
