//! Track registry: the per-frame data association engine.
//!
//! Every call to [`TrackRegistry::update`] runs four ordered stages:
//! 1. predict every track one frame ahead,
//! 2. greedy IoU matching between predicted boxes and detections,
//! 3. appearance re-identification for tracks that stage 2 left unmatched,
//! 4. spawn tracks for leftover detections, then prune stale tracks.

use log::{debug, trace};

use crate::error::{TrackerError, ensure_unit_interval};
use crate::tracker::kalman_filter::MotionConfig;
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::{Rect, iou_batch};
use crate::tracker::strack::{Track, TrackedResult};

/// Configuration for the [`TrackRegistry`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerConfig {
    /// IoU a predicted box must exceed to match a detection.
    pub iou_threshold: f32,
    /// Appearance similarity a detection must exceed to re-identify a track.
    pub reid_threshold: f32,
    /// Capacity; unmatched detections beyond it are dropped.
    pub max_tracks: usize,
    /// A track is removed once its miss streak exceeds this.
    pub max_miss_frames: u32,
    pub motion: MotionConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.2,
            reid_threshold: 0.8,
            max_tracks: 20,
            max_miss_frames: 8,
            motion: MotionConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        ensure_unit_interval("tracker.iou_threshold", self.iou_threshold)?;
        ensure_unit_interval("tracker.reid_threshold", self.reid_threshold)?;
        if self.max_tracks == 0 {
            return Err(TrackerError::invalid("tracker.max_tracks", "must be positive"));
        }
        self.motion.validate()
    }
}

/// Owns the active tracks and assigns stable identities.
///
/// Capacity is a bounded-resource policy: once `max_tracks` tracks exist, detections that
/// match nothing are dropped without creating a track, emitting a result, or reporting
/// an error. Existing tracks are never evicted to make room.
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
    next_id: u64,
    frame_id: u64,
    config: TrackerConfig,
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl TrackRegistry {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Live tracks, in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Frames processed since creation or the last reset.
    pub fn frame_count(&self) -> u64 {
        self.frame_id
    }

    /// Drop every track and restart identity numbering at 1.
    pub fn reset(&mut self) {
        debug!("registry reset, dropping {} tracks", self.tracks.len());
        self.tracks.clear();
        self.next_id = 1;
        self.frame_id = 0;
    }

    fn next_track_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run one frame of association and return a result for every track that was
    /// matched or created. Order of the results is not significant.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedResult> {
        self.frame_id += 1;

        let mut results = Vec::with_capacity(detections.len());
        let mut track_matched = vec![false; self.tracks.len()];
        let mut det_matched = vec![false; detections.len()];

        // Step 1: Predict
        let predicted: Vec<Rect> = self.tracks.iter_mut().map(Track::predict).collect();

        // Step 2: Geometric association
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let ious = iou_batch(&predicted, &det_rects);

        let AssignmentResult {
            matches,
            unmatched_tracks,
            ..
        } = matching::greedy_assignment(&ious, self.config.iou_threshold);

        for (itracked, idet) in matches {
            let track = &mut self.tracks[itracked];
            track.update(&detections[idet]);
            results.push(track.result());
            track_matched[itracked] = true;
            det_matched[idet] = true;
        }

        // Step 3: Appearance re-identification
        for itracked in unmatched_tracks {
            let Some((idet, similarity)) =
                Self::best_reid_candidate(&self.tracks[itracked], detections, &det_matched)
            else {
                continue;
            };
            if similarity <= self.config.reid_threshold {
                continue;
            }

            let track = &mut self.tracks[itracked];
            trace!(
                "track {} re-identified by appearance (similarity {:.3})",
                track.id(),
                similarity
            );
            track.update(&detections[idet]);
            results.push(track.result());
            track_matched[itracked] = true;
            det_matched[idet] = true;
        }

        for (track, _) in self
            .tracks
            .iter_mut()
            .zip(&track_matched)
            .filter(|(_, matched)| !**matched)
        {
            track.mark_missed();
        }

        // Step 4: Spawn new tracks, then prune stale ones
        for (det, _) in detections
            .iter()
            .zip(&det_matched)
            .filter(|(_, matched)| !**matched)
        {
            if self.tracks.len() >= self.config.max_tracks {
                trace!("registry full, dropping unmatched `{}` detection", det.label);
                continue;
            }
            let id = self.next_track_id();
            let track = Track::new(id, det, self.config.motion);
            debug!("spawned track {} ({})", id, det.label);
            results.push(track.result());
            self.tracks.push(track);
        }

        let max_miss = self.config.max_miss_frames;
        self.tracks.retain(|track| {
            let keep = track.miss_streak() <= max_miss;
            if !keep {
                debug!(
                    "removed track {} ({}) after {} missed frames",
                    track.id(),
                    track.label(),
                    track.miss_streak()
                );
            }
            keep
        });

        results
    }

    /// Best same-label, still-unmatched detection for `track` by appearance.
    fn best_reid_candidate(
        track: &Track,
        detections: &[Detection],
        det_matched: &[bool],
    ) -> Option<(usize, f32)> {
        let reference = track.embedding()?;
        let candidates = detections
            .iter()
            .enumerate()
            .filter(|(j, det)| !det_matched[*j] && det.label == track.label())
            .filter_map(|(j, det)| det.embedding.as_ref().map(|e| (j, e)));
        matching::best_appearance_match(reference, candidates)
    }
}
