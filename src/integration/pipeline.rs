//! TrackerPipeline for combining detection with tracking and lock-on.

use image::RgbImage;

use crate::error::TrackerError;
use crate::tracker::{LockSnapshot, TrackingState};

use super::{DetectionSource, FrameOutput, SessionConfig, TrackingSession};

/// Bundles a detection backend with a [`TrackingSession`].
///
/// Each frame is passed to the detector, then through the registry and the lock-on
/// controller. Embeddings missing from the detector output are computed from the frame.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    session: TrackingSession,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new pipeline with the given detector and session config.
    pub fn new(detector: D, config: SessionConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            detector,
            session: TrackingSession::new(config)?,
        })
    }

    /// Create a new pipeline with default configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self {
            detector,
            session: TrackingSession::default(),
        }
    }

    /// Detect, associate and advance the lock for a single frame.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<FrameOutput, D::Error> {
        let detections = self.detector.detect(frame)?;
        Ok(self.session.process(detections, Some(frame)))
    }

    /// Lock onto the object nearest to `point` in the latest frame.
    pub fn tap(&mut self, point: (f32, f32)) -> bool {
        self.session.tap(point)
    }

    pub fn clear_lock(&mut self) {
        self.session.clear_lock();
    }

    pub fn lock_state(&self) -> TrackingState {
        self.session.snapshot().state
    }

    pub fn snapshot(&self) -> LockSnapshot {
        self.session.snapshot()
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying session.
    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    /// Get a mutable reference to the underlying session.
    pub fn session_mut(&mut self) -> &mut TrackingSession {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Detection;
    use image::Rgb;

    struct MockDetector {
        frames: Vec<Vec<Detection>>,
    }

    impl DetectionSource for MockDetector {
        type Error = String;

        fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
            if self.frames.is_empty() {
                return Err("no more frames".to_string());
            }
            Ok(self.frames.remove(0))
        }
    }

    #[test]
    fn test_tracker_pipeline() {
        let detector = MockDetector {
            frames: vec![
                vec![Detection::new(10.0, 20.0, 50.0, 80.0, "person", 0.9)],
                vec![Detection::new(12.0, 20.0, 52.0, 80.0, "person", 0.9)],
            ],
        };
        let frame = RgbImage::from_pixel(100, 100, Rgb([120, 60, 200]));

        let mut pipeline = TrackerPipeline::with_default_config(detector);
        let first = pipeline.process_frame(&frame).unwrap();
        assert_eq!(first.results.len(), 1);
        assert!(first.results[0].embedding.is_some());

        assert!(pipeline.tap((30.0, 50.0)));
        assert_eq!(pipeline.lock_state(), TrackingState::Locked);

        let second = pipeline.process_frame(&frame).unwrap();
        assert_eq!(second.results[0].id, first.results[0].id);
        assert_eq!(second.lock.target_id, Some(first.results[0].id));

        assert!(pipeline.process_frame(&frame).is_err());
    }
}
