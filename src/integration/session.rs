//! One tracking session: registry, lock-on controller and descriptor driven together.

use image::RgbImage;
use log::trace;

use crate::error::TrackerError;
use crate::integration::IntoDetections;
use crate::tracker::{
    AppearanceDescriptor, DescriptorConfig, LockConfig, LockOnController, LockSnapshot,
    TrackRegistry, TrackedResult, TrackerConfig,
};

/// Every tunable of a [`TrackingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    pub tracker: TrackerConfig,
    pub lock: LockConfig,
    pub descriptor: DescriptorConfig,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        self.tracker.validate()?;
        self.lock.validate()?;
        self.descriptor.validate()
    }
}

/// Everything produced by one processed frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameOutput {
    pub results: Vec<TrackedResult>,
    pub lock: LockSnapshot,
    /// Whether the lock snapshot differs from the previous frame's.
    pub changed: bool,
}

/// Serial unit of tracking state.
///
/// All mutation goes through `&mut self`, so frames, taps and clears are applied in the
/// order the caller issues them. Share it across threads through
/// [`TrackingWorker`](crate::integration::TrackingWorker), not behind a lock.
#[derive(Debug, Clone, Default)]
pub struct TrackingSession {
    registry: TrackRegistry,
    controller: LockOnController,
    descriptor: AppearanceDescriptor,
    last_results: Vec<TrackedResult>,
}

impl TrackingSession {
    pub fn new(config: SessionConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            registry: TrackRegistry::new(config.tracker),
            controller: LockOnController::new(config.lock),
            descriptor: AppearanceDescriptor::new(config.descriptor),
            last_results: Vec::new(),
        })
    }

    /// Process one frame of detections.
    ///
    /// When `image` is given, detections without an embedding get one computed from their
    /// box. A crop that yields no descriptor leaves the detection without an embedding;
    /// the frame is still matched geometrically.
    pub fn process(
        &mut self,
        detections: impl IntoDetections,
        image: Option<&RgbImage>,
    ) -> FrameOutput {
        let mut detections = detections.into_detections();

        if let Some(image) = image {
            for det in detections.iter_mut().filter(|d| d.embedding.is_none()) {
                det.embedding = self.descriptor.embed(image, &det.bbox);
                if det.embedding.is_none() {
                    trace!("no descriptor for `{}` at {:?}", det.label, det.bbox);
                }
            }
        }

        let results = self.registry.update(&detections);
        let changed = self.controller.advance(&results);
        self.last_results.clone_from(&results);

        FrameOutput {
            results,
            lock: self.controller.snapshot(),
            changed,
        }
    }

    /// Lock onto the result of the latest frame nearest to `point`.
    pub fn tap(&mut self, point: (f32, f32)) -> bool {
        self.controller.select_nearest(point, &self.last_results)
    }

    /// Lock onto the result in `results` nearest to `point`.
    pub fn tap_with(&mut self, point: (f32, f32), results: &[TrackedResult]) -> bool {
        self.controller.select_nearest(point, results)
    }

    pub fn clear_lock(&mut self) {
        self.controller.clear();
    }

    /// Clear all tracks and the lock. Track ids restart, so a lock cannot outlive them.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.controller.clear();
        self.last_results.clear();
    }

    pub fn snapshot(&self) -> LockSnapshot {
        self.controller.snapshot()
    }

    pub fn last_results(&self) -> &[TrackedResult] {
        &self.last_results
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &LockOnController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{Detection, Rect, TrackingState};
    use image::Rgb;

    #[test]
    fn test_invalid_config_rejected() {
        let config = SessionConfig {
            lock: LockConfig {
                relock_threshold: 2.0,
                ..LockConfig::default()
            },
            ..SessionConfig::default()
        };
        assert!(matches!(
            TrackingSession::new(config),
            Err(TrackerError::InvalidConfig { field: "lock.relock_threshold", .. })
        ));
    }

    #[test]
    fn test_process_computes_embeddings_from_image() {
        let mut session = TrackingSession::default();
        let image = RgbImage::from_pixel(64, 64, Rgb([30, 200, 40]));
        let output = session.process(
            vec![
                Detection::from_rect(Rect::new(8.0, 8.0, 20.0, 20.0), "ball", 0.8),
                Detection::from_rect(Rect::new(500.0, 500.0, 20.0, 20.0), "ball", 0.8),
            ],
            Some(&image),
        );

        assert_eq!(output.results.len(), 2);
        let inside = output.results.iter().find(|r| r.bbox.x == 8.0).unwrap();
        let outside = output.results.iter().find(|r| r.bbox.x == 500.0).unwrap();
        assert_eq!(inside.embedding.as_ref().map(|e| e.len()), Some(108));
        assert!(outside.embedding.is_none());
    }

    #[test]
    fn test_tap_uses_latest_results() {
        let mut session = TrackingSession::default();
        assert!(!session.tap((0.0, 0.0)));

        session.process(
            vec![Detection::from_rect(Rect::from_center(30.0, 30.0, 10.0, 10.0), "cup", 0.9)],
            None,
        );
        assert!(session.tap((32.0, 28.0)));
        assert_eq!(session.snapshot().state, TrackingState::Locked);

        session.reset();
        assert_eq!(session.snapshot().state, TrackingState::Idle);
        assert!(session.registry().is_empty());
    }
}
