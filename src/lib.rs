//! Multi-object tracking with appearance re-identification and single-target lock-on.
//!
//! The [`tracker`] module holds the per-frame data association engine and the lock-on
//! state machine; [`integration`] binds them to detector backends and a serial worker.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::TrackerError;
pub use integration::{
    Command, DetectionBuilder, DetectionSource, FrameOutput, IntoDetections, SessionConfig,
    TrackerPipeline, TrackingSession, TrackingWorker, WorkerConfig, WorkerEvent, WorkerHandle,
};
pub use tracker::{
    AppearanceDescriptor, DescriptorConfig, Detection, Embedding, Lock, LockConfig,
    LockOnController, LockSnapshot, MotionConfig, MotionFilter, Rect, Track, TrackRegistry,
    TrackedResult, TrackerConfig, TrackingState, cosine_similarity,
};
