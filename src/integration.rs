//! Integration module for connecting detection backends with the tracker.
//!
//! This module provides the detector trait, a single-threaded tracking session that
//! drives the registry and the lock-on controller together, and a worker that runs a
//! session behind a serial command queue.

mod builder;
mod detector;
mod pipeline;
mod session;
mod worker;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::TrackerPipeline;
pub use session::{FrameOutput, SessionConfig, TrackingSession};
pub use worker::{Command, TrackingWorker, WorkerConfig, WorkerEvent, WorkerHandle};
