//! Serial tracking worker.
//!
//! A single thread owns the [`TrackingSession`] and drains one command queue, so frame
//! updates, taps and lock clears are applied strictly in arrival order. Taps coming from
//! a UI thread go through the same queue instead of touching the lock directly. Results
//! flow back as owned [`WorkerEvent`] values; nothing is shared by reference. The event
//! buffer is bounded, and events published while it is full are dropped.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use image::RgbImage;
use log::{debug, error, info, trace};

use crate::error::TrackerError;
use crate::tracker::{Detection, LockSnapshot, TrackedResult};

use super::{FrameOutput, SessionConfig, TrackingSession};

/// Configuration for a [`TrackingWorker`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerConfig {
    pub session: SessionConfig,
    /// Events kept for the consumer; newer events are dropped while it is full.
    pub event_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            event_capacity: 64,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.event_capacity == 0 {
            return Err(TrackerError::invalid("worker.event_capacity", "must be positive"));
        }
        self.session.validate()
    }
}

/// A message for the worker queue.
#[derive(Debug, Clone)]
pub enum Command {
    /// Run one frame. `image` is only needed to compute missing embeddings.
    ProcessDetections {
        detections: Vec<Detection>,
        image: Option<RgbImage>,
    },
    /// Select the result nearest to `point`. `None` uses the worker's latest frame.
    UserTap {
        point: (f32, f32),
        results: Option<Vec<TrackedResult>>,
    },
    ClearLock,
    /// Drop all tracks and the lock.
    Reset,
    Shutdown,
}

/// Published by the worker after each command.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Frame(FrameOutput),
    Tap { selected: bool, lock: LockSnapshot },
    Cleared(LockSnapshot),
    Reset,
}

/// Cloneable sender side of the worker queue, for use from other threads.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    commands: Sender<Command>,
}

impl WorkerHandle {
    pub fn send(&self, command: Command) -> Result<(), TrackerError> {
        self.commands
            .send(command)
            .map_err(|_| TrackerError::WorkerDisconnected)
    }

    pub fn process_detections(
        &self,
        detections: Vec<Detection>,
        image: Option<RgbImage>,
    ) -> Result<(), TrackerError> {
        self.send(Command::ProcessDetections { detections, image })
    }

    /// Tap against the latest frame the worker has processed.
    pub fn tap(&self, point: (f32, f32)) -> Result<(), TrackerError> {
        self.send(Command::UserTap {
            point,
            results: None,
        })
    }

    /// Tap against results the caller is currently displaying.
    pub fn tap_with(
        &self,
        point: (f32, f32),
        results: Vec<TrackedResult>,
    ) -> Result<(), TrackerError> {
        self.send(Command::UserTap {
            point,
            results: Some(results),
        })
    }

    pub fn clear_lock(&self) -> Result<(), TrackerError> {
        self.send(Command::ClearLock)
    }

    pub fn reset(&self) -> Result<(), TrackerError> {
        self.send(Command::Reset)
    }
}

/// Owns the worker thread. Dropping it shuts the worker down.
pub struct TrackingWorker {
    handle: WorkerHandle,
    events: Receiver<WorkerEvent>,
    thread: Option<JoinHandle<()>>,
}

impl TrackingWorker {
    /// Start a worker with the default event capacity.
    pub fn spawn(config: SessionConfig) -> Result<Self, TrackerError> {
        Self::with_config(WorkerConfig {
            session: config,
            ..WorkerConfig::default()
        })
    }

    /// Validate `config` and start the worker thread.
    pub fn with_config(config: WorkerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let session = TrackingSession::new(config.session)?;
        let (command_tx, command_rx) = unbounded::<Command>();
        let (event_tx, event_rx) = bounded::<WorkerEvent>(config.event_capacity);

        let thread = thread::Builder::new()
            .name("tracking-worker".to_string())
            .spawn(move || worker_loop(session, command_rx, event_tx))
            .map_err(|e| TrackerError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            handle: WorkerHandle {
                commands: command_tx,
            },
            events: event_rx,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Stream of events, one per processed command while the buffer has room.
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    pub fn process_detections(
        &self,
        detections: Vec<Detection>,
        image: Option<RgbImage>,
    ) -> Result<(), TrackerError> {
        self.handle.process_detections(detections, image)
    }

    pub fn tap(&self, point: (f32, f32)) -> Result<(), TrackerError> {
        self.handle.tap(point)
    }

    pub fn clear_lock(&self) -> Result<(), TrackerError> {
        self.handle.clear_lock()
    }

    pub fn reset(&self) -> Result<(), TrackerError> {
        self.handle.reset()
    }

    /// Stop the worker after the commands already queued and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.handle.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("tracking worker panicked");
            }
        }
    }
}

impl Drop for TrackingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    mut session: TrackingSession,
    commands: Receiver<Command>,
    events: Sender<WorkerEvent>,
) {
    info!("tracking worker started");
    let mut frames_processed = 0_u64;

    for command in commands.iter() {
        let event = match command {
            Command::ProcessDetections { detections, image } => {
                frames_processed += 1;
                WorkerEvent::Frame(session.process(detections, image.as_ref()))
            }
            Command::UserTap { point, results } => {
                let selected = match &results {
                    Some(results) => session.tap_with(point, results),
                    None => session.tap(point),
                };
                WorkerEvent::Tap {
                    selected,
                    lock: session.snapshot(),
                }
            }
            Command::ClearLock => {
                session.clear_lock();
                WorkerEvent::Cleared(session.snapshot())
            }
            Command::Reset => {
                session.reset();
                WorkerEvent::Reset
            }
            Command::Shutdown => break,
        };

        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("event buffer full, dropping event"),
            Err(TrySendError::Disconnected(_)) => {
                debug!("event receiver dropped, continuing without publishing");
            }
        }
    }

    info!("tracking worker stopped after {} frames", frames_processed);
}
