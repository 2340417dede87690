//! Constant-velocity motion filter over a 2D box with a diagonal covariance.
//!
//! Each of the four measured dimensions (center x, center y, width, height) is filtered
//! independently with a scalar gain, so no matrix inversion is needed.

use nalgebra::Vector4;

use crate::error::{TrackerError, ensure_positive, ensure_unit_interval};
use crate::tracker::rect::Rect;

/// Tunables for [`MotionFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionConfig {
    /// Added to every covariance entry on each `predict` (Q).
    pub process_noise: f32,
    /// Measurement noise used in the scalar gain (R).
    pub measurement_noise: f32,
    /// Covariance assigned to every dimension when the filter is initialised.
    pub initial_covariance: f32,
    /// Weight kept from the previous velocity when blending in a correction.
    pub velocity_smoothing: f32,
    /// Uncorrected predictions tolerated before the filter reports itself lost.
    ///
    /// Only surfaces through [`MotionFilter::is_lost`] and `Track::is_lost`. The lock-on
    /// controller never reads it; it counts missed frames against its own
    /// `LockConfig::loss_horizon`, which keeps running after the registry prunes the track.
    pub prediction_horizon: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-2,
            measurement_noise: 1e-1,
            initial_covariance: 1.0,
            velocity_smoothing: 0.8,
            prediction_horizon: 15,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        ensure_positive("motion.process_noise", self.process_noise)?;
        ensure_positive("motion.measurement_noise", self.measurement_noise)?;
        ensure_positive("motion.initial_covariance", self.initial_covariance)?;
        ensure_unit_interval("motion.velocity_smoothing", self.velocity_smoothing)
    }
}

#[derive(Debug, Clone)]
struct FilterState {
    /// (cx, cy, w, h)
    position: Vector4<f32>,
    velocity: Vector4<f32>,
    position_var: Vector4<f32>,
    /// Inflated by `predict` only; the scalar gain corrects position, not velocity.
    velocity_var: Vector4<f32>,
}

impl FilterState {
    fn rect(&self) -> Rect {
        let p = &self.position;
        Rect::from_center(p[0], p[1], p[2].max(0.0), p[3].max(0.0))
    }
}

/// Per-track constant-velocity estimator.
///
/// `predict` must run exactly once per frame, matched or not; `update` then corrects
/// the prediction when a detection was associated.
#[derive(Debug, Clone)]
pub struct MotionFilter {
    config: MotionConfig,
    state: Option<FilterState>,
    frames_since_update: u32,
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl MotionFilter {
    /// Create an uninitialised filter; the first `update` seeds it.
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            state: None,
            frames_since_update: 0,
        }
    }

    /// Create a filter already seeded from `bbox` with zero velocity.
    pub fn initiate(config: MotionConfig, bbox: Rect) -> Self {
        let mut filter = Self::new(config);
        filter.update(bbox);
        filter
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Advance the state by one frame of open-loop motion.
    ///
    /// Returns `None` if the filter has never been seeded.
    pub fn predict(&mut self) -> Option<Rect> {
        let q = self.config.process_noise;
        let state = self.state.as_mut()?;

        state.position += state.velocity;
        state.position_var.add_scalar_mut(q);
        state.velocity_var.add_scalar_mut(q);
        self.frames_since_update = self.frames_since_update.saturating_add(1);

        Some(state.rect())
    }

    /// Correct the estimate with an observed box and return the corrected box.
    ///
    /// On an uninitialised filter this seeds the state and returns `observed` unchanged.
    pub fn update(&mut self, observed: Rect) -> Rect {
        let measurement = Vector4::from(observed.to_cxcywh());
        self.frames_since_update = 0;

        let Some(state) = self.state.as_mut() else {
            let p0 = self.config.initial_covariance;
            self.state = Some(FilterState {
                position: measurement,
                velocity: Vector4::zeros(),
                position_var: Vector4::repeat(p0),
                velocity_var: Vector4::repeat(p0),
            });
            return observed;
        };

        let r = self.config.measurement_noise;
        let alpha = self.config.velocity_smoothing;

        let gain = state.position_var.map(|p| p / (p + r));
        let correction = gain.component_mul(&(measurement - state.position));

        // Damped velocity: a noisy residual only nudges it.
        state.velocity = state.velocity * alpha + correction * (1.0 - alpha);
        state.position += correction;
        state.position_var = state
            .position_var
            .component_mul(&gain.map(|g| 1.0 - g));

        state.rect()
    }

    /// Current estimate, if seeded.
    pub fn rect(&self) -> Option<Rect> {
        self.state.as_ref().map(FilterState::rect)
    }

    /// Velocity of (cx, cy, w, h) per frame.
    pub fn velocity(&self) -> Option<[f32; 4]> {
        self.state.as_ref().map(|s| s.velocity.into())
    }

    /// Diagonal of the position covariance, for (cx, cy, w, h).
    pub fn position_variance(&self) -> Option<[f32; 4]> {
        self.state.as_ref().map(|s| s.position_var.into())
    }

    /// Diagonal of the velocity covariance, for (cx, cy, w, h).
    pub fn velocity_variance(&self) -> Option<[f32; 4]> {
        self.state.as_ref().map(|s| s.velocity_var.into())
    }

    pub fn frames_since_update(&self) -> u32 {
        self.frames_since_update
    }

    /// True once more than `prediction_horizon` predictions ran without a correction.
    ///
    /// Advisory for registry consumers; pruning uses the registry's miss streak and the
    /// lock-on controller keeps its own horizon.
    pub fn is_lost(&self) -> bool {
        self.frames_since_update > self.config.prediction_horizon
    }
}
