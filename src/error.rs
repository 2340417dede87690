//! Error type shared by configuration validation and the tracking worker.

use thiserror::Error;

/// Errors surfaced by the tracking crate.
///
/// Per-frame tracking never fails; degenerate input is handled by policy (zero descriptors,
/// dropped detections, `false` from a tap). Only setup and worker plumbing return this.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to start tracking worker: {0}")]
    WorkerSpawn(String),

    #[error("tracking worker is no longer running")]
    WorkerDisconnected,
}

impl TrackerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Checks that `value` is a finite number in `[0, 1]`.
pub(crate) fn ensure_unit_interval(field: &'static str, value: f32) -> Result<(), TrackerError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrackerError::invalid(
            field,
            format!("expected a value in [0, 1], got {value}"),
        ))
    }
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), TrackerError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::invalid(
            field,
            format!("expected a positive value, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_interval() {
        assert!(ensure_unit_interval("x", 0.5).is_ok());
        assert!(ensure_unit_interval("x", 1.0).is_ok());
        assert!(ensure_unit_interval("x", 1.5).is_err());
        assert!(ensure_unit_interval("x", f32::NAN).is_err());
    }

    #[test]
    fn test_error_message() {
        let err = TrackerError::invalid("iou_threshold", "too large");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `iou_threshold`: too large"
        );
    }
}
