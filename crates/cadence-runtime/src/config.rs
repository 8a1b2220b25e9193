//! Runtime loop configuration.
//!
//! All fields have defaults matching a 60 Hz fixed update with one-second
//! CPU sampling, so an empty JSON object is a valid configuration:
//!
//! ```
//! use cadence_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json_str(r#"{ "update_hz": 30.0 }"#).unwrap();
//! assert!((config.frame_time_ms() - 1000.0 / 30.0).abs() < 1e-12);
//! assert!(config.cpu_sampling);
//! ```

use std::path::Path;

use cadence_timing::{DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_UPDATE_HZ, MAX_DELTA_FACTOR};
use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// Configuration for the [`RuntimeLoop`](crate::runtime::RuntimeLoop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fixed update rate in ticks per second.
    pub update_hz: f64,
    /// Upper bound for the timestep's delta factor.
    pub max_delta_factor: f64,
    /// CPU utilization sampling cadence in milliseconds.
    pub sample_interval_ms: f64,
    /// When false the utilization sampler starts disabled and reports 0%.
    pub cpu_sampling: bool,
    /// Treat a held Escape key like a window close.
    pub escape_closes: bool,
    /// Optional cap on inner-loop iterations. The iteration that reaches the
    /// cap closes the window instead of updating, so a cap of N runs exactly
    /// N inner iterations.
    pub max_iterations: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            update_hz: DEFAULT_UPDATE_HZ,
            max_delta_factor: MAX_DELTA_FACTOR,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            cpu_sampling: true,
            escape_closes: true,
            max_iterations: None,
        }
    }
}

impl RuntimeConfig {
    /// Fixed frame time in milliseconds (`1000 / update_hz`).
    pub fn frame_time_ms(&self) -> f64 {
        1000.0 / self.update_hz
    }

    /// Check that rates, intervals and factors are positive and finite.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        check_positive("update_hz", self.update_hz)?;
        if !self.frame_time_ms().is_finite() {
            return Err(RuntimeError::InvalidConfig {
                field: "update_hz",
                details: format!("frame time 1000 / {} is not finite", self.update_hz),
            });
        }
        check_positive("max_delta_factor", self.max_delta_factor)?;
        check_positive("sample_interval_ms", self.sample_interval_ms)?;
        if self.max_iterations == Some(0) {
            return Err(RuntimeError::InvalidConfig {
                field: "max_iterations",
                details: "must be at least 1 when set".to_owned(),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "runtime config loaded");
        Ok(config)
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), RuntimeError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(RuntimeError::InvalidConfig {
            field,
            details: format!("must be positive and finite, got {value}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_60hz() {
        let config = RuntimeConfig::default();
        assert!((config.frame_time_ms() - 1000.0 / 60.0).abs() < f64::EPSILON);
        assert_eq!(config.max_delta_factor, 1.0);
        assert_eq!(config.sample_interval_ms, 1000.0);
        assert!(config.escape_closes);
        assert!(config.max_iterations.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn empty_object_is_default() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let config = RuntimeConfig {
            update_hz: 120.0,
            cpu_sampling: false,
            max_iterations: Some(500),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn rejects_non_positive_rate() {
        let err = RuntimeConfig::from_json_str(r#"{ "update_hz": 0.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidConfig {
                field: "update_hz",
                ..
            }
        ));
    }

    #[test]
    fn rejects_rate_whose_frame_time_overflows() {
        let config = RuntimeConfig {
            update_hz: 1e-320,
            ..Default::default()
        };
        assert!(config.frame_time_ms().is_infinite());
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::InvalidConfig {
                field: "update_hz",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_iteration_cap() {
        let config = RuntimeConfig {
            max_iterations: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_wrong_types() {
        let err = RuntimeConfig::from_json_str(r#"{ "update_hz": "fast" }"#).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuntimeConfig::from_path("/definitely/not/here/cadence.json").unwrap_err();
        assert!(matches!(err, RuntimeError::Io(_)));
    }
}
