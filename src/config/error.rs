//! Configuration error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single broken rule in a configuration file.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigViolation {
    #[error("{field} must be a finite number of seconds")]
    NotFinite { field: &'static str },

    #[error("{field} must not be negative (got {value}s)")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} of {value}s exceeds the {max}s limit")]
    TooLong {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error(
        "side_pedestrian_time ({pedestrian}s) must be greater than side_min_green_car ({car}s)"
    )]
    PedestrianNotLonger { pedestrian: f64, car: f64 },

    #[error("side_max_green ({max_green}s) must be at least side_pedestrian_time ({pedestrian}s)")]
    MaxGreenTruncatesPedestrian { max_green: f64, pedestrian: f64 },
}

/// Errors that prevent the controller from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration parsed but breaks one or more rules.
    #[error("invalid configuration: {}", join_violations(.0))]
    Invalid(Vec<ConfigViolation>),
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
