//! Controller configuration.
//!
//! Configuration is read once at startup from a JSON file whose durations
//! are floating-point seconds. Parsing produces a [`RawConfig`]; validation
//! checks every rule and reports ALL violations at once, so an operator can
//! fix a bad file in one pass. Only a validated [`ControllerConfig`], with
//! `Duration` fields, reaches the controller.
//!
//! # Example
//!
//! ```rust
//! use crossing::config::ControllerConfig;
//! use std::time::Duration;
//!
//! let config = ControllerConfig::from_json(r#"{ "timing": { "side_max_green": 20.0 } }"#).unwrap();
//! assert_eq!(config.timing.side_max_green(), Duration::from_secs(20));
//! assert_eq!(config.timing.min_main_green(), Duration::from_secs(5));
//!
//! let inverted = ControllerConfig::from_json(
//!     r#"{ "timing": { "side_pedestrian_time": 3.0, "side_max_green": 2.0 } }"#,
//! );
//! assert!(inverted.is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub mod error;

pub use error::{ConfigError, ConfigViolation};

/// Longest duration accepted for any setting.
pub const MAX_DURATION_SECS: f64 = 86_400.0;

/// Default channel file written by the vehicle detector.
pub const DEFAULT_PRESENCE_PATH: &str = "/tmp/side_detected.txt";

/// Default request file created by the pedestrian button service.
pub const DEFAULT_PEDESTRIAN_PATH: &str = "/tmp/pedestrian_request";

type Check = Validation<(), NonEmptyVec<ConfigViolation>>;

/// Signal timing as written in the configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawTiming {
    pub min_main_green: f64,
    pub main_yellow_time: f64,
    pub all_red_time: f64,
    pub side_pedestrian_time: f64,
    pub side_min_green_car: f64,
    pub side_max_green: f64,
}

impl Default for RawTiming {
    fn default() -> Self {
        Self {
            min_main_green: 5.0,
            main_yellow_time: 2.0,
            all_red_time: 2.0,
            side_pedestrian_time: 8.0,
            side_min_green_car: 4.0,
            side_max_green: 15.0,
        }
    }
}

impl RawTiming {
    fn check(&self) -> Check {
        let mut checks: Vec<Check> = vec![
            check_duration("min_main_green", self.min_main_green),
            check_duration("main_yellow_time", self.main_yellow_time),
            check_duration("all_red_time", self.all_red_time),
            check_duration("side_pedestrian_time", self.side_pedestrian_time),
            check_duration("side_min_green_car", self.side_min_green_car),
            check_duration("side_max_green", self.side_max_green),
        ];

        // Ordering rules compare the converted durations, since distinct
        // floats can round to the same nanosecond count.
        let pedestrian = checked_secs(self.side_pedestrian_time);
        let car = checked_secs(self.side_min_green_car);
        let max_green = checked_secs(self.side_max_green);

        if let (Some(pedestrian), Some(car)) = (pedestrian, car) {
            if pedestrian <= car {
                checks.push(Validation::fail(ConfigViolation::PedestrianNotLonger {
                    pedestrian: pedestrian.as_secs_f64(),
                    car: car.as_secs_f64(),
                }));
            }
        }
        if let (Some(max_green), Some(pedestrian)) = (max_green, pedestrian) {
            if max_green < pedestrian {
                checks.push(Validation::fail(
                    ConfigViolation::MaxGreenTruncatesPedestrian {
                        max_green: max_green.as_secs_f64(),
                        pedestrian: pedestrian.as_secs_f64(),
                    },
                ));
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }
}

/// Detection channel settings as written in the configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawDetection {
    pub presence_path: PathBuf,
    pub pedestrian_path: PathBuf,
    pub stale_after: f64,
    pub confirmation_delay: f64,
    pub side_gap_time: f64,
}

impl Default for RawDetection {
    fn default() -> Self {
        Self {
            presence_path: PathBuf::from(DEFAULT_PRESENCE_PATH),
            pedestrian_path: PathBuf::from(DEFAULT_PEDESTRIAN_PATH),
            stale_after: 1.0,
            confirmation_delay: 0.0,
            side_gap_time: 0.0,
        }
    }
}

impl RawDetection {
    fn check(&self) -> Check {
        let checks: Vec<Check> = vec![
            check_positive("stale_after", self.stale_after),
            check_duration("confirmation_delay", self.confirmation_delay),
            check_duration("side_gap_time", self.side_gap_time),
        ];
        Validation::all_vec(checks).map(|_| ())
    }
}

/// Complete configuration file, before validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub timing: RawTiming,
    pub detection: RawDetection,
    pub tick_interval: f64,
    pub status_path: Option<PathBuf>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            timing: RawTiming::default(),
            detection: RawDetection::default(),
            tick_interval: 0.1,
            status_path: None,
        }
    }
}

impl RawConfig {
    /// Check every rule, accumulating ALL violations.
    pub fn check(&self) -> Result<(), Vec<ConfigViolation>> {
        let checks: Vec<Check> = vec![
            self.timing.check(),
            self.detection.check(),
            check_positive("tick_interval", self.tick_interval),
        ];
        into_result(Validation::all_vec(checks).map(|_| ()))
    }

    /// Validate into a configuration the controller can run with.
    pub fn validate(self) -> Result<ControllerConfig, ConfigError> {
        self.check().map_err(ConfigError::Invalid)?;

        let detection = DetectionConfig {
            presence_path: self.detection.presence_path,
            pedestrian_path: self.detection.pedestrian_path,
            stale_after: secs(self.detection.stale_after),
            confirmation_delay: secs(self.detection.confirmation_delay),
            side_gap_time: secs(self.detection.side_gap_time),
        };

        Ok(ControllerConfig {
            timing: TimingConfig::from_checked(&self.timing),
            detection,
            tick_interval: secs(self.tick_interval),
            status_path: self.status_path,
        })
    }
}

/// Validated signal timing.
///
/// `side_pedestrian_time > side_min_green_car` and
/// `side_max_green >= side_pedestrian_time` always hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimingConfig {
    min_main_green: Duration,
    main_yellow_time: Duration,
    all_red_time: Duration,
    side_pedestrian_time: Duration,
    side_min_green_car: Duration,
    side_max_green: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::from_checked(&RawTiming::default())
    }
}

impl TryFrom<RawTiming> for TimingConfig {
    type Error = ConfigError;

    fn try_from(raw: RawTiming) -> Result<Self, Self::Error> {
        into_result(raw.check()).map_err(ConfigError::Invalid)?;
        Ok(Self::from_checked(&raw))
    }
}

impl TimingConfig {
    fn from_checked(raw: &RawTiming) -> Self {
        Self {
            min_main_green: secs(raw.min_main_green),
            main_yellow_time: secs(raw.main_yellow_time),
            all_red_time: secs(raw.all_red_time),
            side_pedestrian_time: secs(raw.side_pedestrian_time),
            side_min_green_car: secs(raw.side_min_green_car),
            side_max_green: secs(raw.side_max_green),
        }
    }

    /// Minimum main-road green before a side request can be served.
    pub fn min_main_green(&self) -> Duration {
        self.min_main_green
    }

    /// Yellow interval, used for both roads.
    pub fn main_yellow_time(&self) -> Duration {
        self.main_yellow_time
    }

    /// All-red clearance between conflicting greens.
    pub fn all_red_time(&self) -> Duration {
        self.all_red_time
    }

    /// Guaranteed side green for a pedestrian call.
    pub fn side_pedestrian_time(&self) -> Duration {
        self.side_pedestrian_time
    }

    /// Guaranteed side green for a vehicle-only call.
    pub fn side_min_green_car(&self) -> Duration {
        self.side_min_green_car
    }

    /// Cap on side green regardless of presence.
    pub fn side_max_green(&self) -> Duration {
        self.side_max_green
    }
}

/// Validated detection channel settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectionConfig {
    /// Channel file published by the vehicle detector.
    pub presence_path: PathBuf,
    /// Request file created once per pedestrian press.
    pub pedestrian_path: PathBuf,
    /// Presence older than this is treated as "no vehicle".
    pub stale_after: Duration,
    /// Continuous presence needed before a vehicle request latches.
    pub confirmation_delay: Duration,
    /// Continuous absence needed before side green gaps out.
    pub side_gap_time: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let raw = RawDetection::default();
        Self {
            presence_path: raw.presence_path,
            pedestrian_path: raw.pedestrian_path,
            stale_after: secs(raw.stale_after),
            confirmation_delay: secs(raw.confirmation_delay),
            side_gap_time: secs(raw.side_gap_time),
        }
    }
}

/// Validated controller configuration, immutable after startup.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControllerConfig {
    pub timing: TimingConfig,
    pub detection: DetectionConfig,
    /// Polling cadence of the controller loop.
    pub tick_interval: Duration,
    /// Optional status file re-written every tick.
    pub status_path: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            detection: DetectionConfig::default(),
            tick_interval: secs(RawConfig::default().tick_interval),
            status_path: None,
        }
    }
}

impl ControllerConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        raw.validate()
    }
}

fn check_duration(field: &'static str, value: f64) -> Check {
    if !value.is_finite() {
        Validation::fail(ConfigViolation::NotFinite { field })
    } else if value < 0.0 {
        Validation::fail(ConfigViolation::Negative { field, value })
    } else if value > MAX_DURATION_SECS {
        Validation::fail(ConfigViolation::TooLong {
            field,
            value,
            max: MAX_DURATION_SECS,
        })
    } else {
        Validation::success(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Check {
    if value == 0.0 {
        Validation::fail(ConfigViolation::NotPositive { field })
    } else {
        check_duration(field, value)
    }
}

fn into_result(check: Check) -> Result<(), Vec<ConfigViolation>> {
    match check {
        Validation::Success(_) => Ok(()),
        Validation::Failure(violations) => Err(violations.iter().cloned().collect()),
    }
}

// Only called on values that passed `check_duration`.
fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}

/// The duration `value` validates to, or `None` if `check_duration` rejects it.
fn checked_secs(value: f64) -> Option<Duration> {
    check_duration("", value).is_success().then(|| secs(value))
}
