//! Crossing: a demand-actuated two-phase intersection controller
//!
//! The main road rests in green. A side-street vehicle or a pedestrian press
//! latches a request; once the main road has had its minimum green, the
//! controller runs yellow, all-red clearance and a side green whose minimum
//! depends on who asked, then clears back to the main road.
//!
//! The crate follows a "pure core, imperative shell" layout:
//!
//! - **core**: states, aspects, latches, guards and the transition table.
//!   Pure functions of their inputs; no clock, no I/O.
//! - **signals**: the presence channel, pedestrian inputs and the sampler
//!   that folds stale or missing data into "no vehicle".
//! - **controller**: the tick loop that owns the mutable state, and the
//!   sinks that drive outputs.
//! - **config**: JSON configuration validated into durations.
//!
//! # Example
//!
//! ```rust
//! use crossing::config::ControllerConfig;
//! use crossing::controller::Controller;
//! use crossing::core::{Aspect, IntersectionState, Signals};
//! use std::time::Duration;
//!
//! let mut controller = Controller::new(&ControllerConfig::default(), Duration::ZERO);
//! let car = Signals { vehicle_present: true, pedestrian_press: false };
//!
//! controller.tick(car, Duration::from_secs(1));
//! let report = controller.tick(Signals::default(), Duration::from_secs(5));
//!
//! assert_eq!(report.state, IntersectionState::MainYellow);
//! assert_eq!(report.aspects.main(), Aspect::Yellow);
//! assert_eq!(report.aspects.side(), Aspect::Red);
//! ```

pub mod config;
pub mod controller;
pub mod core;
pub mod logging;
pub mod signals;

// Re-export commonly used types
pub use config::ControllerConfig;
pub use controller::{Controller, TickReport};
pub use core::{Aspect, AspectPair, IntersectionState, Signals};
