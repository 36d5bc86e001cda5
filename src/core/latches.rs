//! Request latches and the live presence tracker.
//!
//! Latches remember a momentary detection or button press until the
//! controller serves it. They can only be set while the main road is green
//! and are cleared together when the side street receives green.

use super::state::IntersectionState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inputs sampled once per tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Signals {
    /// Vehicle currently present on the side-street approach.
    pub vehicle_present: bool,
    /// A pedestrian press arrived since the previous tick.
    pub pedestrian_press: bool,
}

/// Pending requests for side-street service.
///
/// # Example
///
/// ```rust
/// use crossing::core::{IntersectionState, RequestLatches};
///
/// let latches = RequestLatches::default().latched(IntersectionState::MainGreen, false, true);
/// assert!(latches.pedestrian_request);
///
/// // Presses outside MAIN_GREEN are ignored
/// let ignored = RequestLatches::default().latched(IntersectionState::SideGreen, true, true);
/// assert!(!ignored.any());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct RequestLatches {
    pub car_request: bool,
    pub pedestrian_request: bool,
}

impl RequestLatches {
    /// Check if either request is pending.
    pub fn any(&self) -> bool {
        self.car_request || self.pedestrian_request
    }

    /// Return the latches after folding in this tick's inputs.
    ///
    /// Latches only ever go from false to true here, and only while the
    /// main road is green. Outside `MainGreen` the latches are returned
    /// unchanged.
    pub fn latched(
        self,
        state: IntersectionState,
        car_confirmed: bool,
        pedestrian_press: bool,
    ) -> Self {
        if state != IntersectionState::MainGreen {
            return self;
        }
        Self {
            car_request: self.car_request || car_confirmed,
            pedestrian_request: self.pedestrian_request || pedestrian_press,
        }
    }

    /// Both latches cleared.
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Live view of the side-street approach for one tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Presence {
    /// Mirrors the sampled vehicle signal; never latched.
    pub car_present: bool,
    /// Presence has lasted long enough to count as a request.
    pub confirmed: bool,
    /// Time since a vehicle was last seen; `None` if none has been seen yet.
    pub absent_for: Option<Duration>,
}

impl Presence {
    /// Check if the approach has been empty for at least `gap`.
    ///
    /// With a zero gap this is exactly `!car_present`.
    pub fn gapped_out(&self, gap: Duration) -> bool {
        !self.car_present && self.absent_for.map_or(true, |absent| absent >= gap)
    }
}

/// Tracks how long the vehicle signal has been continuously on or off.
#[derive(Clone, Debug)]
pub struct PresenceTracker {
    confirmation_delay: Duration,
    first_seen: Option<Duration>,
    last_seen: Option<Duration>,
}

impl PresenceTracker {
    /// Create a tracker that confirms presence after `confirmation_delay`
    /// of continuous detection.
    pub fn new(confirmation_delay: Duration) -> Self {
        Self {
            confirmation_delay,
            first_seen: None,
            last_seen: None,
        }
    }

    /// Fold one sample taken at monotonic time `now` into the tracker.
    pub fn observe(&mut self, vehicle_present: bool, now: Duration) -> Presence {
        if vehicle_present {
            self.last_seen = Some(now);
            let first_seen = *self.first_seen.get_or_insert(now);
            Presence {
                car_present: true,
                confirmed: now.saturating_sub(first_seen) >= self.confirmation_delay,
                absent_for: Some(Duration::ZERO),
            }
        } else {
            self.first_seen = None;
            Presence {
                car_present: false,
                confirmed: false,
                absent_for: self.last_seen.map(|seen| now.saturating_sub(seen)),
            }
        }
    }
}
