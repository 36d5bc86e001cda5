//! Signal sampling: the controller's view of the outside world.
//!
//! The [`SignalSampler`] reads the vehicle-presence channel and the pedestrian
//! input once per tick without ever blocking. Presence that is missing,
//! unreadable, or older than the staleness bound is reported as "no vehicle":
//! a stalled detector biases the intersection back toward the main road.

mod clock;
mod error;
mod pedestrian;
mod presence;

pub use crate::core::Signals;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::SamplerError;
pub use pedestrian::{PedestrianInput, PedestrianRequestFile, PressLatch, RisingEdge};
pub(crate) use presence::replace_file;
pub use presence::{
    presence_channel, publish_presence_file, FilePresenceSource, PresenceCell, PresencePublisher,
    PresenceReading, PresenceSource,
};

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Condition of the vehicle-presence channel as of the last sample.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelHealth {
    /// A value within the staleness bound was read.
    Fresh,
    /// The last published value is older than the staleness bound.
    Stale,
    /// Nothing has been published.
    Silent,
    /// The channel could not be read, held garbage, or was stamped in the
    /// future.
    Faulty,
}

/// Samples both inputs for one tick.
///
/// # Example
///
/// ```rust
/// use crossing::signals::{presence_channel, PressLatch, SignalSampler};
/// use std::time::Duration;
///
/// let (publisher, cell) = presence_channel();
/// let button = PressLatch::new();
/// let mut sampler = SignalSampler::new(cell, button.clone(), Duration::from_secs(1));
///
/// publisher.publish(true, Duration::from_secs(10));
/// button.press();
///
/// let signals = sampler.sample(Duration::from_millis(10_500));
/// assert!(signals.vehicle_present);
/// assert!(signals.pedestrian_press);
///
/// // Two seconds without a refresh: fail safe to "no vehicle"
/// let signals = sampler.sample(Duration::from_secs(12));
/// assert!(!signals.vehicle_present);
/// assert!(!signals.pedestrian_press);
/// ```
pub struct SignalSampler<P, B> {
    presence: P,
    pedestrian: B,
    stale_after: Duration,
    health: Option<ChannelHealth>,
}

impl<P: PresenceSource, B: PedestrianInput> SignalSampler<P, B> {
    pub fn new(presence: P, pedestrian: B, stale_after: Duration) -> Self {
        Self {
            presence,
            pedestrian,
            stale_after,
            health: None,
        }
    }

    /// Read both inputs at monotonic time `now`.
    pub fn sample(&mut self, now: Duration) -> Signals {
        let vehicle_present = self.sample_presence(now);
        let pedestrian_press = self.pedestrian.take_press();
        Signals {
            vehicle_present,
            pedestrian_press,
        }
    }

    /// Health of the presence channel at the last sample; `None` before the
    /// first sample.
    pub fn health(&self) -> Option<ChannelHealth> {
        self.health
    }

    fn sample_presence(&mut self, now: Duration) -> bool {
        match self.presence.latest(now) {
            Ok(reading) if reading.age <= self.stale_after => {
                self.set_health(ChannelHealth::Fresh, || {
                    info!("vehicle presence channel is fresh");
                });
                reading.present
            }
            Ok(reading) => {
                let stale_after = self.stale_after;
                self.set_health(ChannelHealth::Stale, || {
                    warn!(
                        age_ms = reading.age.as_millis() as u64,
                        limit_ms = stale_after.as_millis() as u64,
                        "vehicle presence is stale, assuming no vehicle"
                    );
                });
                false
            }
            Err(SamplerError::NoData) => {
                self.set_health(ChannelHealth::Silent, || {
                    warn!("no vehicle presence published yet, assuming no vehicle");
                });
                false
            }
            Err(e) => {
                self.set_health(ChannelHealth::Faulty, || {
                    warn!(error = %e, "vehicle presence unavailable, assuming no vehicle");
                });
                false
            }
        }
    }

    fn set_health(&mut self, health: ChannelHealth, on_change: impl FnOnce()) {
        if self.health != Some(health) {
            on_change();
            self.health = Some(health);
        }
    }
}
