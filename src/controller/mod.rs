//! The intersection controller.
//!
//! [`Controller`] owns everything that persists between ticks: the current
//! state, when it was entered, the request latches, the presence tracker and
//! the committed side minimum. Each call to [`Controller::tick`] runs the
//! fixed order sample → latch update → guard evaluation → optional
//! transition → aspect derivation, with the samples and the time passed in
//! explicitly.

mod runner;

pub use runner::{AspectSink, LogSink, Runner, StatusFileSink};

use crate::config::{ControllerConfig, DetectionConfig, TimingConfig};
use crate::core::{
    side_minimum, AspectPair, GuardContext, IntersectionState, Presence, PresenceTracker,
    RequestLatches, Signals, StateHistory, StateTransition, TransitionTable,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// What happened during one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickReport {
    /// State after the tick.
    pub state: IntersectionState,
    /// Aspects to drive for the state after the tick.
    pub aspects: AspectPair,
    /// Transition taken during the tick, if any.
    pub transition: Option<StateTransition>,
    /// Latches after the tick, including any clear on side-green entry.
    pub latches: RequestLatches,
    /// Live presence seen during the tick.
    pub car_present: bool,
}

/// Serializable view of the controller for status files and diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct ControllerStatus {
    pub state: IntersectionState,
    pub aspects: AspectPair,
    pub elapsed: Duration,
    pub latches: RequestLatches,
    pub car_present: bool,
    pub side_minimum: Duration,
    pub recent_transitions: StateHistory,
    pub reported_at: DateTime<Utc>,
}

/// Two-phase intersection controller.
///
/// # Example
///
/// ```rust
/// use crossing::config::ControllerConfig;
/// use crossing::controller::Controller;
/// use crossing::core::{IntersectionState, Signals};
/// use std::time::Duration;
///
/// let mut controller = Controller::new(&ControllerConfig::default(), Duration::ZERO);
/// let press = Signals { vehicle_present: false, pedestrian_press: true };
///
/// controller.tick(press, Duration::from_secs(1));
/// assert_eq!(controller.state(), IntersectionState::MainGreen);
///
/// let report = controller.tick(Signals::default(), Duration::from_secs(5));
/// assert_eq!(report.state, IntersectionState::MainYellow);
/// ```
#[derive(Debug)]
pub struct Controller {
    table: TransitionTable,
    timing: TimingConfig,
    side_gap_time: Duration,
    tracker: PresenceTracker,
    state: IntersectionState,
    entered_at: Duration,
    latches: RequestLatches,
    car_present: bool,
    side_minimum: Duration,
    history: StateHistory,
}

impl Controller {
    /// Create a controller in `MainGreen`, entered at monotonic time `start`.
    pub fn new(config: &ControllerConfig, start: Duration) -> Self {
        Self::with_parts(config.timing, &config.detection, start)
    }

    /// Create a controller from timing and detection settings.
    pub fn with_parts(timing: TimingConfig, detection: &DetectionConfig, start: Duration) -> Self {
        Self {
            table: TransitionTable::new(&timing),
            timing,
            side_gap_time: detection.side_gap_time,
            tracker: PresenceTracker::new(detection.confirmation_delay),
            state: IntersectionState::default(),
            entered_at: start,
            latches: RequestLatches::default(),
            car_present: false,
            side_minimum: timing.side_min_green_car(),
            history: StateHistory::default(),
        }
    }

    /// Advance the controller by one tick taken at monotonic time `now`.
    pub fn tick(&mut self, signals: Signals, now: Duration) -> TickReport {
        let presence = self.tracker.observe(signals.vehicle_present, now);
        self.car_present = presence.car_present;
        self.update_latches(&presence, signals.pedestrian_press);

        let elapsed = self.elapsed(now);
        let ctx = GuardContext {
            elapsed,
            latches: self.latches,
            car_present: presence.car_present,
            gapped_out: presence.gapped_out(self.side_gap_time),
            side_minimum: self.side_minimum,
        };

        let step = self.table.step(self.state, &ctx);
        if step.enters_side_green() {
            self.side_minimum = side_minimum(&self.timing, self.latches.pedestrian_request);
            self.latches = RequestLatches::cleared();
        }
        let transition = step.cause.map(|cause| {
            let record = StateTransition {
                from: self.state,
                to: step.next,
                cause,
                dwell: elapsed,
                timestamp: Utc::now(),
            };
            self.enter(&record, now);
            record
        });

        if transition.is_none() {
            debug!(state = %self.state, elapsed_ms = elapsed.as_millis() as u64, "holding");
        }

        TickReport {
            state: self.state,
            aspects: self.state.aspects(),
            transition,
            latches: self.latches,
            car_present: self.car_present,
        }
    }

    /// Report for the current state without advancing, used to drive the
    /// initial aspects before the first tick.
    pub fn report(&self) -> TickReport {
        TickReport {
            state: self.state,
            aspects: self.state.aspects(),
            transition: None,
            latches: self.latches,
            car_present: self.car_present,
        }
    }

    fn update_latches(&mut self, presence: &Presence, pedestrian_press: bool) {
        let before = self.latches;
        self.latches = before.latched(self.state, presence.confirmed, pedestrian_press);

        if self.latches.pedestrian_request && !before.pedestrian_request {
            info!("pedestrian request latched");
        }
        if self.latches.car_request && !before.car_request {
            info!("vehicle request latched");
        }
    }

    fn enter(&mut self, record: &StateTransition, now: Duration) {
        info!(
            from = %record.from,
            to = %record.to,
            cause = %record.cause,
            dwell_ms = record.dwell.as_millis() as u64,
            "signal state changed"
        );
        if record.to == IntersectionState::SideGreen {
            info!(
                side_minimum_ms = self.side_minimum.as_millis() as u64,
                "side green minimum committed"
            );
        }

        self.state = record.to;
        self.entered_at = now;
        self.history.record(record.clone());
    }

    /// Current state.
    pub fn state(&self) -> IntersectionState {
        self.state
    }

    /// Aspects for the current state.
    pub fn aspects(&self) -> AspectPair {
        self.state.aspects()
    }

    /// Pending requests.
    pub fn latches(&self) -> RequestLatches {
        self.latches
    }

    /// Side-green minimum committed at the last side-green entry.
    pub fn side_minimum(&self) -> Duration {
        self.side_minimum
    }

    /// Dwell time in the current state as of `now`.
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.entered_at)
    }

    /// Recent transitions.
    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Signal timing in force.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Snapshot of the controller as of `now`.
    pub fn status(&self, now: Duration) -> ControllerStatus {
        ControllerStatus {
            state: self.state,
            aspects: self.state.aspects(),
            elapsed: self.elapsed(now),
            latches: self.latches,
            car_present: self.car_present,
            side_minimum: self.side_minimum,
            recent_transitions: self.history.clone(),
            reported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Aspect, TransitionCause};
    use IntersectionState::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn controller() -> Controller {
        Controller::new(&ControllerConfig::default(), Duration::ZERO)
    }

    fn car(present: bool) -> Signals {
        Signals {
            vehicle_present: present,
            pedestrian_press: false,
        }
    }

    fn press() -> Signals {
        Signals {
            vehicle_present: false,
            pedestrian_press: true,
        }
    }

    /// Drive the controller into `SideGreen` via the given request, returning
    /// the time of entry.
    fn reach_side_green(controller: &mut Controller, request: Signals) -> Duration {
        controller.tick(request, secs(1.0));
        controller.tick(Signals::default(), secs(5.0)); // -> MainYellow
        controller.tick(Signals::default(), secs(7.0)); // -> AllRedMainToSide
        let report = controller.tick(Signals::default(), secs(9.0)); // -> SideGreen
        assert_eq!(report.state, SideGreen);
        secs(9.0)
    }

    #[test]
    fn starts_in_main_green_with_main_aspect_green() {
        let controller = controller();
        assert_eq!(controller.state(), MainGreen);
        assert_eq!(controller.aspects().main(), Aspect::Green);
        assert_eq!(controller.aspects().side(), Aspect::Red);
        assert!(!controller.latches().any());
    }

    #[test]
    fn rests_in_main_green_without_demand() {
        let mut controller = controller();
        for t in 0..600 {
            let report = controller.tick(car(false), secs(t as f64));
            assert_eq!(report.state, MainGreen);
            assert!(report.transition.is_none());
        }
    }

    #[test]
    fn at_most_one_transition_per_tick() {
        let mut controller = controller();
        controller.tick(car(true), secs(1.0));

        // Long enough to satisfy every guard along the way
        let report = controller.tick(car(false), secs(1_000.0));
        assert_eq!(report.state, MainYellow);

        let report = controller.tick(car(false), secs(2_000.0));
        assert_eq!(report.state, AllRedMainToSide);
    }

    #[test]
    fn dwell_timer_resets_on_transition() {
        let mut controller = controller();
        controller.tick(car(true), secs(1.0));
        controller.tick(car(false), secs(5.0));

        assert_eq!(controller.state(), MainYellow);
        assert_eq!(controller.elapsed(secs(5.0)), Duration::ZERO);
        assert_eq!(controller.elapsed(secs(6.5)), secs(1.5));
    }

    #[test]
    fn side_green_entry_clears_latches() {
        let mut controller = controller();
        controller.tick(
            Signals {
                vehicle_present: true,
                pedestrian_press: true,
            },
            secs(1.0),
        );
        assert!(controller.latches().car_request);
        assert!(controller.latches().pedestrian_request);

        controller.tick(Signals::default(), secs(5.0));
        controller.tick(Signals::default(), secs(7.0));
        // Latches survive until the side street actually gets green
        assert!(controller.latches().any());

        let report = controller.tick(Signals::default(), secs(9.0));
        assert_eq!(report.state, SideGreen);
        assert!(!report.latches.any());
        assert!(!controller.latches().any());
    }

    #[test]
    fn requests_outside_main_green_are_ignored() {
        let mut controller = controller();
        let entered = reach_side_green(&mut controller, car(true));

        let report = controller.tick(
            Signals {
                vehicle_present: true,
                pedestrian_press: true,
            },
            entered + secs(0.5),
        );
        assert_eq!(report.state, SideGreen);
        assert!(!report.latches.any());
    }

    #[test]
    fn vehicle_call_commits_short_minimum() {
        let mut controller = controller();
        let entered = reach_side_green(&mut controller, car(true));
        assert_eq!(controller.side_minimum(), secs(4.0));

        controller.tick(car(false), entered + secs(3.9));
        assert_eq!(controller.state(), SideGreen);

        let report = controller.tick(car(false), entered + secs(4.0));
        assert_eq!(report.state, SideYellow);
        assert_eq!(
            report.transition.map(|t| t.cause),
            Some(TransitionCause::GapOut)
        );
    }

    #[test]
    fn pedestrian_call_commits_long_minimum() {
        let mut controller = controller();
        let entered = reach_side_green(&mut controller, press());
        assert_eq!(controller.side_minimum(), secs(8.0));

        controller.tick(car(false), entered + secs(7.9));
        assert_eq!(controller.state(), SideGreen);

        controller.tick(car(false), entered + secs(8.0));
        assert_eq!(controller.state(), SideYellow);
    }

    #[test]
    fn full_cycle_returns_to_main_green() {
        let mut controller = controller();
        let entered = reach_side_green(&mut controller, car(true));

        controller.tick(car(false), entered + secs(4.0)); // -> SideYellow
        controller.tick(car(false), entered + secs(6.0)); // -> AllRedSideToMain
        let report = controller.tick(car(false), entered + secs(8.0)); // -> MainGreen

        assert_eq!(report.state, MainGreen);
        assert_eq!(
            controller.history().get_path(),
            vec![
                MainGreen,
                MainYellow,
                AllRedMainToSide,
                SideGreen,
                SideYellow,
                AllRedSideToMain,
                MainGreen
            ]
        );
    }

    #[test]
    fn gap_time_extends_side_green() {
        let detection = DetectionConfig {
            side_gap_time: secs(2.5),
            ..DetectionConfig::default()
        };
        let mut controller = Controller::with_parts(TimingConfig::default(), &detection, Duration::ZERO);
        let entered = reach_side_green(&mut controller, car(true));

        controller.tick(car(true), entered + secs(3.0));
        controller.tick(car(false), entered + secs(4.0));
        assert_eq!(controller.state(), SideGreen);

        controller.tick(car(false), entered + secs(5.5));
        assert_eq!(controller.state(), SideYellow);
    }

    #[test]
    fn confirmation_delay_filters_brief_detections() {
        let detection = DetectionConfig {
            confirmation_delay: secs(1.0),
            ..DetectionConfig::default()
        };
        let mut controller = Controller::with_parts(TimingConfig::default(), &detection, Duration::ZERO);

        controller.tick(car(true), secs(1.0));
        controller.tick(car(false), secs(1.5));
        assert!(!controller.latches().car_request);

        controller.tick(car(true), secs(2.0));
        controller.tick(car(true), secs(3.0));
        assert!(controller.latches().car_request);
    }

    #[test]
    fn status_reflects_controller() {
        let mut controller = controller();
        controller.tick(press(), secs(1.0));

        let status = controller.status(secs(3.0));
        assert_eq!(status.state, MainGreen);
        assert_eq!(status.elapsed, secs(3.0));
        assert!(status.latches.pedestrian_request);
        assert!(status.recent_transitions.is_empty());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "MAIN_GREEN");
        assert_eq!(json["aspects"]["main"], "GREEN");
    }

    #[test]
    fn report_does_not_advance() {
        let mut controller = controller();
        controller.tick(car(true), secs(1.0));

        let report = controller.report();
        assert_eq!(report.state, MainGreen);
        assert!(report.transition.is_none());
        assert!(report.latches.car_request);
    }
}
