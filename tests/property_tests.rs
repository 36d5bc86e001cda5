//! Property-based tests for the controller.
//!
//! These tests use proptest to drive the controller with random input
//! sequences and random tick spacing, and check that the safety and service
//! properties hold on every tick.

use crossing::config::{ControllerConfig, RawTiming, TimingConfig};
use crossing::controller::Controller;
use crossing::core::{Aspect, IntersectionState, Signals, State};
use proptest::prelude::*;
use std::time::Duration;

prop_compose! {
    fn arbitrary_state()(variant in 0..6usize) -> IntersectionState {
        IntersectionState::ALL[variant]
    }
}

prop_compose! {
    /// One tick: time since the previous tick and the inputs sampled.
    fn arbitrary_tick()(
        step_ms in 10u64..1_500,
        vehicle_present in any::<bool>(),
        pedestrian_press in prop::bool::weighted(0.05),
    ) -> (Duration, Signals) {
        (
            Duration::from_millis(step_ms),
            Signals { vehicle_present, pedestrian_press },
        )
    }
}

fn successor(state: IntersectionState) -> IntersectionState {
    use IntersectionState::*;
    match state {
        MainGreen => MainYellow,
        MainYellow => AllRedMainToSide,
        AllRedMainToSide => SideGreen,
        SideGreen => SideYellow,
        SideYellow => AllRedSideToMain,
        AllRedSideToMain => MainGreen,
    }
}

/// Run the controller over `ticks`, calling `check` after every tick.
fn simulate<F>(ticks: &[(Duration, Signals)], mut check: F) -> Result<(), TestCaseError>
where
    F: FnMut(&Controller, Duration, crossing::TickReport) -> Result<(), TestCaseError>,
{
    let mut controller = Controller::new(&ControllerConfig::default(), Duration::ZERO);
    let mut now = Duration::ZERO;
    for (step, signals) in ticks {
        now += *step;
        let before = controller.state();
        let report = controller.tick(*signals, now);
        prop_assert_eq!(report.state, controller.state());
        if report.transition.is_none() {
            prop_assert_eq!(before, report.state);
        }
        check(&controller, now, report)?;
    }
    Ok(())
}

proptest! {
    #[test]
    fn state_name_is_stable(state in arbitrary_state()) {
        prop_assert_eq!(state.name(), state.name());
        prop_assert_eq!(state.to_string(), state.name());
    }

    #[test]
    fn aspects_never_conflict(state in arbitrary_state()) {
        let aspects = state.aspects();
        prop_assert!(aspects.main() == Aspect::Red || aspects.side() == Aspect::Red);
    }

    #[test]
    fn clearance_states_show_all_red(state in arbitrary_state()) {
        let aspects = state.aspects();
        let all_red = aspects.main() == Aspect::Red && aspects.side() == Aspect::Red;
        prop_assert_eq!(state.is_clearance(), all_red);
    }

    #[test]
    fn transitions_follow_the_cycle(ticks in prop::collection::vec(arbitrary_tick(), 1..400)) {
        simulate(&ticks, |_, _, report| {
            if let Some(t) = report.transition {
                prop_assert_eq!(t.to, successor(t.from));
            }
            Ok(())
        })?;
    }

    #[test]
    fn latches_only_change_in_main_green_or_on_side_entry(
        ticks in prop::collection::vec(arbitrary_tick(), 1..400)
    ) {
        let mut controller = Controller::new(&ControllerConfig::default(), Duration::ZERO);
        let mut now = Duration::ZERO;
        for (step, signals) in ticks {
            now += step;
            let state = controller.state();
            let latches = controller.latches();
            let report = controller.tick(signals, now);

            let entered_side = report
                .transition
                .as_ref()
                .is_some_and(|t| t.to == IntersectionState::SideGreen);

            if report.state.is_side_phase() {
                prop_assert!(!report.latches.any());
            }

            if entered_side {
                prop_assert!(!report.latches.any());
            } else if state != IntersectionState::MainGreen {
                prop_assert_eq!(report.latches, latches);
            } else {
                // Never cleared while the main road is green
                prop_assert!(!latches.car_request || report.latches.car_request);
                prop_assert!(!latches.pedestrian_request || report.latches.pedestrian_request);
            }
        }
    }

    #[test]
    fn side_minimum_follows_pedestrian_latch(
        ticks in prop::collection::vec(arbitrary_tick(), 1..400)
    ) {
        let timing = TimingConfig::default();
        let mut controller = Controller::new(&ControllerConfig::default(), Duration::ZERO);
        let mut now = Duration::ZERO;
        for (step, signals) in ticks {
            now += step;
            let pedestrian_pending = controller.latches().pedestrian_request;
            let report = controller.tick(signals, now);

            if report.transition.is_some_and(|t| t.to == IntersectionState::SideGreen) {
                let expected = if pedestrian_pending {
                    timing.side_pedestrian_time()
                } else {
                    timing.side_min_green_car()
                };
                prop_assert_eq!(controller.side_minimum(), expected);
            }
        }
    }

    #[test]
    fn green_dwell_bounds_hold(ticks in prop::collection::vec(arbitrary_tick(), 1..400)) {
        let timing = TimingConfig::default();
        simulate(&ticks, |controller, now, report| {
            match report.transition {
                Some(t) if t.from == IntersectionState::MainGreen => {
                    prop_assert!(t.dwell >= timing.min_main_green());
                }
                Some(t) if t.from == IntersectionState::SideGreen => {
                    prop_assert!(t.dwell >= controller.side_minimum().min(timing.side_max_green()));
                }
                None if report.state == IntersectionState::SideGreen => {
                    prop_assert!(controller.elapsed(now) < timing.side_max_green());
                }
                _ => {}
            }
            Ok(())
        })?;
    }

    #[test]
    fn main_green_returns_only_with_empty_approach(
        ticks in prop::collection::vec(arbitrary_tick(), 1..400)
    ) {
        simulate(&ticks, |_, _, report| {
            if report.transition.is_some_and(|t| t.to == IntersectionState::MainGreen) {
                prop_assert!(!report.car_present);
            }
            Ok(())
        })?;
    }

    #[test]
    fn continuous_presence_is_capped_by_max_green(extra_ms in 0u64..5_000) {
        let timing = TimingConfig::default();
        let mut controller = Controller::new(&ControllerConfig::default(), Duration::ZERO);
        let car = Signals { vehicle_present: true, pedestrian_press: false };

        let mut now = Duration::ZERO;
        while controller.state() != IntersectionState::SideGreen {
            now += Duration::from_millis(100);
            controller.tick(car, now);
        }
        let entered = now;

        let late = entered + timing.side_max_green() + Duration::from_millis(extra_ms);
        let report = controller.tick(car, late);
        prop_assert_eq!(report.state, IntersectionState::SideYellow);
    }

    #[test]
    fn validated_timing_orders_side_minimums(
        pedestrian in 0.0f64..30.0,
        car in 0.0f64..30.0,
        max_green in 0.0f64..60.0,
    ) {
        let raw = RawTiming {
            side_pedestrian_time: pedestrian,
            side_min_green_car: car,
            side_max_green: max_green,
            ..RawTiming::default()
        };

        match TimingConfig::try_from(raw) {
            Ok(timing) => {
                prop_assert!(timing.side_pedestrian_time() > timing.side_min_green_car());
                prop_assert!(timing.side_max_green() >= timing.side_pedestrian_time());
            }
            Err(_) => {
                let (pedestrian, car, max_green) = (
                    Duration::from_secs_f64(pedestrian),
                    Duration::from_secs_f64(car),
                    Duration::from_secs_f64(max_green),
                );
                prop_assert!(pedestrian <= car || max_green < pedestrian);
            }
        }
    }

    #[test]
    fn near_equal_side_minimums_are_rejected(
        car in 0.0f64..30.0,
        excess in 0.0f64..1e-10,
    ) {
        let raw = RawTiming {
            side_pedestrian_time: car + excess,
            side_min_green_car: car,
            side_max_green: 60.0,
            ..RawTiming::default()
        };

        if let Ok(timing) = TimingConfig::try_from(raw) {
            prop_assert!(timing.side_pedestrian_time() > timing.side_min_green_car());
        }
    }
}
