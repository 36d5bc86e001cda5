//! Transition table for the two-phase signal.
//!
//! The table is built once from validated timing and evaluated once per
//! tick. Evaluation is a pure function of the current state and the guard
//! context: it never reads a clock and never mutates anything.

use super::guard::{Guard, GuardContext};
use super::state::IntersectionState;
use crate::config::TimingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a transition fired.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Main-road minimum served with a side request pending.
    ServiceRequested,
    /// Yellow interval elapsed.
    YellowElapsed,
    /// All-red clearance elapsed toward the side street.
    ClearanceElapsed,
    /// Side minimum served and the approach emptied.
    GapOut,
    /// Side green reached its cap.
    MaxGreen,
    /// All-red clearance elapsed and the side approach is empty.
    SideCleared,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ServiceRequested => "service requested",
            Self::YellowElapsed => "yellow elapsed",
            Self::ClearanceElapsed => "clearance elapsed",
            Self::GapOut => "gap out",
            Self::MaxGreen => "max green reached",
            Self::SideCleared => "side approach cleared",
        };
        f.write_str(text)
    }
}

/// A guarded edge of the state graph.
#[derive(Debug)]
pub struct Transition {
    pub from: IntersectionState,
    pub to: IntersectionState,
    pub guard: Guard,
    pub cause: TransitionCause,
}

impl Transition {
    /// Check if this transition can execute from `current` (pure).
    pub fn can_execute(&self, current: IntersectionState, ctx: &GuardContext) -> bool {
        current == self.from && self.guard.check(ctx)
    }
}

/// Outcome of evaluating the table for one tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Step {
    /// State after this tick; equal to the input state if nothing fired.
    pub next: IntersectionState,
    /// Cause of the transition, if one fired.
    pub cause: Option<TransitionCause>,
}

impl Step {
    /// Check if a transition fired.
    pub fn transitioned(&self) -> bool {
        self.cause.is_some()
    }

    /// Check if this step enters `SideGreen`, the instant latches clear.
    pub fn enters_side_green(&self) -> bool {
        self.transitioned() && self.next == IntersectionState::SideGreen
    }
}

/// Guarded transitions in priority order.
#[derive(Debug)]
pub struct TransitionTable {
    transitions: Vec<Transition>,
}

impl TransitionTable {
    /// Build the signal plan for the given timing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use crossing::config::TimingConfig;
    /// use crossing::core::{GuardContext, IntersectionState, TransitionCause, TransitionTable};
    /// use std::time::Duration;
    ///
    /// let table = TransitionTable::new(&TimingConfig::default());
    /// let ctx = GuardContext {
    ///     elapsed: Duration::from_secs(2),
    ///     ..GuardContext::default()
    /// };
    ///
    /// let step = table.step(IntersectionState::MainYellow, &ctx);
    /// assert_eq!(step.next, IntersectionState::AllRedMainToSide);
    /// assert_eq!(step.cause, Some(TransitionCause::YellowElapsed));
    /// ```
    pub fn new(timing: &TimingConfig) -> Self {
        use IntersectionState::*;

        let transitions = vec![
            Transition {
                from: MainGreen,
                to: MainYellow,
                guard: Guard::dwell_at_least(timing.min_main_green())
                    .and(Guard::new(|ctx| ctx.latches.any())),
                cause: TransitionCause::ServiceRequested,
            },
            Transition {
                from: MainYellow,
                to: AllRedMainToSide,
                guard: Guard::dwell_at_least(timing.main_yellow_time()),
                cause: TransitionCause::YellowElapsed,
            },
            Transition {
                from: AllRedMainToSide,
                to: SideGreen,
                guard: Guard::dwell_at_least(timing.all_red_time()),
                cause: TransitionCause::ClearanceElapsed,
            },
            Transition {
                from: SideGreen,
                to: SideYellow,
                guard: Guard::side_minimum_served().and(Guard::new(|ctx| ctx.gapped_out)),
                cause: TransitionCause::GapOut,
            },
            Transition {
                from: SideGreen,
                to: SideYellow,
                guard: Guard::dwell_at_least(timing.side_max_green()),
                cause: TransitionCause::MaxGreen,
            },
            Transition {
                from: SideYellow,
                to: AllRedSideToMain,
                guard: Guard::dwell_at_least(timing.main_yellow_time()),
                cause: TransitionCause::YellowElapsed,
            },
            Transition {
                from: AllRedSideToMain,
                to: MainGreen,
                guard: Guard::dwell_at_least(timing.all_red_time())
                    .and(Guard::new(|ctx| !ctx.car_present)),
                cause: TransitionCause::SideCleared,
            },
        ];

        Self { transitions }
    }

    /// Evaluate at most one transition out of `state`.
    pub fn step(&self, state: IntersectionState, ctx: &GuardContext) -> Step {
        match self.transitions.iter().find(|t| t.can_execute(state, ctx)) {
            Some(transition) => Step {
                next: transition.to,
                cause: Some(transition.cause),
            },
            None => Step {
                next: state,
                cause: None,
            },
        }
    }

    /// Transitions leaving `state`, in evaluation order.
    pub fn transitions_from(
        &self,
        state: IntersectionState,
    ) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter().filter(move |t| t.from == state)
    }
}

/// Side-green minimum committed when the side phase is called.
///
/// A pedestrian call always gets the longer crossing window, even when a
/// vehicle was requesting too.
pub fn side_minimum(timing: &TimingConfig, pedestrian_call: bool) -> Duration {
    if pedestrian_call {
        timing.side_pedestrian_time()
    } else {
        timing.side_min_green_car()
    }
}
