//! Core controller types and logic.
//!
//! This module contains the pure functional core of the controller:
//! - The closed set of intersection states via the `State` trait
//! - Aspect mapping from state to the two displayed indications
//! - Request latches and the live presence tracker
//! - Guard predicates and the transition table
//! - Bounded history tracking
//!
//! Nothing in this module reads a clock or touches I/O. Time enters only as
//! `Duration` values handed in by the caller.

mod aspect;
mod guard;
mod history;
mod latches;
mod machine;
mod state;

pub use aspect::{Aspect, AspectPair};
pub use guard::{Guard, GuardContext};
pub use history::{StateHistory, StateTransition, DEFAULT_HISTORY_CAPACITY};
pub use latches::{Presence, PresenceTracker, RequestLatches, Signals};
pub use machine::{side_minimum, Step, Transition, TransitionCause, TransitionTable};
pub use state::{IntersectionState, State};
