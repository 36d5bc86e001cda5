//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions over the inputs of a single tick. They
//! are total: every guard yields a definite answer for every context.

use super::latches::RequestLatches;
use std::fmt;
use std::time::Duration;

/// Everything a guard may look at when deciding whether to leave a state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct GuardContext {
    /// Dwell time in the current state.
    pub elapsed: Duration,
    /// Request latches after this tick's update.
    pub latches: RequestLatches,
    /// Live vehicle presence on the side approach.
    pub car_present: bool,
    /// Side approach has been empty for the configured gap.
    pub gapped_out: bool,
    /// Side-green minimum committed when the side phase was called.
    pub side_minimum: Duration,
}

/// Pure predicate that determines if a transition can execute.
///
/// # Example
///
/// ```rust
/// use crossing::core::{Guard, GuardContext};
/// use std::time::Duration;
///
/// let guard = Guard::dwell_at_least(Duration::from_secs(5))
///     .and(Guard::new(|ctx| ctx.latches.any()));
///
/// let mut ctx = GuardContext {
///     elapsed: Duration::from_secs(6),
///     ..GuardContext::default()
/// };
/// assert!(!guard.check(&ctx));
///
/// ctx.latches.car_request = true;
/// assert!(guard.check(&ctx));
/// ```
pub struct Guard {
    predicate: Box<dyn Fn(&GuardContext) -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&GuardContext) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Guard that passes once the dwell time reaches `minimum`.
    pub fn dwell_at_least(minimum: Duration) -> Self {
        Self::new(move |ctx| ctx.elapsed >= minimum)
    }

    /// Guard that passes once the committed side minimum has been served.
    pub fn side_minimum_served() -> Self {
        Self::new(|ctx| ctx.elapsed >= ctx.side_minimum)
    }

    /// Guard that passes only when both guards pass.
    pub fn and(self, other: Guard) -> Self {
        Self::new(move |ctx| self.check(ctx) && other.check(ctx))
    }

    /// Check if the guard allows a transition for this context.
    pub fn check(&self, ctx: &GuardContext) -> bool {
        (self.predicate)(ctx)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
