//! Intersection states.
//!
//! The controller cycles through a closed set of six states. There is no
//! terminal state: once started the machine repeats the cycle until the
//! process exits.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Trait for controller states.
///
/// All methods are pure - no side effects. States are plain values that
/// describe where the controller currently is in its cycle.
///
/// # Required Traits
///
/// - `Copy`: States are recorded in history and status snapshots by value
/// - `PartialEq`: States must be comparable for transition lookup
/// - `Debug`: States must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: States appear in status files and history
pub trait State:
    Copy + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &'static str;

    /// Check if this is a clearance (all-red) interval.
    ///
    /// Default implementation returns `false`.
    fn is_clearance(&self) -> bool {
        false
    }
}

/// One of the six phases of the two-phase signal.
///
/// `MainGreen` is the initial state and the controller's default right of way.
///
/// # Example
///
/// ```rust
/// use crossing::core::{IntersectionState, State};
///
/// let state = IntersectionState::default();
/// assert_eq!(state, IntersectionState::MainGreen);
/// assert_eq!(state.name(), "MAIN_GREEN");
/// assert!(IntersectionState::AllRedSideToMain.is_clearance());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntersectionState {
    #[default]
    MainGreen,
    MainYellow,
    AllRedMainToSide,
    SideGreen,
    SideYellow,
    AllRedSideToMain,
}

impl IntersectionState {
    /// Every state, in cycle order.
    pub const ALL: [IntersectionState; 6] = [
        Self::MainGreen,
        Self::MainYellow,
        Self::AllRedMainToSide,
        Self::SideGreen,
        Self::SideYellow,
        Self::AllRedSideToMain,
    ];

    /// Check if this state belongs to the side-street half of the cycle,
    /// i.e. the half in which request latches must be clear.
    pub fn is_side_phase(&self) -> bool {
        matches!(
            self,
            Self::SideGreen | Self::SideYellow | Self::AllRedSideToMain
        )
    }
}

impl State for IntersectionState {
    fn name(&self) -> &'static str {
        match self {
            Self::MainGreen => "MAIN_GREEN",
            Self::MainYellow => "MAIN_YELLOW",
            Self::AllRedMainToSide => "ALL_RED_MAIN_TO_SIDE",
            Self::SideGreen => "SIDE_GREEN",
            Self::SideYellow => "SIDE_YELLOW",
            Self::AllRedSideToMain => "ALL_RED_SIDE_TO_MAIN",
        }
    }

    fn is_clearance(&self) -> bool {
        matches!(self, Self::AllRedMainToSide | Self::AllRedSideToMain)
    }
}

impl fmt::Display for IntersectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
