//! Signal aspects derived from controller state.
//!
//! The only way to obtain an [`AspectPair`] is from an [`IntersectionState`],
//! so a conflicting pair (both roads green, or green facing yellow) cannot be
//! expressed at all.

use super::state::IntersectionState;
use serde::{Deserialize, Serialize};

/// Indication displayed to one road.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aspect {
    Red,
    Yellow,
    Green,
}

/// Main-road and side-street aspects for one instant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct AspectPair {
    main: Aspect,
    side: Aspect,
}

impl AspectPair {
    /// Aspect shown to the main road.
    pub fn main(&self) -> Aspect {
        self.main
    }

    /// Aspect shown to the side street.
    pub fn side(&self) -> Aspect {
        self.side
    }
}

impl From<IntersectionState> for AspectPair {
    fn from(state: IntersectionState) -> Self {
        state.aspects()
    }
}

impl IntersectionState {
    /// Map this state to the pair of aspects it displays.
    ///
    /// # Example
    ///
    /// ```rust
    /// use crossing::core::{Aspect, IntersectionState};
    ///
    /// let aspects = IntersectionState::SideYellow.aspects();
    /// assert_eq!(aspects.main(), Aspect::Red);
    /// assert_eq!(aspects.side(), Aspect::Yellow);
    /// ```
    pub const fn aspects(&self) -> AspectPair {
        let (main, side) = match self {
            Self::MainGreen => (Aspect::Green, Aspect::Red),
            Self::MainYellow => (Aspect::Yellow, Aspect::Red),
            Self::AllRedMainToSide => (Aspect::Red, Aspect::Red),
            Self::SideGreen => (Aspect::Red, Aspect::Green),
            Self::SideYellow => (Aspect::Red, Aspect::Yellow),
            Self::AllRedSideToMain => (Aspect::Red, Aspect::Red),
        };
        AspectPair { main, side }
    }
}
