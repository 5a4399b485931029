use serde::{Deserialize, Serialize};

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our candidate IDs are integers.
pub type CandidateId = u32;

/// Where an election currently sits relative to its voting window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowState {
    /// The start time has not yet been reached.
    NotYetOpen,
    /// Ballots are being accepted.
    Open,
    /// The end time has passed.
    Closed,
    /// An administrator has switched voting off, regardless of the schedule.
    Deactivated,
}

impl WindowState {
    /// Is voting permitted in this state?
    pub fn is_open(self) -> bool {
        self == WindowState::Open
    }
}
