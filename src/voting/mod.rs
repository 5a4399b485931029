//! The vote-casting and tallying core.
//!
//! Every operation takes its stores, the caller's identity and the current
//! time as explicit arguments; nothing here reads a clock or ambient state.

use thiserror::Error;

use crate::model::common::election::{CandidateId, ElectionId, WindowState};
use crate::store::StoreError;

mod gate;
mod tally;

pub use gate::{cast_vote, is_open_for_voting, voting_status};
pub use tally::tally;

/// Why a ballot was not admitted.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Election {0} not found")]
    ElectionNotFound(ElectionId),
    #[error("Election {election_id} is not accepting ballots ({reason:?})")]
    VotingClosed {
        election_id: ElectionId,
        reason: WindowState,
    },
    #[error("Candidate {candidate_id} is not standing in election {election_id}")]
    InvalidCandidate {
        election_id: ElectionId,
        candidate_id: CandidateId,
    },
    #[error("Already voted in election {0}")]
    AlreadyVoted(ElectionId),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl VoteError {
    /// Could the same request succeed if tried again later?
    ///
    /// Only transient store failures qualify. Every other rejection is
    /// permanent for the given inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(err) if err.is_transient())
    }
}

/// Why a tally could not be produced.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("Election {0} not found")]
    ElectionNotFound(ElectionId),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Why an election lookup failed.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Election {0} not found")]
    ElectionNotFound(ElectionId),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}
