use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        ballot::BallotId,
        election::{CandidateId, ElectionId},
    },
    db::ballot::Ballot,
};

/// The candidate a voter wishes to vote for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate_id: CandidateId,
}

/// Confirmation of an admitted ballot, returned to the voter who cast it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotReceipt {
    pub ballot_id: BallotId,
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub cast_at: DateTime<Utc>,
}

impl From<Ballot> for BallotReceipt {
    fn from(ballot: Ballot) -> Self {
        Self {
            ballot_id: ballot.id,
            election_id: ballot.ballot.election_id,
            candidate_id: ballot.ballot.candidate_id,
            cast_at: ballot.ballot.cast_at,
        }
    }
}
