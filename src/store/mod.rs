//! Persistence seams for the voting core.
//!
//! The gate and the tally only ever see ballots and elections through these
//! traits, so the same logic runs against MongoDB in production and against
//! an in-memory store in tests.

use std::collections::HashMap;

use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::model::{
    common::{
        ballot::{BallotId, VoterId},
        election::{CandidateId, ElectionId},
    },
    db::{
        ballot::{Ballot, NewBallot},
        candidate::Candidate,
        election::Election,
    },
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A failure of the store itself rather than of the request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Store offline: {0}")]
    Offline(String),
    /// The store answered, but with something that breaks its own contract.
    #[error("Store returned malformed data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the failure may clear up by itself, so retrying makes sense.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Corrupt(_))
    }
}

/// Why a ballot commit did not happen.
#[derive(Debug, Error)]
pub enum CommitError {
    /// A ballot already exists for this (election, voter) pair.
    #[error("A ballot already exists for voter {voter_id} in election {election_id}")]
    Conflict {
        election_id: ElectionId,
        voter_id: VoterId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read access to election and candidate records.
#[rocket::async_trait]
pub trait ElectionDirectory: Send + Sync {
    /// Look up an election by ID.
    async fn election(&self, election_id: ElectionId) -> Result<Option<Election>, StoreError>;

    /// Look up candidate profiles by ID. Unknown IDs are simply absent from the result.
    async fn candidates(
        &self,
        candidate_ids: &[CandidateId],
    ) -> Result<HashMap<CandidateId, Candidate>, StoreError>;
}

/// The durable record of cast ballots.
///
/// Implementations must make [`BallotStore::commit`] check-and-insert as one
/// indivisible step: of any number of concurrent commits for the same
/// `(election_id, voter_id)`, exactly one succeeds.
#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    /// Has this voter already cast a ballot in this election?
    ///
    /// Advisory only; a `false` here can be stale by the time you act on it.
    async fn has_ballot(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
    ) -> Result<bool, StoreError>;

    /// Insert a ballot, unless one already exists for its (election, voter) pair.
    async fn commit(&self, ballot: NewBallot) -> Result<BallotId, CommitError>;

    /// All ballots for one election, in no particular order.
    async fn list_by_election(&self, election_id: ElectionId) -> Result<Vec<Ballot>, StoreError>;

    /// All ballots cast by one voter, newest first.
    async fn list_by_voter(&self, voter_id: VoterId) -> Result<Vec<Ballot>, StoreError>;

    /// The number of ballots for one election.
    async fn count_by_election(&self, election_id: ElectionId) -> Result<u64, StoreError> {
        Ok(self.list_by_election(election_id).await?.len() as u64)
    }
}
