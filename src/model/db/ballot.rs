use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        ballot::{BallotId, VoterId},
        election::{CandidateId, ElectionId},
    },
    mongodb::Id,
};

/// Core ballot data, as stored in the database.
///
/// Ballots are immutable once committed; there is no update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    /// Foreign Key election ID.
    pub election_id: ElectionId,
    /// The voter who cast this ballot.
    pub voter_id: VoterId,
    /// Foreign Key candidate ID.
    pub candidate_id: CandidateId,
    /// When the ballot was admitted.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A ballot without an ID, ready for insertion.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: BallotId,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Ballot {
    /// Attach an ID to a new ballot.
    pub fn from_new(id: Id, ballot: NewBallot) -> Self {
        Self { id, ballot }
    }
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}
