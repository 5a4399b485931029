use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    common::election::{CandidateId, ElectionId, WindowState},
    db::{
        candidate::Candidate,
        election::{Election, ElectionMetadata},
    },
};

/// Reasons an [`ElectionSpec`] can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionSpecError {
    #[error("End time {end_time} must be later than start time {start_time}")]
    Schedule {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    #[error("Candidate {0} listed more than once")]
    DuplicateCandidate(CandidateId),
}

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election title.
    pub title: String,
    /// Election description.
    #[serde(default)]
    pub description: String,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election end time (exclusive).
    pub end_time: DateTime<Utc>,
    /// Whether the election accepts ballots as soon as its window opens.
    #[serde(default)]
    pub is_active: bool,
    /// Candidate profiles standing in this election.
    #[serde(default)]
    pub candidates: Vec<CandidateId>,
}

impl ElectionSpec {
    /// Check the spec without consuming it.
    pub fn validate(&self) -> Result<(), ElectionSpecError> {
        if self.end_time <= self.start_time {
            return Err(ElectionSpecError::Schedule {
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            if !seen.insert(*candidate) {
                return Err(ElectionSpecError::DuplicateCandidate(*candidate));
            }
        }
        Ok(())
    }

    /// Convert this spec into a proper Election with the given unique ID.
    pub fn into_election(self, id: ElectionId) -> Result<Election, ElectionSpecError> {
        self.validate()?;
        Ok(Election {
            id,
            metadata: ElectionMetadata {
                title: self.title,
                description: self.description,
                start_time: self.start_time,
                end_time: self.end_time,
                is_active: self.is_active,
            },
            candidates: self.candidates,
        })
    }
}

/// An API-friendly election description, with candidate profiles resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    /// Candidates in the election's own order. Profiles that could not be
    /// found are omitted.
    pub candidates: Vec<Candidate>,
}

impl ElectionDescription {
    /// Describe an election, resolving its candidate IDs against `profiles`.
    pub fn new(election: Election, profiles: &HashMap<CandidateId, Candidate>) -> Self {
        let candidates = election
            .candidates
            .iter()
            .filter_map(|id| profiles.get(id).cloned())
            .collect();
        Self {
            id: election.id,
            title: election.metadata.title,
            description: election.metadata.description,
            start_time: election.metadata.start_time,
            end_time: election.metadata.end_time,
            is_active: election.metadata.is_active,
            candidates,
        }
    }
}

/// A summary of an election for listings, with its ballot count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub total_votes: u64,
}

impl ElectionSummary {
    pub fn new(election: Election, total_votes: u64) -> Self {
        Self {
            id: election.id,
            title: election.metadata.title,
            start_time: election.metadata.start_time,
            end_time: election.metadata.end_time,
            is_active: election.metadata.is_active,
            total_votes,
        }
    }
}

/// An active election as seen by one voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterElectionSummary {
    pub id: ElectionId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: WindowState,
    pub has_voted: bool,
}

/// Whether an election is currently accepting ballots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingStatus {
    pub open: bool,
    pub state: WindowState,
}

impl From<WindowState> for VotingStatus {
    fn from(state: WindowState) -> Self {
        Self {
            open: state.is_open(),
            state,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    impl ElectionSpec {
        pub fn current_example(candidates: Vec<CandidateId>) -> Self {
            let now = Utc::now();
            Self {
                title: "Student Council 2024".to_string(),
                description: "Annual council election".to_string(),
                start_time: now - Duration::days(1),
                end_time: now + Duration::days(6),
                is_active: true,
                candidates,
            }
        }
    }
}
