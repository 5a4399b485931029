use std::collections::{hash_map::Entry, HashMap};
use std::sync::{Mutex, MutexGuard};

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
    mongodb::Id,
};

use super::{BallotStore, CommitError, ElectionDirectory, StoreError};

#[derive(Default)]
struct Tables {
    elections: HashMap<ElectionId, Election>,
    candidates: HashMap<CandidateId, Candidate>,
    ballots: HashMap<(ElectionId, VoterId), Ballot>,
    offline: bool,
}

/// A single-process store holding everything in memory.
///
/// Every operation takes the one table lock, so a commit's existence check
/// and insert cannot interleave with another commit. Only suitable when a
/// single process owns the data.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an election record.
    pub fn insert_election(&self, election: Election) {
        self.lock().elections.insert(election.id, election);
    }

    /// Add or replace a candidate profile.
    pub fn insert_candidate(&self, candidate: Candidate) {
        self.lock().candidates.insert(candidate.id, candidate);
    }

    /// Simulate the store going away (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave the maps half-written.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn online(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let tables = self.lock();
        if tables.offline {
            return Err(StoreError::Offline("memory store is offline".to_string()));
        }
        Ok(tables)
    }
}

#[rocket::async_trait]
impl ElectionDirectory for MemoryStore {
    async fn election(&self, election_id: ElectionId) -> Result<Option<Election>, StoreError> {
        Ok(self.online()?.elections.get(&election_id).cloned())
    }

    async fn candidates(
        &self,
        candidate_ids: &[CandidateId],
    ) -> Result<HashMap<CandidateId, Candidate>, StoreError> {
        let tables = self.online()?;
        Ok(candidate_ids
            .iter()
            .filter_map(|id| tables.candidates.get(id))
            .map(|candidate| (candidate.id, candidate.clone()))
            .collect())
    }
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn has_ballot(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .online()?
            .ballots
            .contains_key(&(election_id, voter_id)))
    }

    async fn commit(&self, ballot: NewBallot) -> Result<BallotId, CommitError> {
        let mut tables = self.online()?;
        match tables.ballots.entry((ballot.election_id, ballot.voter_id)) {
            Entry::Occupied(_) => Err(CommitError::Conflict {
                election_id: ballot.election_id,
                voter_id: ballot.voter_id,
            }),
            Entry::Vacant(slot) => {
                let id = Id::new();
                slot.insert(Ballot::from_new(id, ballot));
                Ok(id)
            }
        }
    }

    async fn list_by_election(&self, election_id: ElectionId) -> Result<Vec<Ballot>, StoreError> {
        Ok(self
            .online()?
            .ballots
            .values()
            .filter(|ballot| ballot.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn list_by_voter(&self, voter_id: VoterId) -> Result<Vec<Ballot>, StoreError> {
        let mut ballots: Vec<_> = self
            .online()?
            .ballots
            .values()
            .filter(|ballot| ballot.voter_id == voter_id)
            .cloned()
            .collect();
        ballots.sort_by(|a, b| b.cast_at.cmp(&a.cast_at));
        Ok(ballots)
    }
}
