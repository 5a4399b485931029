use std::collections::HashMap;

use mongodb::{bson::doc, options::FindOptions, Database};
use rocket::{
    futures::TryStreamExt,
    request::{self, FromRequest, Request},
    State,
};

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
    mongodb::{is_duplicate_key_error, u32_id_filter, Coll},
};

use super::{BallotStore, CommitError, ElectionDirectory, StoreError};

/// The production store, backed by MongoDB.
///
/// Ballot uniqueness is enforced by the unique `(election_id, voter_id)`
/// index created in [`crate::model::mongodb::ensure_indexes_exist`], so a
/// commit is a single insert that the database either accepts or rejects.
#[derive(Clone)]
pub struct MongoStore {
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    new_ballots: Coll<NewBallot>,
}

impl MongoStore {
    /// Get a handle on the store collections in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self {
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            ballots: Coll::from_db(db),
            new_ballots: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MongoStore {
    type Error = ();

    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(MongoStore::from_db(db))
    }
}

#[rocket::async_trait]
impl ElectionDirectory for MongoStore {
    async fn election(&self, election_id: ElectionId) -> Result<Option<Election>, StoreError> {
        Ok(self
            .elections
            .find_one(u32_id_filter(election_id), None)
            .await?)
    }

    async fn candidates(
        &self,
        candidate_ids: &[CandidateId],
    ) -> Result<HashMap<CandidateId, Candidate>, StoreError> {
        let filter = doc! {
            "_id": { "$in": candidate_ids },
        };
        let profiles = self
            .candidates
            .find(filter, None)
            .await?
            .map_ok(|candidate| (candidate.id, candidate))
            .try_collect()
            .await?;
        Ok(profiles)
    }
}

#[rocket::async_trait]
impl BallotStore for MongoStore {
    async fn has_ballot(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
    ) -> Result<bool, StoreError> {
        let filter = doc! {
            "election_id": election_id,
            "voter_id": voter_id,
        };
        Ok(self.ballots.find_one(filter, None).await?.is_some())
    }

    async fn commit(&self, ballot: NewBallot) -> Result<BallotId, CommitError> {
        let election_id = ballot.election_id;
        let voter_id = ballot.voter_id;
        match self.new_ballots.insert_one(&ballot, None).await {
            Ok(result) => {
                let id = result.inserted_id.as_object_id().ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "ballot insert returned a non-ObjectId key: {}",
                        result.inserted_id
                    ))
                })?;
                Ok(id.into())
            }
            Err(e) if is_duplicate_key_error(&e) => Err(CommitError::Conflict {
                election_id,
                voter_id,
            }),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn list_by_election(&self, election_id: ElectionId) -> Result<Vec<Ballot>, StoreError> {
        let filter = doc! {
            "election_id": election_id,
        };
        Ok(self.ballots.find(filter, None).await?.try_collect().await?)
    }

    async fn list_by_voter(&self, voter_id: VoterId) -> Result<Vec<Ballot>, StoreError> {
        let filter = doc! {
            "voter_id": voter_id,
        };
        let newest_first = FindOptions::builder().sort(doc! { "cast_at": -1 }).build();
        Ok(self
            .ballots
            .find(filter, newest_first)
            .await?
            .try_collect()
            .await?)
    }

    async fn count_by_election(&self, election_id: ElectionId) -> Result<u64, StoreError> {
        let filter = doc! {
            "election_id": election_id,
        };
        Ok(self.ballots.count_documents(filter, None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use rocket::futures::future::join_all;

    use crate::model::mongodb::Id;

    fn new_ballot(election_id: ElectionId, voter_id: VoterId, candidate_id: CandidateId) -> NewBallot {
        NewBallot {
            election_id,
            voter_id,
            candidate_id,
            cast_at: Utc::now(),
        }
    }

    #[backend_test]
    async fn duplicate_commit_conflicts(db: Database) {
        let store = MongoStore::from_db(&db);
        let voter = Id::new();

        let first = store.commit(new_ballot(1, voter, 10)).await.unwrap();
        let second = store.commit(new_ballot(1, voter, 11)).await;
        assert!(matches!(second, Err(CommitError::Conflict { .. })));

        // The first ballot is untouched.
        let ballots = store.list_by_election(1).await.unwrap();
        assert_eq!(ballots.len(), 1);
        assert_eq!(ballots[0].id, first);
        assert_eq!(ballots[0].candidate_id, 10);

        // The same voter may still vote in another election.
        store.commit(new_ballot(2, voter, 10)).await.unwrap();
        assert!(store.has_ballot(2, voter).await.unwrap());
        assert_eq!(store.list_by_voter(voter).await.unwrap().len(), 2);
    }

    #[backend_test]
    async fn concurrent_commits_admit_exactly_one(db: Database) {
        let store = MongoStore::from_db(&db);
        let voter = Id::new();

        let attempts = (0..16).map(|i| {
            let store = store.clone();
            rocket::tokio::spawn(async move { store.commit(new_ballot(7, voter, i % 2)).await })
        });
        let outcomes = join_all(attempts).await;

        let successes = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(Ok(_))))
            .count();
        let conflicts = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(Err(CommitError::Conflict { .. }))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.count_by_election(7).await.unwrap(), 1);
    }

    #[backend_test]
    async fn candidate_lookup_ignores_unknown_ids(db: Database, candidates: Coll<Candidate>) {
        candidates
            .insert_many(
                [
                    Candidate::example(1, "Alice", "Blue"),
                    Candidate::example(2, "Bob", "Green"),
                ],
                None,
            )
            .await
            .unwrap();

        let store = MongoStore::from_db(&db);
        let found = store.candidates(&[2, 3]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&2].name, "Bob");
    }
}
