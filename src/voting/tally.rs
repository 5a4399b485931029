use std::collections::HashMap;

use crate::model::{
    api::results::{CandidateResult, ElectionResult},
    common::election::{CandidateId, ElectionId},
};
use crate::store::{BallotStore, ElectionDirectory};

use super::TallyError;

/// Name reported for a candidate whose profile can no longer be found.
const UNKNOWN_CANDIDATE: &str = "Unknown";

/// Count the ballots of one election.
///
/// Every candidate standing in the election is reported, including those
/// with no ballots. Results are ordered by vote count, most first, with
/// ties broken by ascending candidate ID so repeated calls over the same
/// ballots always agree.
pub async fn tally<E, B>(
    elections: &E,
    ballots: &B,
    election_id: ElectionId,
) -> Result<ElectionResult, TallyError>
where
    E: ElectionDirectory + ?Sized,
    B: BallotStore + ?Sized,
{
    let election = elections
        .election(election_id)
        .await?
        .ok_or(TallyError::ElectionNotFound(election_id))?;
    let profiles = elections.candidates(&election.candidates).await?;

    let mut counts: HashMap<CandidateId, u64> =
        election.candidates.iter().map(|id| (*id, 0)).collect();
    let mut orphans = 0_u64;
    for ballot in ballots.list_by_election(election_id).await? {
        match counts.get_mut(&ballot.candidate_id) {
            Some(count) => *count += 1,
            None => orphans += 1,
        }
    }
    if orphans > 0 {
        warn!("Election {election_id} has {orphans} ballots for candidates not standing in it; not counted");
    }

    let total_votes: u64 = counts.values().sum();
    let mut results: Vec<CandidateResult> = counts
        .into_iter()
        .map(|(candidate_id, votes)| {
            let (name, party) = match profiles.get(&candidate_id) {
                Some(profile) => (profile.name.clone(), profile.party.clone()),
                None => (UNKNOWN_CANDIDATE.to_string(), String::new()),
            };
            CandidateResult {
                candidate_id,
                name,
                party,
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect();
    results.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });

    debug!("Tallied election {election_id}: {total_votes} ballots");
    Ok(ElectionResult {
        election_id,
        title: election.metadata.title,
        total_votes,
        winner: results.first().cloned(),
        results,
    })
}

fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        votes as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::Utc;
    use rocket::futures::future::join_all;

    use crate::model::{
        db::{ballot::NewBallot, candidate::Candidate, election::Election},
        mongodb::Id,
    };
    use crate::store::{MemoryStore, StoreError};
    use crate::voting::cast_vote;

    const ELECTION: ElectionId = 3;

    fn store_with(candidates: &[(CandidateId, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_election(Election::current_example(
            ELECTION,
            candidates.iter().map(|(id, _)| *id).collect(),
        ));
        for (id, name) in candidates {
            store.insert_candidate(Candidate::example(*id, name, "Independent"));
        }
        store
    }

    async fn vote(store: &MemoryStore, candidate_id: CandidateId, times: usize) {
        for _ in 0..times {
            store
                .commit(NewBallot {
                    election_id: ELECTION,
                    voter_id: Id::new(),
                    candidate_id,
                    cast_at: Utc::now(),
                })
                .await
                .unwrap();
        }
    }

    #[rocket::async_test]
    async fn three_to_one() {
        let store = store_with(&[(1, "A"), (2, "B")]);
        vote(&store, 1, 3).await;
        vote(&store, 2, 1).await;

        let result = tally(&store, &store, ELECTION).await.unwrap();
        assert_eq!(result.total_votes, 4);
        assert_eq!(result.results.len(), 2);

        let a = &result.results[0];
        assert_eq!((a.candidate_id, a.name.as_str(), a.votes), (1, "A", 3));
        assert!((a.percentage - 75.0).abs() < 1e-9);

        let b = &result.results[1];
        assert_eq!((b.candidate_id, b.name.as_str(), b.votes), (2, "B", 1));
        assert!((b.percentage - 25.0).abs() < 1e-9);

        assert_eq!(result.winner.as_ref().map(|w| w.candidate_id), Some(1));
    }

    #[rocket::async_test]
    async fn no_ballots_still_lists_everyone() {
        // Insert in reverse so ordering can't come from insertion order.
        let store = store_with(&[(8, "B"), (5, "A")]);

        let result = tally(&store, &store, ELECTION).await.unwrap();
        assert_eq!(result.total_votes, 0);
        assert_eq!(result.results.len(), 2);
        for candidate in &result.results {
            assert_eq!(candidate.votes, 0);
            assert_eq!(candidate.percentage, 0.0);
        }
        // The leader by tie-break, not a real winner.
        assert_eq!(result.winner.map(|w| w.candidate_id), Some(5));
    }

    #[rocket::async_test]
    async fn no_candidates_no_winner() {
        let store = store_with(&[]);
        let result = tally(&store, &store, ELECTION).await.unwrap();
        assert!(result.results.is_empty());
        assert!(result.winner.is_none());
        assert_eq!(result.total_votes, 0);
    }

    #[rocket::async_test]
    async fn ties_break_by_candidate_id() {
        let store = store_with(&[(30, "C"), (10, "A"), (20, "B"), (40, "D")]);
        vote(&store, 40, 2).await;
        vote(&store, 20, 2).await;
        vote(&store, 30, 1).await;

        let result = tally(&store, &store, ELECTION).await.unwrap();
        let order: Vec<_> = result.results.iter().map(|c| c.candidate_id).collect();
        assert_eq!(order, vec![20, 40, 30, 10]);
        assert_eq!(result.winner.unwrap().candidate_id, 20);
    }

    #[rocket::async_test]
    async fn tally_is_idempotent() {
        let store = store_with(&[(1, "A"), (2, "B"), (3, "C")]);
        vote(&store, 2, 4).await;
        vote(&store, 3, 4).await;
        vote(&store, 1, 1).await;

        let first = tally(&store, &store, ELECTION).await.unwrap();
        let second = tally(&store, &store, ELECTION).await.unwrap();
        assert_eq!(first, second);
    }

    #[rocket::async_test]
    async fn counts_sum_to_total() {
        let store = store_with(&[(1, "A"), (2, "B"), (3, "C")]);
        vote(&store, 1, 2).await;
        vote(&store, 2, 5).await;
        vote(&store, 3, 7).await;

        let result = tally(&store, &store, ELECTION).await.unwrap();
        let sum: u64 = result.results.iter().map(|c| c.votes).sum();
        assert_eq!(sum, result.total_votes);
        assert_eq!(result.total_votes, 14);

        let pct_sum: f64 = result.results.iter().map(|c| c.percentage).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
        for candidate in &result.results {
            let expected = candidate.votes as f64 / 14.0 * 100.0;
            assert!((candidate.percentage - expected).abs() < 1e-9);
        }
    }

    #[rocket::async_test]
    async fn missing_profile_reported_as_unknown() {
        let store = store_with(&[(1, "A")]);
        let mut election = store.election(ELECTION).await.unwrap().unwrap();
        election.candidates.push(2);
        store.insert_election(election);
        vote(&store, 2, 1).await;

        let result = tally(&store, &store, ELECTION).await.unwrap();
        let leader = result.winner.unwrap();
        assert_eq!(leader.candidate_id, 2);
        assert_eq!(leader.name, UNKNOWN_CANDIDATE);
        assert_eq!(leader.party, "");
    }

    #[rocket::async_test]
    async fn orphan_ballots_are_not_counted() {
        let store = store_with(&[(1, "A"), (2, "B")]);
        vote(&store, 1, 2).await;
        vote(&store, 9, 3).await;

        let result = tally(&store, &store, ELECTION).await.unwrap();
        assert_eq!(result.total_votes, 2);
        assert_eq!(result.results[0].percentage, 100.0);
    }

    #[rocket::async_test]
    async fn errors() {
        let store = store_with(&[(1, "A")]);
        assert!(matches!(
            tally(&store, &store, 77).await,
            Err(TallyError::ElectionNotFound(77))
        ));

        store.set_offline(true);
        assert!(matches!(
            tally(&store, &store, ELECTION).await,
            Err(TallyError::StoreUnavailable(StoreError::Offline(_)))
        ));
    }

    #[rocket::async_test]
    async fn tallies_stay_consistent_while_ballots_arrive() {
        const VOTERS: usize = 200;
        let store = Arc::new(store_with(&[(3, "A"), (5, "B"), (7, "C")]));
        store.insert_election(Election::current_example(4, vec![9, 4, 6]));

        let voters = (0..VOTERS).map(|i| {
            let store = store.clone();
            let candidate = [7, 3, 5][i % 3];
            rocket::tokio::spawn(async move {
                cast_vote(&*store, &*store, Id::new(), ELECTION, candidate, Utc::now())
                    .await
                    .unwrap();
                tally(&*store, &*store, ELECTION).await.unwrap()
            })
        });
        for joined in join_all(voters).await {
            let snapshot = joined.unwrap();
            let counted: u64 = snapshot.results.iter().map(|c| c.votes).sum();
            assert_eq!(counted, snapshot.total_votes);
            assert!(snapshot.total_votes >= 1);
        }

        let result = tally(&*store, &*store, ELECTION).await.unwrap();
        let counts: Vec<_> = result
            .results
            .iter()
            .map(|c| (c.candidate_id, c.votes))
            .collect();
        assert_eq!(counts, vec![(3, 67), (7, 67), (5, 66)]);
        assert_eq!(result.total_votes, VOTERS as u64);

        let untouched = tally(&*store, &*store, 4).await.unwrap();
        assert_eq!(untouched.total_votes, 0);
        assert_eq!(untouched.winner.map(|w| w.candidate_id), Some(4));
    }
}
