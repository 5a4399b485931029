use chrono::{DateTime, Utc};

use crate::model::{
    api::receipt::BallotReceipt,
    common::{
        ballot::VoterId,
        election::{CandidateId, ElectionId, WindowState},
    },
    db::ballot::NewBallot,
};
use crate::store::{BallotStore, CommitError, ElectionDirectory};

use super::{LookupError, VoteError};

/// Where the given election sits relative to its voting window at `now`.
pub async fn voting_status<E>(
    elections: &E,
    election_id: ElectionId,
    now: DateTime<Utc>,
) -> Result<WindowState, LookupError>
where
    E: ElectionDirectory + ?Sized,
{
    let election = elections
        .election(election_id)
        .await?
        .ok_or(LookupError::ElectionNotFound(election_id))?;
    Ok(election.window_state(now))
}

/// Is the given election accepting ballots at `now`?
pub async fn is_open_for_voting<E>(
    elections: &E,
    election_id: ElectionId,
    now: DateTime<Utc>,
) -> Result<bool, LookupError>
where
    E: ElectionDirectory + ?Sized,
{
    Ok(voting_status(elections, election_id, now).await?.is_open())
}

/// Admit a ballot from `voter_id` for `candidate_id` in `election_id`, or
/// say why not.
///
/// Checks run in a fixed order: the election must exist, be open at `now`,
/// and field the candidate; only then is the ballot committed. The store's
/// commit conflict is the authority on "already voted". Nothing is written
/// on any failure path.
pub async fn cast_vote<E, B>(
    elections: &E,
    ballots: &B,
    voter_id: VoterId,
    election_id: ElectionId,
    candidate_id: CandidateId,
    now: DateTime<Utc>,
) -> Result<BallotReceipt, VoteError>
where
    E: ElectionDirectory + ?Sized,
    B: BallotStore + ?Sized,
{
    let election = elections
        .election(election_id)
        .await?
        .ok_or(VoteError::ElectionNotFound(election_id))?;

    let state = election.window_state(now);
    if !state.is_open() {
        debug!("Rejected ballot from {voter_id} for election {election_id}: {state:?}");
        return Err(VoteError::VotingClosed {
            election_id,
            reason: state,
        });
    }

    if !election.has_candidate(candidate_id) {
        debug!("Rejected ballot from {voter_id}: candidate {candidate_id} not in election {election_id}");
        return Err(VoteError::InvalidCandidate {
            election_id,
            candidate_id,
        });
    }

    // Fast path only. Ballots are never retracted, so a hit is final, but
    // a miss proves nothing until the commit agrees.
    if ballots.has_ballot(election_id, voter_id).await? {
        debug!("Rejected repeat ballot from {voter_id} for election {election_id}");
        return Err(VoteError::AlreadyVoted(election_id));
    }

    let ballot = NewBallot {
        election_id,
        voter_id,
        candidate_id,
        cast_at: now,
    };
    let ballot_id = match ballots.commit(ballot).await {
        Ok(id) => id,
        Err(CommitError::Conflict { .. }) => {
            debug!("Commit conflict for {voter_id} in election {election_id}");
            return Err(VoteError::AlreadyVoted(election_id));
        }
        Err(CommitError::Store(e)) => return Err(e.into()),
    };

    info!("Admitted ballot {ballot_id} in election {election_id}");
    Ok(BallotReceipt {
        ballot_id,
        election_id,
        candidate_id,
        cast_at: now,
    })
}
