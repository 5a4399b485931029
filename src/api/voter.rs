use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    api::{
        auth::{AuthToken, Voter},
        election::{ElectionDescription, VoterElectionSummary},
        receipt::{BallotReceipt, VoteRequest},
    },
    common::election::ElectionId,
    db::election::Election,
    mongodb::Coll,
};
use crate::store::{BallotStore, ElectionDirectory, MongoStore};
use crate::voting::{self, VoteError};

pub fn routes() -> Vec<Route> {
    routes![voter_elections, voter_ballot, cast_vote, voter_votes]
}

#[get("/voter/elections")]
async fn voter_elections(
    token: AuthToken<Voter>,
    elections: Coll<Election>,
    store: MongoStore,
) -> Result<Json<Vec<VoterElectionSummary>>> {
    let voter_id = token.id();
    let now = Utc::now();

    let newest_first = FindOptions::builder()
        .sort(doc! { "start_time": -1, "_id": -1 })
        .build();
    let active: Vec<Election> = elections
        .find(doc! { "is_active": true }, newest_first)
        .await?
        .try_collect()
        .await?;

    let mut summaries = Vec::with_capacity(active.len());
    for election in active {
        let has_voted = store.has_ballot(election.id, voter_id).await?;
        summaries.push(VoterElectionSummary {
            id: election.id,
            state: election.window_state(now),
            title: election.metadata.title,
            start_time: election.metadata.start_time,
            end_time: election.metadata.end_time,
            has_voted,
        });
    }
    Ok(Json(summaries))
}

/// The ballot paper: only offered while the election is open and the voter
/// has not yet voted in it.
#[get("/voter/elections/<election_id>/ballot")]
async fn voter_ballot(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    store: MongoStore,
) -> Result<Json<ElectionDescription>> {
    let election = store
        .election(election_id)
        .await?
        .ok_or(VoteError::ElectionNotFound(election_id))?;

    let state = election.window_state(Utc::now());
    if !state.is_open() {
        return Err(VoteError::VotingClosed {
            election_id,
            reason: state,
        }
        .into());
    }
    if store.has_ballot(election_id, token.id()).await? {
        return Err(VoteError::AlreadyVoted(election_id).into());
    }

    let profiles = store.candidates(&election.candidates).await?;
    Ok(Json(ElectionDescription::new(election, &profiles)))
}

#[post("/voter/elections/<election_id>/vote", data = "<vote>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    vote: Json<VoteRequest>,
    store: MongoStore,
    request_id: &RequestId,
) -> Result<Json<BallotReceipt>> {
    let receipt = voting::cast_vote(
        &store,
        &store,
        token.id(),
        election_id,
        vote.candidate_id,
        Utc::now(),
    )
    .await
    .map_err(|err| {
        if err.is_retryable() {
            warn!("req{request_id} ballot not recorded, store unavailable: {err}");
        }
        Error::from(err)
    })?;
    Ok(Json(receipt))
}

#[get("/voter/votes")]
async fn voter_votes(token: AuthToken<Voter>, store: MongoStore) -> Result<Json<Vec<BallotReceipt>>> {
    let ballots = store.list_by_voter(token.id()).await?;
    Ok(Json(ballots.into_iter().map(BallotReceipt::from).collect()))
}
