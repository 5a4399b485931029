use mongodb::bson::doc;
use rocket::{http::Status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AuthToken},
        candidate::CandidateSpec,
        election::{ElectionDescription, ElectionSpec},
    },
    common::election::{CandidateId, ElectionId},
    db::{candidate::Candidate, election::Election},
    mongodb::{u32_id_filter, Coll, Counter, CANDIDATE_ID_COUNTER_ID, ELECTION_ID_COUNTER_ID},
};
use crate::store::{BallotStore, ElectionDirectory, MongoStore};

pub fn routes() -> Vec<Route> {
    routes![
        create_candidate,
        create_election,
        activate_election,
        deactivate_election,
        add_candidate,
        delete_election,
    ]
}

#[post("/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    candidates: Coll<Candidate>,
    counters: Coll<Counter>,
) -> Result<Json<Candidate>> {
    if spec.name.trim().is_empty() {
        return Err(Error::Status(
            Status::BadRequest,
            "Candidate name must not be empty".to_string(),
        ));
    }
    let id = Counter::next(&counters, CANDIDATE_ID_COUNTER_ID).await?;
    let candidate = spec.0.into_candidate(id);
    candidates.insert_one(&candidate, None).await?;
    info!("Created candidate {id}");
    Ok(Json(candidate))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    counters: Coll<Counter>,
    store: MongoStore,
) -> Result<Json<ElectionDescription>> {
    spec.validate()
        .map_err(|e| Error::Status(Status::BadRequest, e.to_string()))?;

    // Every listed candidate must have a profile.
    let profiles = store.candidates(&spec.candidates).await?;
    if let Some(missing) = spec.candidates.iter().find(|id| !profiles.contains_key(*id)) {
        return Err(Error::Status(
            Status::BadRequest,
            format!("No candidate with ID {missing}"),
        ));
    }

    let id = Counter::next(&counters, ELECTION_ID_COUNTER_ID).await?;
    let election = spec
        .0
        .into_election(id)
        .map_err(|e| Error::Status(Status::BadRequest, e.to_string()))?;
    elections.insert_one(&election, None).await?;
    info!("Created election {id}");
    Ok(Json(ElectionDescription::new(election, &profiles)))
}

#[post("/elections/<election_id>/activate")]
async fn activate_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<()> {
    set_active(&elections, election_id, true).await
}

#[post("/elections/<election_id>/deactivate")]
async fn deactivate_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<()> {
    set_active(&elections, election_id, false).await
}

async fn set_active(elections: &Coll<Election>, election_id: ElectionId, active: bool) -> Result<()> {
    let update = doc! {
        "$set": { "is_active": active }
    };
    let result = elections
        .update_one(u32_id_filter(election_id), update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }
    info!("Election {election_id} is_active set to {active}");
    Ok(())
}

/// Stand an existing candidate in an election. Refused once ballots exist.
///
/// Best-effort: the ballot count and the update are separate steps, so a
/// ballot committed between them does not stop the candidate being added.
#[post("/elections/<election_id>/candidates/<candidate_id>")]
async fn add_candidate(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    candidate_id: CandidateId,
    elections: Coll<Election>,
    store: MongoStore,
) -> Result<Json<ElectionDescription>> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
    if store.candidates(&[candidate_id]).await?.is_empty() {
        return Err(Error::not_found(format!("Candidate with ID '{candidate_id}'")));
    }
    if election.has_candidate(candidate_id) {
        return Err(Error::Status(
            Status::Conflict,
            format!("Candidate {candidate_id} already stands in election {election_id}"),
        ));
    }
    if store.count_by_election(election_id).await? > 0 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Election {election_id} already has ballots; its candidates are fixed"),
        ));
    }

    let update = doc! {
        "$addToSet": { "candidates": candidate_id }
    };
    elections
        .update_one(u32_id_filter(election_id), update, None)
        .await?;

    // Re-read so the response reflects the stored list.
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
    let profiles = store.candidates(&election.candidates).await?;
    Ok(Json(ElectionDescription::new(election, &profiles)))
}

/// Delete an election. Only deactivated elections without ballots qualify;
/// ballots are never deleted.
#[delete("/elections/<election_id>")]
async fn delete_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
    store: MongoStore,
) -> Result<()> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
    if election.metadata.is_active {
        return Err(Error::Status(
            Status::Conflict,
            format!("Election {election_id} is active; deactivate it first"),
        ));
    }
    // Deactivated elections admit no ballots, so this count cannot grow.
    if store.count_by_election(election_id).await? > 0 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Election {election_id} has ballots and cannot be deleted"),
        ));
    }

    let filter = doc! {
        "_id": election_id,
        "is_active": false,
    };
    let result = elections.delete_one(filter, None).await?;
    if result.deleted_count != 1 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Election {election_id} changed while deleting; try again"),
        ));
    }
    info!("Deleted election {election_id}");
    Ok(())
}
