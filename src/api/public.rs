use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        election::{ElectionDescription, ElectionSummary, VotingStatus},
        results::ElectionResult,
    },
    common::election::{CandidateId, ElectionId},
    db::{candidate::Candidate, election::Election},
    mongodb::{u32_id_filter, Coll},
};
use crate::store::{BallotStore, ElectionDirectory, MongoStore};
use crate::voting;

pub fn routes() -> Vec<Route> {
    routes![
        get_elections,
        get_election,
        get_election_status,
        get_election_results,
        get_candidates,
        get_candidate,
    ]
}

#[get("/elections")]
async fn get_elections(
    elections: Coll<Election>,
    store: MongoStore,
) -> Result<Json<Vec<ElectionSummary>>> {
    let newest_first = FindOptions::builder()
        .sort(doc! { "start_time": -1, "_id": -1 })
        .build();
    let all: Vec<Election> = elections
        .find(None, newest_first)
        .await?
        .try_collect()
        .await?;

    let mut summaries = Vec::with_capacity(all.len());
    for election in all {
        let total_votes = store.count_by_election(election.id).await?;
        summaries.push(ElectionSummary::new(election, total_votes));
    }
    Ok(Json(summaries))
}

#[get("/elections/<election_id>")]
async fn get_election(
    election_id: ElectionId,
    store: MongoStore,
) -> Result<Json<ElectionDescription>> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
    let profiles = store.candidates(&election.candidates).await?;
    Ok(Json(ElectionDescription::new(election, &profiles)))
}

#[get("/elections/<election_id>/status")]
async fn get_election_status(election_id: ElectionId, store: MongoStore) -> Result<Json<VotingStatus>> {
    let state = voting::voting_status(&store, election_id, Utc::now()).await?;
    Ok(Json(state.into()))
}

#[get("/elections/<election_id>/results")]
async fn get_election_results(
    election_id: ElectionId,
    store: MongoStore,
) -> Result<Json<ElectionResult>> {
    let result = voting::tally(&store, &store, election_id).await?;
    Ok(Json(result))
}

#[get("/candidates")]
async fn get_candidates(candidates: Coll<Candidate>) -> Result<Json<Vec<Candidate>>> {
    let by_id = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let all = candidates.find(None, by_id).await?.try_collect().await?;
    Ok(Json(all))
}

#[get("/candidates/<candidate_id>")]
async fn get_candidate(candidate_id: CandidateId, candidates: Coll<Candidate>) -> Result<Json<Candidate>> {
    let candidate = candidates
        .find_one(u32_id_filter(candidate_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;
    Ok(Json(candidate))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use crate::model::{
        common::election::WindowState, db::ballot::NewBallot, mongodb::Id,
    };

    use super::*;

    async fn insert_fixture(db: &Database) {
        Coll::<Candidate>::from_db(db)
            .insert_many(
                [
                    Candidate::example(1, "Alice", "Blue"),
                    Candidate::example(2, "Bob", "Green"),
                ],
                None,
            )
            .await
            .unwrap();

        let mut older = Election::current_example(1, vec![1, 2]);
        older.metadata.start_time = older.metadata.start_time - Duration::days(3);
        let newer = Election::current_example(2, vec![2]);
        Coll::<Election>::from_db(db)
            .insert_many([older, newer], None)
            .await
            .unwrap();

        let store = MongoStore::from_db(db);
        for candidate_id in [1, 1, 2] {
            store
                .commit(NewBallot {
                    election_id: 1,
                    voter_id: Id::new(),
                    candidate_id,
                    cast_at: Utc::now(),
                })
                .await
                .unwrap();
        }
    }

    #[backend_test]
    async fn list_elections_newest_first(client: Client, db: Database) {
        insert_fixture(&db).await;

        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let summaries: Vec<ElectionSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        let ids: Vec<_> = summaries.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(summaries[0].total_votes, 0);
        assert_eq!(summaries[1].total_votes, 3);
    }

    #[backend_test]
    async fn election_with_profiles(client: Client, db: Database) {
        insert_fixture(&db).await;

        let response = client.get(uri!(get_election(1))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let description: ElectionDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let names: Vec<_> = description.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);

        let response = client.get(uri!(get_election(99))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn status_and_results(client: Client, db: Database) {
        insert_fixture(&db).await;

        let response = client.get(uri!(get_election_status(1))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let status: VotingStatus =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(status.open);
        assert_eq!(status.state, WindowState::Open);

        let response = client.get(uri!(get_election_results(1))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let result: ElectionResult =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(result.total_votes, 3);
        assert_eq!(result.winner.unwrap().name, "Alice");

        let response = client.get(uri!(get_election_status(42))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.get(uri!(get_election_results(42))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn candidate_profiles(client: Client, db: Database) {
        insert_fixture(&db).await;

        let response = client.get(uri!(get_candidates)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let all: Vec<Candidate> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 1);

        let response = client.get(uri!(get_candidate(2))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let bob: Candidate = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(bob, Candidate::example(2, "Bob", "Green"));

        let response = client.get(uri!(get_candidate(3))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
