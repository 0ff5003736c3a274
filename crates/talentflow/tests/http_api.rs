//! End-to-end coverage of the emulated HTTP surface, driven through the
//! in-process transport.

use std::sync::Arc;

use serde_json::{json, Value};

use talentflow::client::{ApiClient, TransportError};
use talentflow::pipeline::sim::Simulation;
use talentflow::pipeline::Pipeline;
use talentflow::session::{Role, User};
use talentflow::store::{collections, Store, MIGRATIONS};

fn pipeline() -> Pipeline {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    Pipeline::new(store, Simulation::off())
}

fn assert_status(err: TransportError, expected: u16) {
    match err {
        TransportError::Request { status, .. } => assert_eq!(status.as_u16(), expected),
        other => panic!("expected status {expected}, got {other:?}"),
    }
}

#[tokio::test]
async fn job_lifecycle_over_http() {
    let api = ApiClient::new(pipeline().router());

    let job: Value = api
        .post("/jobs", &json!({ "title": "Backend Engineer" }))
        .await
        .unwrap();
    assert_eq!(job["slug"], "backend-engineer");
    assert_eq!(job["archived"], false);
    assert_eq!(job["order"], 0);
    let id = job["id"].as_u64().unwrap();

    // Same slug again is a conflict.
    let err = api
        .post::<Value>("/jobs", &json!({ "title": "BACKEND engineer!!" }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Slug already exists");
    assert_status(err, 409);

    let archived: Value = api
        .patch(&format!("/jobs/{id}/archive"), &json!({}))
        .await
        .unwrap();
    assert_eq!(archived["archived"], true);

    let active: Value = api.get("/jobs").await.unwrap();
    assert_eq!(active["total"], 0);
    let shelf: Value = api.get("/jobs/archived").await.unwrap();
    assert_eq!(shelf["total"], 1);
    assert_eq!(shelf["items"][0]["id"], id);

    let gone: Value = api.delete(&format!("/jobs/{id}")).await.unwrap();
    assert_eq!(gone, json!({ "ok": true }));
}

#[tokio::test]
async fn pagination_envelope_is_stable_over_http() {
    let api = ApiClient::new(pipeline().router());
    for i in 0..12 {
        let _: Value = api
            .post("/jobs", &json!({ "title": format!("Role {i}") }))
            .await
            .unwrap();
    }
    let page: Value = api.get("/jobs?page=99&pageSize=5").await.unwrap();
    assert_eq!(page["total"], 12);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["page"], 3);
    assert_eq!(page["pageSize"], 5);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn candidate_timeline_over_http() {
    let api = ApiClient::new(pipeline().router());

    let candidate: Value = api
        .post(
            "/candidates",
            &json!({ "name": "Ada Lovelace", "email": "Ada@Example.com" }),
        )
        .await
        .unwrap();
    assert_eq!(candidate["email"], "ada@example.com");
    let id = candidate["id"].as_u64().unwrap();

    let moved: Value = api
        .patch(&format!("/candidates/{id}"), &json!({ "stage": "screen" }))
        .await
        .unwrap();
    assert_eq!(moved["stage"], "screen");

    let note: Value = api
        .post(
            &format!("/candidates/{id}/timeline"),
            &json!({ "message": "Strong portfolio" }),
        )
        .await
        .unwrap();
    assert_eq!(note["type"], "note");

    let timeline: Value = api.get(&format!("/candidates/{id}/timeline")).await.unwrap();
    let items = timeline["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["type"], "stage");
    assert_eq!(items[0]["message"], "moved to screen");
    assert_eq!(items[1]["type"], "note");

    // Deleting an id that never existed still reports ok.
    let gone: Value = api.delete("/candidates/42424").await.unwrap();
    assert_eq!(gone, json!({ "ok": true }));

    let missing = api.get::<Value>("/candidates/42424").await.unwrap_err();
    assert_eq!(missing.to_string(), "Not found");
    assert_status(missing, 404);
}

#[tokio::test]
async fn assessment_validation_over_http() {
    let api = ApiClient::new(pipeline().router());

    // A choice question without options is rejected before storage.
    let err = api
        .put::<Value>(
            "/assessments/1",
            &json!({
                "sections": [{
                    "title": "s",
                    "questions": [{ "id": "q1", "type": "single", "label": "Pick one" }]
                }]
            }),
        )
        .await
        .unwrap_err();
    assert_status(err, 422);

    let builder: Value = api
        .put(
            "/assessments/1",
            &json!({
                "sections": [{
                    "title": "s",
                    "questions": [{
                        "id": "q1",
                        "type": "single",
                        "label": "Pick one",
                        "required": true,
                        "options": ["a", "b"]
                    }]
                }]
            }),
        )
        .await
        .unwrap();
    assert_eq!(builder["jobId"], 1);

    // Submitting without the required answer fails.
    let err = api
        .post::<Value>(
            "/assessments/1/submit",
            &json!({ "candidateId": 9, "answers": {} }),
        )
        .await
        .unwrap_err();
    assert_status(err, 422);

    let response: Value = api
        .post(
            "/assessments/1/submit",
            &json!({
                "candidateId": 9,
                "answers": { "q1": { "type": "single", "value": "a" } }
            }),
        )
        .await
        .unwrap();
    assert_eq!(response["candidateId"], 9);

    // Scores outside 0..=100 are rejected.
    let err = api
        .post::<Value>(
            "/assessments",
            &json!({ "candidateId": 9, "jobId": 1, "score": 101 }),
        )
        .await
        .unwrap_err();
    assert_status(err, 422);

    // A job with no builder reads as an empty one.
    let empty: Value = api.get("/assessments/77").await.unwrap();
    assert_eq!(empty, json!({ "jobId": 77, "sections": [] }));

    // Recorded responses read back oldest first, scoped to the job.
    let responses: Value = api.get("/assessments/1/responses").await.unwrap();
    let items = responses["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["candidateId"], 9);
    assert_eq!(items[0]["answers"]["q1"]["value"], "a");

    let none: Value = api.get("/assessments/77/responses").await.unwrap();
    assert_eq!(none, json!({ "items": [] }));
}

#[tokio::test]
async fn analytics_summary_over_http() {
    let api = ApiClient::new(pipeline().router());

    for (title, department) in [
        ("Backend Engineer", "Engineering"),
        ("Platform Engineer", "Engineering"),
        ("Product Designer", "Design"),
    ] {
        let _: Value = api
            .post("/jobs", &json!({ "title": title, "department": department }))
            .await
            .unwrap();
    }
    let _: Value = api
        .post(
            "/candidates",
            &json!({ "name": "Ada Lovelace", "email": "ada@example.com", "stage": "screen" }),
        )
        .await
        .unwrap();

    let summary: Value = api.get("/analytics/summary").await.unwrap();
    assert_eq!(summary["totalJobs"], 3);
    assert_eq!(summary["activeJobs"], 3);
    assert_eq!(summary["totalCandidates"], 1);
    assert_eq!(summary["candidatesByStage"]["screen"], 1);
    assert_eq!(summary["topDepartments"][0]["department"], "Engineering");
    assert_eq!(summary["topDepartments"][0]["count"], 2);
    let feed = summary["recentActivity"].as_array().unwrap();
    assert_eq!(feed.len(), 4);
    assert!(feed.iter().any(|entry| entry["type"] == "candidate"
        && entry["action"] == "Candidate \"Ada Lovelace\" added"));
}

#[tokio::test]
async fn auth_flow_over_http() {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    let user = User {
        id: 0,
        username: "admin".to_string(),
        email: "admin@talentflow.dev".to_string(),
        name: "Admin".to_string(),
        role: Role::Admin,
        created_at: 0,
    };
    store
        .insert(collections::USERS, serde_json::to_value(&user).unwrap())
        .await
        .unwrap();
    let router = Pipeline::new(store, Simulation::off()).router();
    let api = ApiClient::new(router.clone());

    let err = api
        .post::<Value>(
            "/auth/login",
            &json!({ "username": "admin", "password": "wrong" }),
        )
        .await
        .unwrap_err();
    assert_status(err, 401);

    let login: Value = api
        .post(
            "/auth/login",
            &json!({ "username": "admin", "password": "password" }),
        )
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap().to_string();
    assert_eq!(login["user"]["role"], "admin");

    let authed = ApiClient::new(router.clone()).with_bearer(token.clone());
    let me: Value = authed.get("/auth/me").await.unwrap();
    assert_eq!(me["username"], "admin");

    let _: Value = authed.post("/auth/logout", &json!({})).await.unwrap();
    let err = authed.get::<Value>("/auth/me").await.unwrap_err();
    assert_status(err, 401);

    // Anonymous requests get the same refusal.
    let err = api.get::<Value>("/auth/me").await.unwrap_err();
    assert_status(err, 401);
}
