//! Optimistic update and rollback behavior of the jobs client: cached
//! views change before the command settles, and a rejected write restores
//! the captured snapshots verbatim.

use std::sync::Arc;

use serde_json::{json, Value};

use talentflow::client::{ApiClient, JobListParams, JobsClient};
use talentflow::pipeline::sim::Simulation;
use talentflow::pipeline::Pipeline;
use talentflow::store::{Store, MIGRATIONS};

#[tokio::test]
async fn reorder_renumbers_densely_and_settles() {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    let pipeline = Pipeline::new(store, Simulation::off());
    let api = ApiClient::new(pipeline.router());
    let client = JobsClient::new(pipeline.router());

    let mut ids = Vec::new();
    for title in ["Role A", "Role B", "Role C", "Role D"] {
        let job: Value = api.post("/jobs", &json!({ "title": title })).await.unwrap();
        ids.push(job["id"].as_u64().unwrap());
    }

    let params = JobListParams::default();
    let view = client.list(&params).await.unwrap();
    client.reorder(&view, ids[3], 0).await.unwrap();

    // Settle invalidated the cache, so this is a fresh read.
    let after = client.list(&params).await.unwrap();
    let mut ranked: Vec<(u64, i64)> = after.items.iter().map(|j| (j.id, j.order)).collect();
    ranked.sort_by_key(|(_, order)| *order);
    assert_eq!(
        ranked.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![ids[3], ids[0], ids[1], ids[2]]
    );
    // Dense 0..N-1 ranking after settlement.
    assert_eq!(
        ranked.iter().map(|(_, order)| *order).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
}

#[tokio::test]
async fn failed_reorder_rolls_the_view_back() {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    let healthy = Pipeline::new(store.clone(), Simulation::off());
    let failing = Pipeline::new(store, Simulation::off().with_write_fail_rate(1.0));

    let api = ApiClient::new(healthy.router());
    for title in ["Role A", "Role B", "Role C"] {
        let _: Value = api.post("/jobs", &json!({ "title": title })).await.unwrap();
    }

    let client = JobsClient::new(failing.router());
    let params = JobListParams::default();
    let before = client.list(&params).await.unwrap();
    let moved = before.items.last().expect("seeded view").id;

    client.reorder(&before, moved, 0).await.unwrap_err();

    // The cached view is byte-for-byte what it was before the attempt.
    let after = client.list(&params).await.unwrap();
    assert_eq!(*after, *before);
}

#[tokio::test]
async fn archive_moves_between_cached_views_and_rolls_back_on_failure() {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    let healthy = Pipeline::new(store.clone(), Simulation::off());
    let failing = Pipeline::new(store, Simulation::off().with_write_fail_rate(1.0));

    let api = ApiClient::new(healthy.router());
    let job: Value = api
        .post("/jobs", &json!({ "title": "Backend Engineer" }))
        .await
        .unwrap();
    let id = job["id"].as_u64().unwrap();

    let params = JobListParams::default();

    // Failure path first: optimistic move, then verbatim restore.
    let failing_client = JobsClient::new(failing.router());
    let active_before = failing_client.list(&params).await.unwrap();
    let archived_before = failing_client.list_archived(&params).await.unwrap();
    assert_eq!(active_before.items.len(), 1);
    assert!(archived_before.items.is_empty());

    failing_client.archive(id).await.unwrap_err();
    assert_eq!(*failing_client.list(&params).await.unwrap(), *active_before);
    assert_eq!(
        *failing_client.list_archived(&params).await.unwrap(),
        *archived_before
    );

    // Success path: the job lands on the archived shelf.
    let client = JobsClient::new(healthy.router());
    client.list(&params).await.unwrap();
    client.list_archived(&params).await.unwrap();

    let archived = client.archive(id).await.unwrap();
    assert!(archived.archived);
    assert!(client.list(&params).await.unwrap().items.is_empty());
    let shelf = client.list_archived(&params).await.unwrap();
    assert_eq!(shelf.items.len(), 1);
    assert_eq!(shelf.items[0].id, id);

    let restored = client.unarchive(id).await.unwrap();
    assert!(!restored.archived);
    assert_eq!(client.list(&params).await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn list_reads_are_cached_per_view() {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    let pipeline = Pipeline::new(store, Simulation::off());
    let api = ApiClient::new(pipeline.router());
    let client = JobsClient::new(pipeline.router());

    let _: Value = api.post("/jobs", &json!({ "title": "Role A" })).await.unwrap();

    let params = JobListParams::default();
    let first = client.list(&params).await.unwrap();

    // A write through a different client is invisible until invalidation.
    let _: Value = api.post("/jobs", &json!({ "title": "Role B" })).await.unwrap();
    let second = client.list(&params).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A write through this client invalidates the family.
    let patch = talentflow::pipeline::jobs::JobPatch::default();
    let job_id = first.items[0].id;
    client.update(job_id, &patch).await.unwrap();
    let third = client.list(&params).await.unwrap();
    assert_eq!(third.items.len(), 2);
}
