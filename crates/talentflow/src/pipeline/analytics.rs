//! Dashboard aggregations over the whole store: headline counts, the
//! candidates-per-stage histogram, department leaders, and a short recent
//! activity feed.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::pipeline::sim::Simulation;
use crate::store::{collections, Store, StoreError};

use super::candidates::Candidate;
use super::jobs::{Job, JobStatus};

const TOP_DEPARTMENTS: usize = 5;
const RECENT_PER_COLLECTION: usize = 5;
const RECENT_FEED_LEN: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub total_candidates: usize,
    pub candidates_by_stage: BTreeMap<String, usize>,
    pub top_departments: Vec<DepartmentCount>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub action: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Job,
    Candidate,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored document is not decodable: {0}")]
    Decode(#[from] serde_json::Error),
}

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub struct AnalyticsService {
    store: Arc<Store>,
    sim: Simulation,
}

impl AnalyticsService {
    pub fn new(store: Arc<Store>, sim: Simulation) -> Self {
        Self { store, sim }
    }

    /// One pass over jobs and candidates. Read-only, so the simulated
    /// write-failure rate never applies here.
    pub async fn summary(&self) -> Result<DashboardSummary, AnalyticsError> {
        self.sim.delay().await;

        let jobs: Vec<Job> = self
            .store
            .all(collections::JOBS)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        let candidates: Vec<Candidate> = self
            .store
            .all(collections::CANDIDATES)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;

        let active_jobs = jobs
            .iter()
            .filter(|job| !job.archived && job.status == JobStatus::Open)
            .count();

        let mut candidates_by_stage: BTreeMap<String, usize> = BTreeMap::new();
        for candidate in &candidates {
            *candidates_by_stage
                .entry(candidate.stage.label().to_string())
                .or_insert(0) += 1;
        }

        let mut departments: BTreeMap<&str, usize> = BTreeMap::new();
        for job in &jobs {
            *departments.entry(job.department.as_str()).or_insert(0) += 1;
        }
        let mut top_departments: Vec<DepartmentCount> = departments
            .into_iter()
            .map(|(department, count)| DepartmentCount {
                department: department.to_string(),
                count,
            })
            .collect();
        // Ties break alphabetically so the feed is stable across runs.
        top_departments.sort_by(|a, b| {
            Reverse(a.count)
                .cmp(&Reverse(b.count))
                .then_with(|| a.department.cmp(&b.department))
        });
        top_departments.truncate(TOP_DEPARTMENTS);

        // Newest rows by key, mirroring the feed's "latest additions" intent.
        let mut recent_activity: Vec<ActivityEntry> = jobs
            .iter()
            .rev()
            .take(RECENT_PER_COLLECTION)
            .map(|job| ActivityEntry {
                kind: ActivityKind::Job,
                action: format!(
                    "Job \"{}\" {}",
                    job.title,
                    if job.archived { "archived" } else { "created" }
                ),
                timestamp: job.created_at,
            })
            .chain(candidates.iter().rev().take(RECENT_PER_COLLECTION).map(
                |candidate| ActivityEntry {
                    kind: ActivityKind::Candidate,
                    action: format!("Candidate \"{}\" added", candidate.name),
                    timestamp: candidate.created_at,
                },
            ))
            .collect();
        recent_activity.sort_by_key(|entry| Reverse(entry.timestamp));
        recent_activity.truncate(RECENT_FEED_LEN);

        Ok(DashboardSummary {
            total_jobs: jobs.len(),
            active_jobs,
            total_candidates: candidates.len(),
            candidates_by_stage,
            top_departments,
            recent_activity,
        })
    }
}

pub fn analytics_router(service: Arc<AnalyticsService>) -> Router {
    Router::new()
        .route("/analytics/summary", get(summary))
        .with_state(service)
}

async fn summary(
    State(service): State<Arc<AnalyticsService>>,
) -> Result<Json<DashboardSummary>, AnalyticsError> {
    Ok(Json(service.summary().await?))
}
