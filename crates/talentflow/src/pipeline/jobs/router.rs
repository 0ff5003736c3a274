use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::page::{parse_number_param, parse_string_param, Page};

use super::domain::{Job, JobPatch, NewJob};
use super::service::{JobListFilter, JobService, JobServiceError, DEFAULT_PAGE_SIZE};

pub fn jobs_router(service: Arc<JobService>) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/archived", get(list_archived_jobs))
        .route("/jobs/:id", patch(update_job).delete(delete_job))
        .route("/jobs/:id/reorder", patch(reorder_job))
        .route("/jobs/:id/archive", patch(archive_job))
        .route("/jobs/:id/unarchive", patch(unarchive_job))
        .with_state(service)
}

impl IntoResponse for JobServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            JobServiceError::SlugConflict { .. } => StatusCode::CONFLICT,
            JobServiceError::NotFound => StatusCode::NOT_FOUND,
            JobServiceError::WriteRejected
            | JobServiceError::Store(_)
            | JobServiceError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Raw query params; everything arrives as strings and is normalized
/// leniently (malformed numbers fall back, blank strings mean absent).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobListQuery {
    page: Option<String>,
    page_size: Option<String>,
    search: Option<String>,
    status: Option<String>,
    tag: Option<String>,
    archived: Option<String>,
}

async fn list_jobs(
    State(service): State<Arc<JobService>>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Page<Job>>, JobServiceError> {
    let page = parse_number_param(query.page.as_deref(), 1);
    let page_size = parse_number_param(query.page_size.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = JobListFilter {
        search: parse_string_param(query.search.as_ref()),
        status: parse_string_param(query.status.as_ref()),
        tag: parse_string_param(query.tag.as_ref()),
        archived: query.archived.as_deref() == Some("true"),
    };
    Ok(Json(service.list(&filter, page, page_size).await?))
}

async fn list_archived_jobs(
    State(service): State<Arc<JobService>>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Page<Job>>, JobServiceError> {
    let page = parse_number_param(query.page.as_deref(), 1);
    let page_size = parse_number_param(query.page_size.as_deref(), DEFAULT_PAGE_SIZE);
    let search = parse_string_param(query.search.as_ref());
    let tag = parse_string_param(query.tag.as_ref());
    Ok(Json(
        service
            .list_archived(search.as_deref(), tag.as_deref(), page, page_size)
            .await?,
    ))
}

async fn create_job(
    State(service): State<Arc<JobService>>,
    Json(input): Json<NewJob>,
) -> Result<(StatusCode, Json<Job>), JobServiceError> {
    let job = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn update_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<u64>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<Job>, JobServiceError> {
    Ok(Json(service.update(id, patch).await?))
}

#[derive(Debug, Deserialize)]
struct ReorderBody {
    order: i64,
}

async fn reorder_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<u64>,
    Json(body): Json<ReorderBody>,
) -> Result<Json<Job>, JobServiceError> {
    Ok(Json(service.reorder(id, body.order).await?))
}

async fn archive_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<u64>,
) -> Result<Json<Job>, JobServiceError> {
    Ok(Json(service.set_archived(id, true).await?))
}

async fn unarchive_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<u64>,
) -> Result<Json<Job>, JobServiceError> {
    Ok(Json(service.set_archived(id, false).await?))
}

async fn delete_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, JobServiceError> {
    service.delete(id).await?;
    Ok(Json(json!({ "ok": true })))
}
