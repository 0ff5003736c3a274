use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::page::{parse_id_param, parse_number_param, parse_string_param, Page};

use super::domain::{Candidate, CandidatePatch, NewCandidate, TimelineEntry};
use super::service::{
    CandidateListFilter, CandidateService, CandidateServiceError, DEFAULT_PAGE_SIZE,
};

pub fn candidates_router(service: Arc<CandidateService>) -> Router {
    Router::new()
        .route("/candidates", get(list_candidates).post(create_candidate))
        .route(
            "/candidates/:id",
            get(get_candidate)
                .patch(update_candidate)
                .delete(delete_candidate),
        )
        .route(
            "/candidates/:id/timeline",
            get(get_timeline).post(post_note),
        )
        .with_state(service)
}

impl IntoResponse for CandidateServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            CandidateServiceError::NotFound => StatusCode::NOT_FOUND,
            CandidateServiceError::WriteRejected
            | CandidateServiceError::Store(_)
            | CandidateServiceError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateListQuery {
    page: Option<String>,
    page_size: Option<String>,
    search: Option<String>,
    stage: Option<String>,
    job_id: Option<String>,
}

async fn list_candidates(
    State(service): State<Arc<CandidateService>>,
    Query(query): Query<CandidateListQuery>,
) -> Result<Json<Page<Candidate>>, CandidateServiceError> {
    let page = parse_number_param(query.page.as_deref(), 1);
    let page_size = parse_number_param(query.page_size.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = CandidateListFilter {
        search: parse_string_param(query.search.as_ref()),
        stage: parse_string_param(query.stage.as_ref()),
        job_id: parse_id_param(query.job_id.as_ref()),
    };
    Ok(Json(service.list(&filter, page, page_size).await?))
}

async fn get_candidate(
    State(service): State<Arc<CandidateService>>,
    Path(id): Path<u64>,
) -> Result<Json<Candidate>, CandidateServiceError> {
    Ok(Json(service.get(id).await?))
}

async fn create_candidate(
    State(service): State<Arc<CandidateService>>,
    Json(input): Json<NewCandidate>,
) -> Result<(StatusCode, Json<Candidate>), CandidateServiceError> {
    let candidate = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

async fn update_candidate(
    State(service): State<Arc<CandidateService>>,
    Path(id): Path<u64>,
    Json(patch): Json<CandidatePatch>,
) -> Result<Json<Candidate>, CandidateServiceError> {
    Ok(Json(service.update(id, patch).await?))
}

async fn delete_candidate(
    State(service): State<Arc<CandidateService>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, CandidateServiceError> {
    service.delete(id).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn get_timeline(
    State(service): State<Arc<CandidateService>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, CandidateServiceError> {
    let items = service.timeline(id).await?;
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Deserialize)]
struct NoteBody {
    #[serde(default)]
    message: String,
}

async fn post_note(
    State(service): State<Arc<CandidateService>>,
    Path(id): Path<u64>,
    Json(body): Json<NoteBody>,
) -> Result<(StatusCode, Json<TimelineEntry>), CandidateServiceError> {
    let entry = service.add_note(id, body.message).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
