use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::page::{parse_id_param, parse_number_param, parse_string_param, Page};

use super::domain::{
    Answer, Assessment, AssessmentBuilder, AssessmentPatch, AssessmentResponse, NewAssessment,
    Section,
};
use super::service::{
    AssessmentListFilter, AssessmentService, AssessmentServiceError, DEFAULT_PAGE_SIZE,
};

// GET and PUT on `/assessments/:id` address the per-job builder document,
// while PATCH and DELETE address an assessment row. The split follows the
// wire contract, which disambiguates by method.
pub fn assessments_router(service: Arc<AssessmentService>) -> Router {
    Router::new()
        .route("/assessments", get(list_assessments).post(create_assessment))
        .route(
            "/assessments/:id",
            get(get_builder)
                .put(put_builder)
                .patch(update_assessment)
                .delete(delete_assessment),
        )
        .route("/assessments/:id/submit", post(submit_response))
        .route("/assessments/:id/responses", get(list_responses))
        .with_state(service)
}

impl IntoResponse for AssessmentServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            AssessmentServiceError::NotFound => StatusCode::NOT_FOUND,
            AssessmentServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AssessmentServiceError::WriteRejected
            | AssessmentServiceError::Store(_)
            | AssessmentServiceError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentListQuery {
    page: Option<String>,
    page_size: Option<String>,
    status: Option<String>,
    job_id: Option<String>,
    candidate_id: Option<String>,
}

async fn list_assessments(
    State(service): State<Arc<AssessmentService>>,
    Query(query): Query<AssessmentListQuery>,
) -> Result<Json<Page<Assessment>>, AssessmentServiceError> {
    let page = parse_number_param(query.page.as_deref(), 1);
    let page_size = parse_number_param(query.page_size.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = AssessmentListFilter {
        status: parse_string_param(query.status.as_ref()),
        job_id: parse_id_param(query.job_id.as_ref()),
        candidate_id: parse_id_param(query.candidate_id.as_ref()),
    };
    Ok(Json(service.list(&filter, page, page_size).await?))
}

async fn create_assessment(
    State(service): State<Arc<AssessmentService>>,
    Json(input): Json<NewAssessment>,
) -> Result<(StatusCode, Json<Assessment>), AssessmentServiceError> {
    let assessment = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

async fn update_assessment(
    State(service): State<Arc<AssessmentService>>,
    Path(id): Path<u64>,
    Json(patch): Json<AssessmentPatch>,
) -> Result<Json<Assessment>, AssessmentServiceError> {
    Ok(Json(service.update(id, patch).await?))
}

async fn delete_assessment(
    State(service): State<Arc<AssessmentService>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AssessmentServiceError> {
    service.delete(id).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn get_builder(
    State(service): State<Arc<AssessmentService>>,
    Path(job_id): Path<u64>,
) -> Result<Json<AssessmentBuilder>, AssessmentServiceError> {
    Ok(Json(service.builder(job_id).await?))
}

#[derive(Debug, Deserialize)]
struct BuilderBody {
    #[serde(default)]
    sections: Vec<Section>,
}

async fn put_builder(
    State(service): State<Arc<AssessmentService>>,
    Path(job_id): Path<u64>,
    Json(body): Json<BuilderBody>,
) -> Result<Json<AssessmentBuilder>, AssessmentServiceError> {
    Ok(Json(service.put_builder(job_id, body.sections).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    candidate_id: u64,
    #[serde(default)]
    answers: BTreeMap<String, Answer>,
}

async fn submit_response(
    State(service): State<Arc<AssessmentService>>,
    Path(job_id): Path<u64>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<AssessmentResponse>), AssessmentServiceError> {
    let response = service.submit(job_id, body.candidate_id, body.answers).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_responses(
    State(service): State<Arc<AssessmentService>>,
    Path(job_id): Path<u64>,
) -> Result<Json<serde_json::Value>, AssessmentServiceError> {
    let items = service.responses(job_id).await?;
    Ok(Json(json!({ "items": items })))
}
