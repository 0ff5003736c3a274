use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::pipeline::page::{paginate, Page};
use crate::pipeline::sim::Simulation;
use crate::store::{collections, Store, StoreError};

use super::domain::{
    validate_answers, validate_builder, Answer, Assessment, AssessmentBuilder, AssessmentPatch,
    AssessmentResponse, NewAssessment, Section,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct AssessmentListFilter {
    pub status: Option<String>,
    pub job_id: Option<u64>,
    pub candidate_id: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("simulated write failure")]
    WriteRejected,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored assessment is not decodable: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Query/command handlers for assessments, per-job builder documents, and
/// submitted responses.
pub struct AssessmentService {
    store: Arc<Store>,
    sim: Simulation,
}

impl AssessmentService {
    pub fn new(store: Arc<Store>, sim: Simulation) -> Self {
        Self { store, sim }
    }

    pub async fn list(
        &self,
        filter: &AssessmentListFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Assessment>, AssessmentServiceError> {
        self.sim.delay().await;

        let mut items: Vec<Assessment> = self
            .store
            .all(collections::ASSESSMENTS)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(candidate_id) = filter.candidate_id {
            items.retain(|assessment| assessment.candidate_id == candidate_id);
        }
        if let Some(job_id) = filter.job_id {
            items.retain(|assessment| assessment.job_id == job_id);
        }
        if let Some(status) = &filter.status {
            items.retain(|assessment| assessment.status.label() == status);
        }

        Ok(paginate(items, page, page_size))
    }

    pub async fn create(
        &self,
        input: NewAssessment,
    ) -> Result<Assessment, AssessmentServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(AssessmentServiceError::WriteRejected);
        }
        check_score(input.score)?;
        let assessment = Assessment {
            id: 0,
            candidate_id: input.candidate_id,
            job_id: input.job_id,
            score: input.score,
            status: input.status,
            created_at: Utc::now().timestamp_millis(),
        };
        let id = self
            .store
            .insert(collections::ASSESSMENTS, serde_json::to_value(&assessment)?)
            .await?;
        Ok(Assessment { id, ..assessment })
    }

    pub async fn update(
        &self,
        id: u64,
        patch: AssessmentPatch,
    ) -> Result<Assessment, AssessmentServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(AssessmentServiceError::WriteRejected);
        }

        let mut merge = Map::new();
        if let Some(score) = patch.score {
            check_score(score)?;
            merge.insert("score".to_string(), Value::from(score));
        }
        if let Some(status) = patch.status {
            merge.insert("status".to_string(), serde_json::to_value(status)?);
        }

        match self.store.merge(collections::ASSESSMENTS, id, &merge).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(AssessmentServiceError::NotFound),
        }
    }

    /// Hard removal, idempotent by effect.
    pub async fn delete(&self, id: u64) -> Result<(), AssessmentServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(AssessmentServiceError::WriteRejected);
        }
        self.store.remove(collections::ASSESSMENTS, id).await?;
        Ok(())
    }

    /// The job's builder document; a job without one reads as an empty
    /// builder rather than 404.
    pub async fn builder(&self, job_id: u64) -> Result<AssessmentBuilder, AssessmentServiceError> {
        self.sim.delay().await;
        match self.store.get(collections::ASSESSMENT_BUILDERS, job_id).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Ok(AssessmentBuilder::empty(job_id)),
        }
    }

    /// Replace the job's builder wholesale. The document is validated
    /// before it is stored.
    pub async fn put_builder(
        &self,
        job_id: u64,
        sections: Vec<Section>,
    ) -> Result<AssessmentBuilder, AssessmentServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(AssessmentServiceError::WriteRejected);
        }
        let builder = AssessmentBuilder { job_id, sections };
        validate_builder(&builder).map_err(AssessmentServiceError::Validation)?;
        self.store
            .put(
                collections::ASSESSMENT_BUILDERS,
                job_id,
                serde_json::to_value(&builder)?,
            )
            .await?;
        Ok(builder)
    }

    /// Record a candidate's answers against the job's builder. Answers are
    /// validated against the builder's questions before acceptance.
    pub async fn submit(
        &self,
        job_id: u64,
        candidate_id: u64,
        answers: BTreeMap<String, Answer>,
    ) -> Result<AssessmentResponse, AssessmentServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(AssessmentServiceError::WriteRejected);
        }

        let builder = match self.store.get(collections::ASSESSMENT_BUILDERS, job_id).await? {
            Some(doc) => serde_json::from_value(doc)?,
            None => AssessmentBuilder::empty(job_id),
        };
        validate_answers(&builder, &answers).map_err(AssessmentServiceError::Validation)?;

        let response = AssessmentResponse {
            id: 0,
            job_id,
            candidate_id,
            answers,
            created_at: Utc::now().timestamp_millis(),
        };
        let id = self
            .store
            .insert(
                collections::ASSESSMENT_RESPONSES,
                serde_json::to_value(&response)?,
            )
            .await?;
        Ok(AssessmentResponse { id, ..response })
    }

    /// Responses recorded for a job, oldest first.
    pub async fn responses(
        &self,
        job_id: u64,
    ) -> Result<Vec<AssessmentResponse>, AssessmentServiceError> {
        self.sim.delay().await;
        let docs = self
            .store
            .where_equals(
                collections::ASSESSMENT_RESPONSES,
                "jobId",
                &Value::from(job_id),
            )
            .await?;
        let mut responses: Vec<AssessmentResponse> = docs
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        responses.sort_by_key(|response| response.created_at);
        Ok(responses)
    }
}

fn check_score(score: u8) -> Result<(), AssessmentServiceError> {
    if score > 100 {
        return Err(AssessmentServiceError::Validation(format!(
            "score {score} is out of range 0..=100"
        )));
    }
    Ok(())
}
