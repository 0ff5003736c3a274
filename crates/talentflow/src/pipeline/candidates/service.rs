use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::pipeline::page::{paginate, Page};
use crate::pipeline::sim::Simulation;
use crate::store::{collections, Store, StoreError};

use super::domain::{Candidate, CandidatePatch, NewCandidate, TimelineEntry, TimelineKind};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct CandidateListFilter {
    pub search: Option<String>,
    pub stage: Option<String>,
    pub job_id: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum CandidateServiceError {
    #[error("Not found")]
    NotFound,
    #[error("simulated write failure")]
    WriteRejected,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored candidate is not decodable: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Query/command handlers for candidates and their append-only timelines.
pub struct CandidateService {
    store: Arc<Store>,
    sim: Simulation,
}

impl CandidateService {
    pub fn new(store: Arc<Store>, sim: Simulation) -> Self {
        Self { store, sim }
    }

    /// List candidates newest-first; search matches name or email,
    /// case-insensitively.
    pub async fn list(
        &self,
        filter: &CandidateListFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Candidate>, CandidateServiceError> {
        self.sim.delay().await;

        let mut items = decode_candidates(self.store.all(collections::CANDIDATES).await?)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(job_id) = filter.job_id {
            items.retain(|candidate| candidate.job_id == Some(job_id));
        }
        if let Some(stage) = &filter.stage {
            items.retain(|candidate| candidate.stage.label() == stage);
        }
        if let Some(search) = &filter.search {
            let q = search.to_lowercase();
            items.retain(|candidate| {
                candidate.name.to_lowercase().contains(&q)
                    || candidate.email.to_lowercase().contains(&q)
            });
        }

        Ok(paginate(items, page, page_size))
    }

    pub async fn get(&self, id: u64) -> Result<Candidate, CandidateServiceError> {
        self.sim.delay().await;
        match self.store.get(collections::CANDIDATES, id).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(CandidateServiceError::NotFound),
        }
    }

    pub async fn create(&self, input: NewCandidate) -> Result<Candidate, CandidateServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(CandidateServiceError::WriteRejected);
        }
        let candidate = Candidate {
            id: 0,
            name: input.name,
            email: input.email.to_lowercase(),
            job_id: input.job_id,
            stage: input.stage,
            created_at: Utc::now().timestamp_millis(),
        };
        let id = self
            .store
            .insert(collections::CANDIDATES, serde_json::to_value(&candidate)?)
            .await?;
        Ok(Candidate { id, ..candidate })
    }

    /// Merge partial fields; emails are normalized to lowercase. A stage
    /// change appends a `stage` entry to the candidate's timeline.
    pub async fn update(
        &self,
        id: u64,
        patch: CandidatePatch,
    ) -> Result<Candidate, CandidateServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(CandidateServiceError::WriteRejected);
        }

        let previous_stage = match self.store.get(collections::CANDIDATES, id).await? {
            Some(doc) => serde_json::from_value::<Candidate>(doc)?.stage,
            None => return Err(CandidateServiceError::NotFound),
        };

        let mut merge = Map::new();
        if let Some(name) = patch.name {
            merge.insert("name".to_string(), Value::from(name));
        }
        if let Some(email) = patch.email {
            merge.insert("email".to_string(), Value::from(email.to_lowercase()));
        }
        if let Some(job_id) = patch.job_id {
            merge.insert("jobId".to_string(), serde_json::to_value(job_id)?);
        }
        if let Some(stage) = patch.stage {
            merge.insert("stage".to_string(), serde_json::to_value(stage)?);
        }

        let updated = match self.store.merge(collections::CANDIDATES, id, &merge).await? {
            Some(doc) => serde_json::from_value::<Candidate>(doc)?,
            None => return Err(CandidateServiceError::NotFound),
        };

        if updated.stage != previous_stage {
            self.append_timeline(
                id,
                TimelineKind::Stage,
                format!("moved to {}", updated.stage.label()),
            )
            .await?;
        }
        Ok(updated)
    }

    /// Hard removal, idempotent by effect. The timeline is left in place;
    /// entries hold only a weak reference.
    pub async fn delete(&self, id: u64) -> Result<(), CandidateServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(CandidateServiceError::WriteRejected);
        }
        self.store.remove(collections::CANDIDATES, id).await?;
        Ok(())
    }

    /// The candidate's timeline, oldest first.
    pub async fn timeline(
        &self,
        candidate_id: u64,
    ) -> Result<Vec<TimelineEntry>, CandidateServiceError> {
        self.sim.delay().await;
        let docs = self
            .store
            .where_equals(
                collections::CANDIDATE_TIMELINES,
                "candidateId",
                &Value::from(candidate_id),
            )
            .await?;
        let mut entries: Vec<TimelineEntry> = docs
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    /// Append a recruiter note to the timeline.
    pub async fn add_note(
        &self,
        candidate_id: u64,
        message: String,
    ) -> Result<TimelineEntry, CandidateServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(CandidateServiceError::WriteRejected);
        }
        self.append_timeline(candidate_id, TimelineKind::Note, message)
            .await
    }

    async fn append_timeline(
        &self,
        candidate_id: u64,
        kind: TimelineKind,
        message: String,
    ) -> Result<TimelineEntry, CandidateServiceError> {
        let entry = TimelineEntry {
            id: 0,
            candidate_id,
            kind,
            message,
            created_at: Utc::now().timestamp_millis(),
        };
        let id = self
            .store
            .insert(
                collections::CANDIDATE_TIMELINES,
                serde_json::to_value(&entry)?,
            )
            .await?;
        Ok(TimelineEntry { id, ..entry })
    }
}

fn decode_candidates(docs: Vec<Value>) -> Result<Vec<Candidate>, CandidateServiceError> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(CandidateServiceError::from))
        .collect()
}
