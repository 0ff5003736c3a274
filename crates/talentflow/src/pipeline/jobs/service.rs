use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::pipeline::page::{paginate, Page};
use crate::pipeline::sim::Simulation;
use crate::store::{collections, Store, StoreError};

use super::domain::{slugify, Job, JobPatch, NewJob};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Filters for the active-jobs listing. `archived` defaults to false at the
/// HTTP layer so the main board never shows archived postings.
#[derive(Debug, Clone, Default)]
pub struct JobListFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub archived: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error("Slug already exists")]
    SlugConflict { slug: String },
    #[error("Not found")]
    NotFound,
    #[error("simulated write failure")]
    WriteRejected,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored job is not decodable: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Query/command handlers for the jobs collection.
pub struct JobService {
    store: Arc<Store>,
    sim: Simulation,
}

impl JobService {
    pub fn new(store: Arc<Store>, sim: Simulation) -> Self {
        Self { store, sim }
    }

    /// List jobs newest-first. With a status filter the candidate set comes
    /// from the status index and is sorted in memory afterwards, which only
    /// affects tie-break stability, not which items match.
    pub async fn list(
        &self,
        filter: &JobListFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Job>, JobServiceError> {
        self.sim.delay().await;

        let docs = match &filter.status {
            Some(status) => {
                self.store
                    .where_equals(collections::JOBS, "status", &Value::from(status.as_str()))
                    .await?
            }
            None => self.store.all(collections::JOBS).await?,
        };
        let mut items = decode_jobs(docs)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(search) = &filter.search {
            let q = search.to_lowercase();
            items.retain(|job| job.title_lowercase.contains(&q));
        }
        if let Some(tag) = &filter.tag {
            let t = tag.to_lowercase();
            items.retain(|job| job.tags.iter().any(|candidate| candidate.to_lowercase().contains(&t)));
        }
        items.retain(|job| job.archived == filter.archived);

        Ok(paginate(items, page, page_size))
    }

    /// The archived listing. Unlike the active board, the tag filter here is
    /// an exact element match.
    pub async fn list_archived(
        &self,
        search: Option<&str>,
        tag: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Job>, JobServiceError> {
        self.sim.delay().await;

        let mut items = decode_jobs(self.store.all(collections::JOBS).await?)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.retain(|job| job.archived);

        if let Some(search) = search {
            let q = search.to_lowercase();
            items.retain(|job| job.title_lowercase.contains(&q));
        }
        if let Some(tag) = tag {
            items.retain(|job| job.tags.iter().any(|candidate| candidate == tag));
        }

        Ok(paginate(items, page, page_size))
    }

    /// Create a job: derive the lowercase title and slug, reject slug
    /// collisions, and rank it after every existing job.
    pub async fn create(&self, input: NewJob) -> Result<Job, JobServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(JobServiceError::WriteRejected);
        }

        let slug = slugify(&input.title);
        let existing = self
            .store
            .where_equals(collections::JOBS, "slug", &Value::from(slug.clone()))
            .await?;
        if !existing.is_empty() {
            return Err(JobServiceError::SlugConflict { slug });
        }

        let max_order = self
            .store
            .all(collections::JOBS)
            .await?
            .iter()
            .filter_map(|doc| doc.get("order").and_then(Value::as_i64))
            .max()
            .unwrap_or(-1);

        let job = Job {
            id: 0,
            title_lowercase: input.title.to_lowercase(),
            title: input.title,
            department: input.department,
            location: input.location,
            status: input.status,
            created_at: Utc::now().timestamp_millis(),
            slug,
            archived: false,
            order: max_order + 1,
            tags: input.tags,
            description: input.description,
        };
        let id = self
            .store
            .insert(collections::JOBS, serde_json::to_value(&job)?)
            .await?;
        Ok(Job { id, ..job })
    }

    /// Merge partial fields. A title change recomputes the derived fields
    /// and re-validates slug uniqueness against every other job.
    pub async fn update(&self, id: u64, patch: JobPatch) -> Result<Job, JobServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(JobServiceError::WriteRejected);
        }

        let mut merge = Map::new();
        if let Some(title) = &patch.title {
            let slug = slugify(title);
            let holders = self
                .store
                .where_equals(collections::JOBS, "slug", &Value::from(slug.clone()))
                .await?;
            if holders
                .iter()
                .any(|doc| doc.get("id").and_then(Value::as_u64) != Some(id))
            {
                return Err(JobServiceError::SlugConflict { slug });
            }
            merge.insert("title".to_string(), Value::from(title.clone()));
            merge.insert(
                "titleLowercase".to_string(),
                Value::from(title.to_lowercase()),
            );
            merge.insert("slug".to_string(), Value::from(slug));
        }
        if let Some(department) = patch.department {
            merge.insert("department".to_string(), Value::from(department));
        }
        if let Some(location) = patch.location {
            merge.insert("location".to_string(), Value::from(location));
        }
        if let Some(status) = patch.status {
            merge.insert("status".to_string(), serde_json::to_value(status)?);
        }
        if let Some(tags) = patch.tags {
            merge.insert("tags".to_string(), serde_json::to_value(tags)?);
        }
        if let Some(description) = patch.description {
            merge.insert("description".to_string(), Value::from(description));
        }

        match self.store.merge(collections::JOBS, id, &merge).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(JobServiceError::NotFound),
        }
    }

    /// Set the order field on this job only. Siblings are never renumbered:
    /// a caller reordering a list must issue one command per item whose
    /// dense position changed (the client layer does exactly that).
    pub async fn reorder(&self, id: u64, order: i64) -> Result<Job, JobServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(JobServiceError::WriteRejected);
        }
        let mut merge = Map::new();
        merge.insert("order".to_string(), Value::from(order));
        match self.store.merge(collections::JOBS, id, &merge).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(JobServiceError::NotFound),
        }
    }

    /// Toggle the archived flag only; order is untouched so unarchiving
    /// restores the job to its previous rank.
    pub async fn set_archived(&self, id: u64, archived: bool) -> Result<Job, JobServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(JobServiceError::WriteRejected);
        }
        let mut merge = Map::new();
        merge.insert("archived".to_string(), Value::from(archived));
        match self.store.merge(collections::JOBS, id, &merge).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(JobServiceError::NotFound),
        }
    }

    /// Hard removal, idempotent by effect: deleting an absent id succeeds.
    pub async fn delete(&self, id: u64) -> Result<(), JobServiceError> {
        self.sim.delay().await;
        if self.sim.write_fails() {
            return Err(JobServiceError::WriteRejected);
        }
        self.store.remove(collections::JOBS, id).await?;
        Ok(())
    }
}

fn decode_jobs(docs: Vec<Value>) -> Result<Vec<Job>, JobServiceError> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(JobServiceError::from))
        .collect()
}
