use std::sync::Arc;

use axum::Router;
use serde_json::json;

use crate::pipeline::jobs::{Job, JobPatch, NewJob};
use crate::pipeline::page::Page;

use super::cache::{QueryCache, QueryKey};
use super::transport::{ApiClient, TransportError};

const ACTIVE: &str = "jobs";
const ARCHIVED: &str = "jobs-archived";

/// Parameters for one job list view. The canonical query string doubles
/// as the cache key, so two views with the same parameters share one
/// cached snapshot.
#[derive(Debug, Clone, Default)]
pub struct JobListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
}

impl JobListParams {
    fn query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(format!("page={page}"));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(format!("pageSize={page_size}"));
        }
        for (name, value) in [
            ("search", &self.search),
            ("status", &self.status),
            ("tag", &self.tag),
        ] {
            if let Some(value) = value {
                pairs.push(format!("{name}={}", encode_query_value(value)));
            }
        }
        pairs.join("&")
    }
}

/// Percent-encode a query value, leaving unreserved characters alone.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn path_with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// Caching client for the jobs surface. Reads go through a per-view
/// snapshot cache; reorder and archive/unarchive apply their effect to the
/// cached views before the command is issued and roll back on failure.
pub struct JobsClient {
    api: ApiClient,
    cache: QueryCache<Page<Job>>,
}

impl JobsClient {
    pub fn new(router: Router) -> Self {
        Self::with_api(ApiClient::new(router))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self {
            api,
            cache: QueryCache::new(),
        }
    }

    pub async fn list(
        &self,
        params: &JobListParams,
    ) -> Result<Arc<Page<Job>>, TransportError> {
        self.fetch_view(ACTIVE, "/jobs", params).await
    }

    pub async fn list_archived(
        &self,
        params: &JobListParams,
    ) -> Result<Arc<Page<Job>>, TransportError> {
        self.fetch_view(ARCHIVED, "/jobs/archived", params).await
    }

    async fn fetch_view(
        &self,
        family: &'static str,
        path: &str,
        params: &JobListParams,
    ) -> Result<Arc<Page<Job>>, TransportError> {
        let key = QueryKey::new(family, params.query_string());
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let page: Page<Job> = self.api.get(&path_with_query(path, &key.params)).await?;
        Ok(self.cache.put(key, page).await)
    }

    pub async fn create(&self, input: &NewJob) -> Result<Job, TransportError> {
        let job = self.api.post("/jobs", input).await?;
        self.cache.invalidate(&[ACTIVE]).await;
        Ok(job)
    }

    pub async fn update(&self, id: u64, patch: &JobPatch) -> Result<Job, TransportError> {
        let job = self.api.patch(&format!("/jobs/{id}"), patch).await?;
        self.cache.invalidate(&[ACTIVE]).await;
        Ok(job)
    }

    pub async fn delete(&self, id: u64) -> Result<(), TransportError> {
        let _: serde_json::Value = self.api.delete(&format!("/jobs/{id}")).await?;
        self.cache.invalidate(&[ACTIVE, ARCHIVED]).await;
        Ok(())
    }

    /// Move a job to `target_index` within the given view and persist the
    /// resulting ranking. The full view is renumbered densely to 0..N-1 and
    /// one reorder command is issued per job whose position changed, so the
    /// stored order stays a dense ranking after settlement.
    ///
    /// The new ordering is applied to every cached active view before the
    /// first command goes out; any command failure restores the captured
    /// snapshots verbatim.
    pub async fn reorder(
        &self,
        view: &Page<Job>,
        id: u64,
        target_index: usize,
    ) -> Result<(), TransportError> {
        let mut ranked: Vec<&Job> = view.items.iter().collect();
        ranked.sort_by_key(|job| job.order);
        let Some(from) = ranked.iter().position(|job| job.id == id) else {
            return Ok(());
        };
        let moved = ranked.remove(from);
        let target = target_index.min(ranked.len());
        ranked.insert(target, moved);

        let changed: Vec<(u64, i64)> = ranked
            .iter()
            .enumerate()
            .filter(|(position, job)| job.order != *position as i64)
            .map(|(position, job)| (job.id, position as i64))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let guard = self.cache.capture(&[ACTIVE]).await;
        self.cache
            .apply(ACTIVE, |page| {
                let mut next = page.clone();
                let mut touched = false;
                for job in &mut next.items {
                    if let Some((_, order)) = changed.iter().find(|(id, _)| *id == job.id) {
                        job.order = *order;
                        touched = true;
                    }
                }
                if touched {
                    next.items.sort_by_key(|job| job.order);
                    Some(next)
                } else {
                    None
                }
            })
            .await;

        for (id, order) in &changed {
            let outcome: Result<Job, TransportError> = self
                .api
                .patch(&format!("/jobs/{id}/reorder"), &json!({ "order": order }))
                .await;
            if let Err(err) = outcome {
                self.cache.restore(guard).await;
                return Err(err);
            }
        }
        self.cache.invalidate(&[ACTIVE]).await;
        Ok(())
    }

    /// Archive a job: it leaves every cached active view immediately and is
    /// prepended to every cached archived view, then the command is issued.
    pub async fn archive(&self, id: u64) -> Result<Job, TransportError> {
        self.toggle_archived(id, true, ACTIVE, ARCHIVED).await
    }

    /// The mirror move, archived back to active.
    pub async fn unarchive(&self, id: u64) -> Result<Job, TransportError> {
        self.toggle_archived(id, false, ARCHIVED, ACTIVE).await
    }

    async fn toggle_archived(
        &self,
        id: u64,
        archived: bool,
        source: &'static str,
        destination: &'static str,
    ) -> Result<Job, TransportError> {
        let guard = self.cache.capture(&[ACTIVE, ARCHIVED]).await;

        let moved = self
            .cache
            .find_map(source, |page| {
                page.items.iter().find(|job| job.id == id).cloned()
            })
            .await;
        if let Some(mut job) = moved {
            job.archived = archived;
            self.cache
                .apply(source, |page| {
                    if !page.items.iter().any(|item| item.id == id) {
                        return None;
                    }
                    let mut next = page.clone();
                    next.items.retain(|item| item.id != id);
                    Some(next)
                })
                .await;
            self.cache
                .apply(destination, |page| {
                    let mut next = page.clone();
                    next.items.insert(0, job.clone());
                    Some(next)
                })
                .await;
        }

        let action = if archived { "archive" } else { "unarchive" };
        let outcome: Result<Job, TransportError> = self
            .api
            .patch(&format!("/jobs/{id}/{action}"), &json!({}))
            .await;
        match outcome {
            Ok(job) => {
                self.cache.invalidate(&[ACTIVE, ARCHIVED]).await;
                Ok(job)
            }
            Err(err) => {
                self.cache.restore(guard).await;
                Err(err)
            }
        }
    }
}
