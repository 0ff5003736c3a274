//! In-process document store standing in for a real backend.
//!
//! Collections hold JSON documents under auto-incrementing keys with
//! equality indexes on declared fields. The schema is versioned; see
//! [`schema`] for the migration history. All access goes through an async
//! `RwLock` so storage operations are suspension points like the simulated
//! network delay.

pub mod collection;
pub mod schema;

pub use collection::Collection;
pub use schema::{collections, Migration, MIGRATIONS};

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),
    #[error("field '{field}' on '{collection}' carries no index")]
    UnindexedField { collection: String, field: String },
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("migration versions must be strictly increasing (saw {version} after {previous})")]
    NonMonotonicMigrations { previous: u32, version: u32 },
    #[error("stored schema version {stored} is newer than the latest migration {latest}")]
    VersionRegression { stored: u32, latest: u32 },
    #[error("migration '{name}' (version {version}) failed: {reason}")]
    MigrationFailed {
        name: &'static str,
        version: u32,
        reason: String,
    },
}

/// The raw store contents: schema version plus named collections. Owned
/// separately from [`Store`] so a store can be closed and reopened against
/// the migration history (the idempotence contract).
#[derive(Debug, Default, Clone)]
pub struct StoreData {
    version: u32,
    collections: BTreeMap<String, Collection>,
}

impl StoreData {
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Create the collection if absent, otherwise widen its index coverage.
    pub fn ensure_collection(&mut self, name: &str, indexed_fields: &[&str]) {
        match self.collections.get_mut(name) {
            Some(existing) => existing.set_indexed_fields(indexed_fields),
            None => {
                self.collections
                    .insert(name.to_string(), Collection::new(indexed_fields));
            }
        }
    }

    pub fn collection(&self, name: &str) -> Result<&Collection, StoreError> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn collection_mut(&mut self, name: &str) -> Result<&mut Collection, StoreError> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    fn migrate(&mut self, migrations: &[Migration]) -> Result<(), StoreError> {
        let mut previous = 0;
        for migration in migrations {
            if migration.version <= previous {
                return Err(StoreError::NonMonotonicMigrations {
                    previous,
                    version: migration.version,
                });
            }
            previous = migration.version;
        }
        if self.version > previous {
            return Err(StoreError::VersionRegression {
                stored: self.version,
                latest: previous,
            });
        }

        for migration in migrations {
            if migration.version <= self.version {
                continue;
            }
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "applying schema migration"
            );
            (migration.upgrade)(self).map_err(|err| StoreError::MigrationFailed {
                name: migration.name,
                version: migration.version,
                reason: err.to_string(),
            })?;
            self.version = migration.version;
        }

        // Upgrades may have transformed documents directly.
        for collection in self.collections.values_mut() {
            collection.rebuild_indexes();
        }
        Ok(())
    }
}

/// Shared handle over the store contents.
#[derive(Debug)]
pub struct Store {
    data: RwLock<StoreData>,
}

impl Store {
    /// Open a fresh store at the latest schema version.
    pub fn open(migrations: &[Migration]) -> Result<Self, StoreError> {
        Self::open_with(StoreData::default(), migrations)
    }

    /// Open existing contents, replaying any migrations above the stored
    /// version. Reopening at the same version changes nothing.
    pub fn open_with(mut data: StoreData, migrations: &[Migration]) -> Result<Self, StoreError> {
        data.migrate(migrations)?;
        Ok(Self {
            data: RwLock::new(data),
        })
    }

    /// Take the contents back out (to reopen against a newer schema).
    pub fn into_data(self) -> StoreData {
        self.data.into_inner()
    }

    pub async fn version(&self) -> u32 {
        self.data.read().await.version
    }

    pub async fn insert(&self, collection: &str, doc: Value) -> Result<u64, StoreError> {
        let mut data = self.data.write().await;
        data.collection_mut(collection)?
            .insert(doc)
            .ok_or(StoreError::NotAnObject)
    }

    pub async fn put(&self, collection: &str, id: u64, doc: Value) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        if data.collection_mut(collection)?.put(id, doc) {
            Ok(())
        } else {
            Err(StoreError::NotAnObject)
        }
    }

    pub async fn get(&self, collection: &str, id: u64) -> Result<Option<Value>, StoreError> {
        let data = self.data.read().await;
        Ok(data.collection(collection)?.get(id).cloned())
    }

    /// Shallow-merge patch fields into a document; `None` when absent.
    pub async fn merge(
        &self,
        collection: &str,
        id: u64,
        patch: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut data = self.data.write().await;
        Ok(data.collection_mut(collection)?.merge(id, patch))
    }

    /// Remove a document. Absent ids are not an error; the boolean reports
    /// whether anything was removed.
    pub async fn remove(&self, collection: &str, id: u64) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        Ok(data.collection_mut(collection)?.remove(id))
    }

    /// All documents in key order.
    pub async fn all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let data = self.data.read().await;
        Ok(data.collection(collection)?.iter().cloned().collect())
    }

    pub async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let data = self.data.read().await;
        Ok(data.collection(collection)?.len())
    }

    /// Documents whose indexed field equals the value, in key order.
    pub async fn where_equals(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let data = self.data.read().await;
        let coll = data.collection(collection)?;
        let ids = coll
            .ids_where(field, value)
            .ok_or_else(|| StoreError::UnindexedField {
                collection: collection.to_string(),
                field: field.to_string(),
            })?;
        Ok(ids
            .into_iter()
            .filter_map(|id| coll.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn open_replays_the_full_history() {
        let store = Store::open(MIGRATIONS).unwrap();
        assert_eq!(store.version().await, 4);
        for name in [
            collections::JOBS,
            collections::CANDIDATES,
            collections::ASSESSMENTS,
            collections::CANDIDATE_TIMELINES,
            collections::ASSESSMENT_BUILDERS,
            collections::ASSESSMENT_RESPONSES,
            collections::USERS,
        ] {
            assert_eq!(store.count(name).await.unwrap(), 0, "collection {name}");
        }
    }

    #[tokio::test]
    async fn reopening_at_the_same_version_is_idempotent() {
        let store = Store::open(MIGRATIONS).unwrap();
        let id = store
            .insert(collections::JOBS, json!({"title": "Backend Engineer"}))
            .await
            .unwrap();

        let reopened = Store::open_with(store.into_data(), MIGRATIONS).unwrap();
        assert_eq!(reopened.version().await, 4);
        let doc = reopened.get(collections::JOBS, id).await.unwrap().unwrap();
        assert_eq!(doc["title"], json!("Backend Engineer"));
    }

    #[tokio::test]
    async fn upgrade_backfills_job_archival_fields_without_losing_identities() {
        // Open at version 1 only, write a bare job, then upgrade.
        let store = Store::open(&MIGRATIONS[..1]).unwrap();
        assert_eq!(store.version().await, 1);
        let first = store
            .insert(
                collections::JOBS,
                json!({"title": "Senior Engineer!", "titleLowercase": "senior engineer!", "status": "open", "createdAt": 1}),
            )
            .await
            .unwrap();
        let second = store
            .insert(
                collections::JOBS,
                json!({"title": "Designer", "titleLowercase": "designer", "status": "open", "createdAt": 2}),
            )
            .await
            .unwrap();

        let upgraded = Store::open_with(store.into_data(), MIGRATIONS).unwrap();
        let doc = upgraded.get(collections::JOBS, first).await.unwrap().unwrap();
        assert_eq!(doc["slug"], json!("senior-engineer"));
        assert_eq!(doc["archived"], json!(false));
        assert_eq!(doc["order"], json!(0));
        let doc = upgraded
            .get(collections::JOBS, second)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["order"], json!(1));

        // Backfilled fields are queryable through the new indexes.
        let matches = upgraded
            .where_equals(collections::JOBS, "slug", &json!("designer"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn upgrade_preserves_existing_backfilled_values() {
        let store = Store::open(MIGRATIONS).unwrap();
        let id = store
            .insert(
                collections::JOBS,
                json!({"title": "Backend Engineer", "slug": "custom-slug", "archived": true, "order": 9}),
            )
            .await
            .unwrap();
        let reopened = Store::open_with(store.into_data(), MIGRATIONS).unwrap();
        let doc = reopened.get(collections::JOBS, id).await.unwrap().unwrap();
        assert_eq!(doc["slug"], json!("custom-slug"));
        assert_eq!(doc["archived"], json!(true));
        assert_eq!(doc["order"], json!(9));
    }

    #[tokio::test]
    async fn rejects_contents_newer_than_the_migration_history() {
        let store = Store::open(MIGRATIONS).unwrap();
        let data = store.into_data();
        match Store::open_with(data, &MIGRATIONS[..2]) {
            Err(StoreError::VersionRegression {
                stored: 4,
                latest: 2,
            }) => {}
            other => panic!("expected version regression, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn where_equals_rejects_unindexed_fields() {
        let store = Store::open(MIGRATIONS).unwrap();
        match store
            .where_equals(collections::JOBS, "description", &json!("x"))
            .await
        {
            Err(StoreError::UnindexedField { .. }) => {}
            other => panic!("expected unindexed field error, got {other:?}"),
        }
    }
}
