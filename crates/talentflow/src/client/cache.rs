use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Cache key for one paginated list view: the resource family plus the
/// canonical query string that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub family: &'static str,
    pub params: String,
}

impl QueryKey {
    pub fn new(family: &'static str, params: impl Into<String>) -> Self {
        Self {
            family,
            params: params.into(),
        }
    }
}

/// Rollback state for one in-flight optimistic mutation. Each guard owns
/// the snapshots captured when its mutation was issued, so concurrent
/// mutations over the same keys cannot clobber each other's undo data.
#[derive(Debug)]
pub struct MutationGuard<T> {
    captured: Vec<(QueryKey, Arc<T>)>,
}

/// Immutable snapshots of list views, keyed by [`QueryKey`]. Entries are
/// shared `Arc`s: an optimistic patch replaces an entry with a fresh
/// snapshot rather than mutating in place, so a captured guard restores
/// the exact pre-mutation value.
pub struct QueryCache<T> {
    entries: Mutex<HashMap<QueryKey, Arc<T>>>,
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn put(&self, key: QueryKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.lock().await.insert(key, value.clone());
        value
    }

    /// Snapshot every held entry in the given families. The guard is taken
    /// before the optimistic patch so it sees the pre-mutation state.
    pub async fn capture(&self, families: &[&'static str]) -> MutationGuard<T> {
        let entries = self.entries.lock().await;
        let captured = entries
            .iter()
            .filter(|(key, _)| families.contains(&key.family))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        MutationGuard { captured }
    }

    /// Put every captured snapshot back verbatim, discarding whatever the
    /// optimistic patch wrote over it.
    pub async fn restore(&self, guard: MutationGuard<T>) {
        let mut entries = self.entries.lock().await;
        for (key, value) in guard.captured {
            entries.insert(key, value);
        }
    }

    /// Rewrite every entry in a family through a pure patch function.
    /// Returning `None` leaves that entry untouched.
    pub async fn apply(&self, family: &'static str, patch: impl Fn(&T) -> Option<T>) {
        let mut entries = self.entries.lock().await;
        for (key, value) in entries.iter_mut() {
            if key.family != family {
                continue;
            }
            if let Some(next) = patch(value) {
                *value = Arc::new(next);
            }
        }
    }

    /// First non-`None` projection over a family's entries.
    pub async fn find_map<R>(
        &self,
        family: &'static str,
        project: impl Fn(&T) -> Option<R>,
    ) -> Option<R> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|(key, _)| key.family == family)
            .find_map(|(_, value)| project(value))
    }

    /// Drop every entry in the given families so the next read refetches.
    pub async fn invalidate(&self, families: &[&'static str]) {
        self.entries
            .lock()
            .await
            .retain(|key, _| !families.contains(&key.family));
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restore_puts_back_the_captured_value() {
        let cache = QueryCache::new();
        let key = QueryKey::new("jobs", "page=1");
        cache.put(key.clone(), vec![1, 2, 3]).await;

        let guard = cache.capture(&["jobs"]).await;
        cache.apply("jobs", |_| Some(vec![9])).await;
        assert_eq!(*cache.get(&key).await.unwrap(), vec![9]);

        cache.restore(guard).await;
        assert_eq!(*cache.get(&key).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn concurrent_guards_hold_independent_snapshots() {
        let cache = QueryCache::new();
        let key = QueryKey::new("jobs", "page=1");
        cache.put(key.clone(), vec![1]).await;

        let first = cache.capture(&["jobs"]).await;
        cache.apply("jobs", |_| Some(vec![2])).await;
        let second = cache.capture(&["jobs"]).await;
        cache.apply("jobs", |_| Some(vec![3])).await;

        // The later mutation rolls back to what it saw, not to the origin.
        cache.restore(second).await;
        assert_eq!(*cache.get(&key).await.unwrap(), vec![2]);
        cache.restore(first).await;
        assert_eq!(*cache.get(&key).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn capture_and_invalidate_scope_to_families() {
        let cache = QueryCache::new();
        cache.put(QueryKey::new("jobs", ""), vec![1]).await;
        cache.put(QueryKey::new("jobs-archived", ""), vec![2]).await;

        let guard = cache.capture(&["jobs"]).await;
        assert_eq!(guard.captured.len(), 1);

        cache.invalidate(&["jobs-archived"]).await;
        assert!(cache.get(&QueryKey::new("jobs", "")).await.is_some());
        assert!(cache
            .get(&QueryKey::new("jobs-archived", ""))
            .await
            .is_none());
    }
}
