use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

/// A single collection of JSON documents under auto-incrementing keys.
///
/// Documents are always JSON objects; the assigned key is mirrored into the
/// document under `"id"` so reads return self-describing records. Fields
/// named in `indexed_fields` get an equality index (field value, canonically
/// rendered, mapped to the set of ids holding it).
#[derive(Debug, Clone, Default)]
pub struct Collection {
    next_id: u64,
    indexed_fields: Vec<String>,
    docs: BTreeMap<u64, Value>,
    indexes: HashMap<String, BTreeMap<String, BTreeSet<u64>>>,
}

/// Canonical index key for a field value. Nulls, arrays, and objects are not
/// indexable and simply produce no index entry.
fn index_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl Collection {
    pub fn new(indexed_fields: &[&str]) -> Self {
        let mut collection = Self {
            next_id: 1,
            indexed_fields: indexed_fields.iter().map(|f| f.to_string()).collect(),
            docs: BTreeMap::new(),
            indexes: HashMap::new(),
        };
        collection.rebuild_indexes();
        collection
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Replace the indexed field set (used when a schema version widens the
    /// index coverage of an existing collection) and rebuild.
    pub fn set_indexed_fields(&mut self, indexed_fields: &[&str]) {
        self.indexed_fields = indexed_fields.iter().map(|f| f.to_string()).collect();
        self.rebuild_indexes();
    }

    pub fn indexed_fields(&self) -> &[String] {
        &self.indexed_fields
    }

    /// Insert a new document under the next auto-incremented key. The key is
    /// written into the document as `"id"`. Returns the assigned key, or
    /// `None` when the document is not a JSON object.
    pub fn insert(&mut self, doc: Value) -> Option<u64> {
        let mut object = match doc {
            Value::Object(map) => map,
            _ => return None,
        };
        let id = self.next_id;
        self.next_id += 1;
        object.insert("id".to_string(), Value::from(id));
        let doc = Value::Object(object);
        self.add_index_entries(id, &doc);
        self.docs.insert(id, doc);
        Some(id)
    }

    /// Upsert a document at an explicit key (collections keyed by a foreign
    /// id, e.g. one builder document per job). Bumps the auto-increment
    /// cursor past the key so later inserts cannot collide.
    pub fn put(&mut self, id: u64, doc: Value) -> bool {
        let mut object = match doc {
            Value::Object(map) => map,
            _ => return false,
        };
        object.insert("id".to_string(), Value::from(id));
        self.remove_index_entries(id);
        self.docs.insert(id, Value::Object(object));
        let doc = self.docs.get(&id).cloned().unwrap_or(Value::Null);
        self.add_index_entries(id, &doc);
        if id >= self.next_id {
            self.next_id = id + 1;
        }
        true
    }

    pub fn get(&self, id: u64) -> Option<&Value> {
        self.docs.get(&id)
    }

    /// Shallow-merge the patch fields into the stored document. Returns the
    /// updated document, or `None` when the key is absent.
    pub fn merge(&mut self, id: u64, patch: &Map<String, Value>) -> Option<Value> {
        if !self.docs.contains_key(&id) {
            return None;
        }
        self.remove_index_entries(id);
        let doc = self.docs.get_mut(&id)?;
        if let Value::Object(object) = doc {
            for (key, value) in patch {
                if key == "id" {
                    continue;
                }
                object.insert(key.clone(), value.clone());
            }
        }
        let updated = self.docs.get(&id).cloned();
        if let Some(doc) = &updated {
            self.add_index_entries(id, doc);
        }
        updated
    }

    /// Remove a document; absent keys are a no-op.
    pub fn remove(&mut self, id: u64) -> bool {
        if self.docs.remove(&id).is_some() {
            self.remove_index_entries(id);
            true
        } else {
            false
        }
    }

    /// Documents in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.docs.values()
    }

    /// Ids whose indexed field equals the given value, in key order.
    /// Returns `None` when the field carries no index.
    pub fn ids_where(&self, field: &str, value: &Value) -> Option<Vec<u64>> {
        let index = self.indexes.get(field)?;
        let key = match index_key(value) {
            Some(key) => key,
            None => return Some(Vec::new()),
        };
        Some(
            index
                .get(&key)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
        )
    }

    /// Apply a transformation to every document in place. Used by schema
    /// upgrades; callers must trigger `rebuild_indexes` afterwards (the store
    /// does this once per migration run).
    pub fn update_all<F>(&mut self, mut transform: F)
    where
        F: FnMut(u64, &mut Map<String, Value>),
    {
        for (id, doc) in self.docs.iter_mut() {
            if let Value::Object(object) = doc {
                transform(*id, object);
                object.insert("id".to_string(), Value::from(*id));
            }
        }
    }

    pub fn rebuild_indexes(&mut self) {
        self.indexes = self
            .indexed_fields
            .iter()
            .map(|field| (field.clone(), BTreeMap::new()))
            .collect();
        let entries: Vec<(u64, Value)> = self.docs.iter().map(|(id, d)| (*id, d.clone())).collect();
        for (id, doc) in entries {
            self.add_index_entries(id, &doc);
        }
    }

    fn add_index_entries(&mut self, id: u64, doc: &Value) {
        for field in &self.indexed_fields {
            let Some(index) = self.indexes.get_mut(field) else {
                continue;
            };
            let Some(value) = doc.get(field) else {
                continue;
            };
            if let Some(key) = index_key(value) {
                index.entry(key).or_default().insert(id);
            }
        }
    }

    fn remove_index_entries(&mut self, id: u64) {
        for index in self.indexes.values_mut() {
            index.retain(|_, ids| {
                ids.remove(&id);
                !ids.is_empty()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_assigns_dense_keys_and_mirrors_id() {
        let mut jobs = Collection::new(&["status"]);
        let first = jobs.insert(json!({"title": "a", "status": "open"})).unwrap();
        let second = jobs.insert(json!({"title": "b", "status": "open"})).unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(jobs.get(first).unwrap()["id"], json!(1));
    }

    #[test]
    fn insert_rejects_non_objects() {
        let mut jobs = Collection::new(&[]);
        assert!(jobs.insert(json!("not a document")).is_none());
    }

    #[test]
    fn index_tracks_inserts_merges_and_removals() {
        let mut jobs = Collection::new(&["status"]);
        let id = jobs.insert(json!({"status": "open"})).unwrap();
        assert_eq!(jobs.ids_where("status", &json!("open")).unwrap(), vec![id]);

        let mut patch = Map::new();
        patch.insert("status".to_string(), json!("paused"));
        jobs.merge(id, &patch).unwrap();
        assert!(jobs.ids_where("status", &json!("open")).unwrap().is_empty());
        assert_eq!(jobs.ids_where("status", &json!("paused")).unwrap(), vec![id]);

        jobs.remove(id);
        assert!(jobs
            .ids_where("status", &json!("paused"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn ids_where_requires_an_index() {
        let jobs = Collection::new(&["status"]);
        assert!(jobs.ids_where("slug", &json!("x")).is_none());
    }

    #[test]
    fn merge_never_overwrites_the_key() {
        let mut jobs = Collection::new(&[]);
        let id = jobs.insert(json!({"title": "a"})).unwrap();
        let mut patch = Map::new();
        patch.insert("id".to_string(), json!(999));
        patch.insert("title".to_string(), json!("b"));
        let updated = jobs.merge(id, &patch).unwrap();
        assert_eq!(updated["id"], json!(id));
        assert_eq!(updated["title"], json!("b"));
    }

    #[test]
    fn put_bumps_the_auto_increment_cursor() {
        let mut builders = Collection::new(&[]);
        assert!(builders.put(7, json!({"sections": []})));
        let next = builders.insert(json!({"sections": []})).unwrap();
        assert_eq!(next, 8);
    }

    #[test]
    fn removal_does_not_reuse_keys() {
        let mut jobs = Collection::new(&[]);
        let first = jobs.insert(json!({"title": "a"})).unwrap();
        jobs.remove(first);
        let second = jobs.insert(json!({"title": "b"})).unwrap();
        assert!(second > first);
    }
}
