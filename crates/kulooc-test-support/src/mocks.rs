//! In-memory stand-ins for the Firestore and Identity Toolkit clients.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kulooc_firebase::firestore::generate_document_id;
use kulooc_firebase::{AccountStore, Document, DocumentStore, FieldQuery, FirebaseError, FirebaseResult};
use reqwest::StatusCode;
use serde_json::{Map, Value};

/// Timestamp written for every server-assigned field.
pub const SERVER_TIME: &str = "2026-01-01T00:00:00Z";

const DATABASE: &str = "projects/kulooc-test/databases/(default)";

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// Document store backed by nested maps. Counts every write.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: Mutex<Collections>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document without counting it as a write.
    pub fn seed(&self, collection: &str, id: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Fields of one document.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, BTreeMap::len)
    }

    /// Writes (create, update, delete) performed through the trait.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn document(collection: &str, id: &str, fields: &Map<String, Value>) -> Document {
    Document {
        name: format!("{DATABASE}/documents/{collection}/{id}"),
        fields: fields.clone(),
        create_time: Some(SERVER_TIME.to_string()),
        update_time: Some(SERVER_TIME.to_string()),
    }
}

fn apply_timestamps(fields: &mut Map<String, Value>, server_timestamps: &[&str]) {
    for field in server_timestamps {
        fields.insert((*field).to_string(), Value::String(SERVER_TIME.to_string()));
    }
}

fn precondition_failed(operation: &'static str, message: &str) -> FirebaseError {
    FirebaseError::Api {
        operation,
        status: StatusCode::NOT_FOUND,
        api_status: Some("NOT_FOUND".to_string()),
        message: Some(message.to_string()),
        body: String::new(),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_documents(&self, collection: &str) -> FirebaseResult<Vec<Document>> {
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| document(collection, id, fields))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn run_query(&self, query: &FieldQuery) -> FirebaseResult<Vec<Document>> {
        let limit = query
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(self
            .lock()
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| fields.get(&query.field) == Some(&query.value))
                    .take(limit)
                    .map(|(id, fields)| document(&query.collection, id, fields))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_document(
        &self,
        collection: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<String> {
        let id = generate_document_id();
        let mut stored = fields.clone();
        apply_timestamps(&mut stored, server_timestamps);
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stored);
        self.record_write();
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
        server_timestamps: &[&str],
    ) -> FirebaseResult<()> {
        let mut collections = self.lock();
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| precondition_failed("commit", "no document to update"))?;
        for (key, value) in fields {
            existing.insert(key.clone(), value.clone());
        }
        apply_timestamps(existing, server_timestamps);
        drop(collections);
        self.record_write();
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> FirebaseResult<()> {
        if let Some(docs) = self.lock().get_mut(collection) {
            docs.remove(id);
        }
        self.record_write();
        Ok(())
    }
}

/// Account store holding a set of uids.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    uids: Mutex<BTreeSet<String>>,
    deleted: Mutex<Vec<String>>,
}

impl InMemoryAccounts {
    /// Store containing the given accounts.
    #[must_use]
    pub fn with_accounts<I, S>(uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uids: Mutex::new(uids.into_iter().map(Into::into).collect()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Whether an account with `uid` remains.
    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.uids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(uid)
    }

    /// Uids deleted so far, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccounts {
    async fn delete_account(&self, uid: &str) -> FirebaseResult<()> {
        let removed = self
            .uids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uid);
        if !removed {
            return Err(FirebaseError::Api {
                operation: "delete account",
                status: StatusCode::BAD_REQUEST,
                api_status: None,
                message: Some("USER_NOT_FOUND".to_string()),
                body: String::new(),
            });
        }
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(uid.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[tokio::test]
    async fn query_filters_by_field_and_honours_limit() -> Result<()> {
        let store = InMemoryStore::new();
        store.seed("drivers", "a", json!({ "firstName": "Jean-Pierre" }));
        store.seed("drivers", "b", json!({ "firstName": "Jean-Pierre" }));
        store.seed("drivers", "c", json!({ "firstName": "Marie" }));

        let query = FieldQuery::equal("drivers", "firstName", json!("Jean-Pierre"));
        assert_eq!(store.run_query(&query).await?.len(), 2);
        assert_eq!(store.run_query(&query.limit(1)).await?.len(), 1);
        assert_eq!(store.writes(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn update_of_missing_document_fails_without_writing() {
        let store = InMemoryStore::new();
        let result = store
            .update_document("drivers", "ghost", &Map::new(), &["updatedAt"])
            .await;
        assert!(result.is_err());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn create_applies_server_timestamps() -> Result<()> {
        let store = InMemoryStore::new();
        let id = store
            .create_document("drivers", &Map::new(), &["createdAt"])
            .await?;
        let fields = store.get("drivers", &id).unwrap_or_default();
        assert_eq!(fields.get("createdAt"), Some(&json!(SERVER_TIME)));
        assert_eq!(id.len(), 20);
        Ok(())
    }

    #[tokio::test]
    async fn deleting_unknown_account_is_an_error() -> Result<()> {
        let accounts = InMemoryAccounts::with_accounts(["uid-1"]);
        accounts.delete_account("uid-1").await?;
        assert!(accounts.delete_account("uid-1").await.is_err());
        assert_eq!(accounts.deleted(), vec!["uid-1".to_string()]);
        assert!(!accounts.contains("uid-1"));
        Ok(())
    }
}
