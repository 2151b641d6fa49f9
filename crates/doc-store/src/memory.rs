use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::DocumentId;

use crate::{
    Document, Result, StoreError, Version,
    store::{DocumentStore, PutOptions, json_contains},
};

/// In-memory document store implementation for testing.
///
/// This implementation stores all documents in memory and provides
/// the same interface as the PostgreSQL implementation, including
/// version checks on writes.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<(String, DocumentId), Document>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored across all collections.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Clears all documents.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(collection.to_string(), id)).cloned())
    }

    async fn put(
        &self,
        collection: &str,
        id: DocumentId,
        payload: serde_json::Value,
        options: PutOptions,
    ) -> Result<Version> {
        let mut documents = self.documents.write().await;
        let key = (collection.to_string(), id);

        let current_version = documents
            .get(&key)
            .map(|d| d.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(StoreError::VersionConflict {
                collection: collection.to_string(),
                id,
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        documents.insert(key, Document::new(id, new_version, payload));

        Ok(new_version)
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&(collection.to_string(), id)).is_some())
    }

    async fn find(&self, collection: &str, filter: serde_json::Value) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut matches: Vec<_> = documents
            .iter()
            .filter(|((coll, _), doc)| coll == collection && json_contains(&doc.payload, &filter))
            .map(|(_, doc)| doc.clone())
            .collect();

        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_and_get_document() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        let version = store
            .put("products", id, json!({"name": "widget"}), PutOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let doc = store.get("products", id).await.unwrap().unwrap();
        assert_eq!(doc.version, Version::first());
        assert_eq!(doc.payload, json!({"name": "widget"}));
    }

    #[tokio::test]
    async fn get_missing_document_returns_none() {
        let store = InMemoryDocumentStore::new();
        let doc = store.get("products", DocumentId::new()).await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        store
            .put("products", id, json!({"name": "widget"}), PutOptions::new())
            .await
            .unwrap();

        assert!(store.get("orders", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_bumps_version_on_each_write() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        let v1 = store
            .put("products", id, json!({"stock": 5}), PutOptions::new())
            .await
            .unwrap();
        let v2 = store
            .put("products", id, json!({"stock": 4}), PutOptions::new())
            .await
            .unwrap();

        assert_eq!(v1, Version::first());
        assert_eq!(v2, Version::new(2));
    }

    #[tokio::test]
    async fn version_conflict_on_stale_expected_version() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        store
            .put("products", id, json!({"stock": 5}), PutOptions::expect_new())
            .await
            .unwrap();
        store
            .put(
                "products",
                id,
                json!({"stock": 4}),
                PutOptions::expect_version(Version::first()),
            )
            .await
            .unwrap();

        // Writing again with the now-stale version must fail.
        let result = store
            .put(
                "products",
                id,
                json!({"stock": 3}),
                PutOptions::expect_version(Version::first()),
            )
            .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn expect_new_fails_when_document_exists() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        store
            .put("users", id, json!({"username": "ada"}), PutOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .put("users", id, json!({"username": "ada"}), PutOptions::expect_new())
            .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();

        store
            .put("carts", id, json!({"items": []}), PutOptions::new())
            .await
            .unwrap();

        assert!(store.delete("carts", id).await.unwrap());
        assert!(!store.delete("carts", id).await.unwrap());
        assert!(store.get("carts", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_filters_by_containment() {
        let store = InMemoryDocumentStore::new();

        store
            .put(
                "orders",
                DocumentId::new(),
                json!({"userId": "u1", "status": "pending"}),
                PutOptions::new(),
            )
            .await
            .unwrap();
        store
            .put(
                "orders",
                DocumentId::new(),
                json!({"userId": "u1", "status": "delivered"}),
                PutOptions::new(),
            )
            .await
            .unwrap();
        store
            .put(
                "orders",
                DocumentId::new(),
                json!({"userId": "u2", "status": "pending"}),
                PutOptions::new(),
            )
            .await
            .unwrap();

        let for_user = store.find("orders", json!({"userId": "u1"})).await.unwrap();
        assert_eq!(for_user.len(), 2);

        let pending = store
            .find("orders", json!({"userId": "u1", "status": "pending"}))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let all = store.find("orders", json!({})).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
