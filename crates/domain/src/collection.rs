//! Typed view over a document store collection.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use common::DocumentId;
use doc_store::{DocumentStore, PutOptions, Version};

use crate::error::{DomainError, Result};

/// A value read from the store together with its concurrency metadata.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// Identifier of the document holding this value.
    pub id: DocumentId,

    /// Version of the document when it was read.
    pub version: Version,

    /// The deserialized value.
    pub value: T,
}

/// A named collection whose documents deserialize to `T`.
///
/// Collections carry no state beyond their name, so entity modules
/// declare them as consts and services use them against whatever
/// [`DocumentStore`] they were constructed with.
pub struct Collection<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    /// Creates a collection with the given name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Retrieves a value by id, or None if the document doesn't exist.
    pub async fn get<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        id: DocumentId,
    ) -> Result<Option<Versioned<T>>> {
        match store.get(self.name, id).await? {
            Some(doc) => Ok(Some(Versioned {
                id: doc.id,
                version: doc.version,
                value: doc.deserialize()?,
            })),
            None => Ok(None),
        }
    }

    /// Retrieves a value by id, or fails with NotFound.
    pub async fn get_required<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        id: DocumentId,
    ) -> Result<Versioned<T>> {
        self.get(store, id)
            .await?
            .ok_or_else(|| DomainError::not_found(self.name, id))
    }

    /// Writes a value, creating or replacing the document.
    ///
    /// Returns the new version after the write.
    pub async fn put<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        id: DocumentId,
        value: &T,
        options: PutOptions,
    ) -> Result<Version> {
        let payload = serde_json::to_value(value)?;
        Ok(store.put(self.name, id, payload, options).await?)
    }

    /// Deletes a document. Returns true if it existed.
    pub async fn delete<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        id: DocumentId,
    ) -> Result<bool> {
        Ok(store.delete(self.name, id).await?)
    }

    /// Retrieves all values whose document contains the given JSON filter.
    pub async fn find<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        filter: serde_json::Value,
    ) -> Result<Vec<Versioned<T>>> {
        let docs = store.find(self.name, filter).await?;
        docs.into_iter()
            .map(|doc| {
                Ok(Versioned {
                    id: doc.id,
                    version: doc.version,
                    value: doc.deserialize()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::InMemoryDocumentStore;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        weight: u32,
    }

    const WIDGETS: Collection<Widget> = Collection::new("widgets");

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        let widget = Widget {
            name: "sprocket".to_string(),
            weight: 5,
        };

        WIDGETS
            .put(&store, id, &widget, PutOptions::expect_new())
            .await
            .unwrap();

        let loaded = WIDGETS.get(&store, id).await.unwrap().unwrap();
        assert_eq!(loaded.value, widget);
        assert_eq!(loaded.version, Version::first());
    }

    #[tokio::test]
    async fn get_required_fails_with_not_found() {
        let store = InMemoryDocumentStore::new();
        let result = WIDGETS.get_required(&store, DocumentId::new()).await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound { kind: "widgets", .. })
        ));
    }

    #[tokio::test]
    async fn stale_version_maps_to_conflict() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        let widget = Widget {
            name: "sprocket".to_string(),
            weight: 5,
        };

        WIDGETS
            .put(&store, id, &widget, PutOptions::new())
            .await
            .unwrap();
        WIDGETS
            .put(&store, id, &widget, PutOptions::new())
            .await
            .unwrap();

        let result = WIDGETS
            .put(&store, id, &widget, PutOptions::expect_version(Version::first()))
            .await;

        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn find_deserializes_matches() {
        let store = InMemoryDocumentStore::new();
        WIDGETS
            .put(
                &store,
                DocumentId::new(),
                &Widget {
                    name: "sprocket".to_string(),
                    weight: 5,
                },
                PutOptions::new(),
            )
            .await
            .unwrap();
        WIDGETS
            .put(
                &store,
                DocumentId::new(),
                &Widget {
                    name: "gear".to_string(),
                    weight: 9,
                },
                PutOptions::new(),
            )
            .await
            .unwrap();

        let gears = WIDGETS.find(&store, json!({"name": "gear"})).await.unwrap();
        assert_eq!(gears.len(), 1);
        assert_eq!(gears[0].value.weight, 9);
    }
}
