//! Product catalog: products, categories and brands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use common::DocumentId;
use doc_store::{DocumentStore, PutOptions};

use crate::collection::{Collection, Versioned};
use crate::error::{DomainError, Result};
use crate::money::Money;

pub const PRODUCTS: Collection<Product> = Collection::new("products");
pub const CATEGORIES: Collection<Category> = Collection::new("categories");
pub const BRANDS: Collection<Brand> = Collection::new("brands");

/// Visibility status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A product listed in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category_id: Option<DocumentId>,
    pub brand_id: Option<DocumentId>,
    pub images: Vec<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category_id: Option<DocumentId>,
    pub brand_id: Option<DocumentId>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A product brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Service for catalog CRUD.
pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> CatalogService<S> {
    /// Creates a new catalog service backed by the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn validate_draft(draft: &ProductDraft) -> Result<()> {
        if draft.name.trim().is_empty() {
            return Err(DomainError::Validation("Product name is required".into()));
        }
        if draft.price.is_negative() {
            return Err(DomainError::Validation(
                "Product price cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// Creates a product.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Versioned<Product>> {
        Self::validate_draft(&draft)?;

        let now = Utc::now();
        let product = Product {
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category_id: draft.category_id,
            brand_id: draft.brand_id,
            images: draft.images,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let id = DocumentId::new();
        let version = PRODUCTS
            .put(&*self.store, id, &product, PutOptions::expect_new())
            .await?;

        Ok(Versioned {
            id,
            version,
            value: product,
        })
    }

    /// Loads a product by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: DocumentId) -> Result<Versioned<Product>> {
        PRODUCTS.get_required(&*self.store, id).await
    }

    /// Lists all products, optionally filtered by category.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(
        &self,
        category_id: Option<DocumentId>,
    ) -> Result<Vec<Versioned<Product>>> {
        let filter = match category_id {
            Some(category) => json!({"categoryId": category}),
            None => json!({}),
        };
        PRODUCTS.find(&*self.store, filter).await
    }

    /// Replaces a product's editable fields.
    #[tracing::instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: DocumentId,
        draft: ProductDraft,
    ) -> Result<Versioned<Product>> {
        Self::validate_draft(&draft)?;

        let existing = PRODUCTS.get_required(&*self.store, id).await?;
        let product = Product {
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category_id: draft.category_id,
            brand_id: draft.brand_id,
            images: draft.images,
            status: existing.value.status,
            created_at: existing.value.created_at,
            updated_at: Utc::now(),
        };

        let version = PRODUCTS
            .put(
                &*self.store,
                id,
                &product,
                PutOptions::expect_version(existing.version),
            )
            .await?;

        Ok(Versioned {
            id,
            version,
            value: product,
        })
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: DocumentId) -> Result<()> {
        if !PRODUCTS.delete(&*self.store, id).await? {
            return Err(DomainError::not_found(PRODUCTS.name(), id));
        }
        Ok(())
    }

    /// Creates a category.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Versioned<Category>> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("Category name is required".into()));
        }

        let category = Category {
            name,
            description,
            created_at: Utc::now(),
        };
        let id = DocumentId::new();
        let version = CATEGORIES
            .put(&*self.store, id, &category, PutOptions::expect_new())
            .await?;

        Ok(Versioned {
            id,
            version,
            value: category,
        })
    }

    /// Lists all categories.
    pub async fn list_categories(&self) -> Result<Vec<Versioned<Category>>> {
        CATEGORIES.find(&*self.store, json!({})).await
    }

    /// Deletes a category.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: DocumentId) -> Result<()> {
        if !CATEGORIES.delete(&*self.store, id).await? {
            return Err(DomainError::not_found(CATEGORIES.name(), id));
        }
        Ok(())
    }

    /// Creates a brand.
    #[tracing::instrument(skip(self))]
    pub async fn create_brand(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Versioned<Brand>> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("Brand name is required".into()));
        }

        let brand = Brand {
            name,
            description,
            created_at: Utc::now(),
        };
        let id = DocumentId::new();
        let version = BRANDS
            .put(&*self.store, id, &brand, PutOptions::expect_new())
            .await?;

        Ok(Versioned {
            id,
            version,
            value: brand,
        })
    }

    /// Lists all brands.
    pub async fn list_brands(&self) -> Result<Vec<Versioned<Brand>>> {
        BRANDS.find(&*self.store, json!({})).await
    }

    /// Deletes a brand.
    #[tracing::instrument(skip(self))]
    pub async fn delete_brand(&self, id: DocumentId) -> Result<()> {
        if !BRANDS.delete(&*self.store, id).await? {
            return Err(DomainError::not_found(BRANDS.name(), id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::InMemoryDocumentStore;

    fn draft(name: &str, price_cents: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: "".to_string(),
            price: Money::from_cents(price_cents),
            category_id: None,
            brand_id: None,
            images: vec![],
        }
    }

    fn service() -> CatalogService<InMemoryDocumentStore> {
        CatalogService::new(Arc::new(InMemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn create_and_get_product() {
        let service = service();

        let created = service.create_product(draft("Widget", 1999)).await.unwrap();
        let loaded = service.get_product(created.id).await.unwrap();

        assert_eq!(loaded.value.name, "Widget");
        assert_eq!(loaded.value.price.cents(), 1999);
        assert_eq!(loaded.value.status, ProductStatus::Active);
    }

    #[tokio::test]
    async fn create_product_rejects_blank_name_and_negative_price() {
        let service = service();

        let blank = service.create_product(draft("  ", 100)).await;
        assert!(matches!(blank, Err(DomainError::Validation(_))));

        let negative = service.create_product(draft("Widget", -1)).await;
        assert!(matches!(negative, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn list_products_filters_by_category() {
        let service = service();

        let category = service
            .create_category("Tools".to_string(), None)
            .await
            .unwrap();

        let mut in_category = draft("Hammer", 500);
        in_category.category_id = Some(category.id);
        service.create_product(in_category).await.unwrap();
        service.create_product(draft("Widget", 1999)).await.unwrap();

        let all = service.list_products(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let tools = service.list_products(Some(category.id)).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].value.name, "Hammer");
    }

    #[tokio::test]
    async fn update_product_keeps_created_at() {
        let service = service();
        let created = service.create_product(draft("Widget", 1999)).await.unwrap();

        let updated = service
            .update_product(created.id, draft("Widget v2", 2499))
            .await
            .unwrap();

        assert_eq!(updated.value.name, "Widget v2");
        assert_eq!(updated.value.price.cents(), 2499);
        assert_eq!(updated.value.created_at, created.value.created_at);
    }

    #[tokio::test]
    async fn delete_missing_product_is_not_found() {
        let service = service();
        let result = service.delete_product(DocumentId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn categories_and_brands_roundtrip() {
        let service = service();

        service
            .create_category("Tools".to_string(), Some("Hand tools".to_string()))
            .await
            .unwrap();
        let brand = service
            .create_brand("Acme".to_string(), None)
            .await
            .unwrap();

        assert_eq!(service.list_categories().await.unwrap().len(), 1);
        assert_eq!(service.list_brands().await.unwrap().len(), 1);

        service.delete_brand(brand.id).await.unwrap();
        assert!(service.list_brands().await.unwrap().is_empty());
    }
}
