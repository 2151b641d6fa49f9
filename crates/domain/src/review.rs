//! Product reviews, gated on delivered orders.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use common::{DocumentId, UserId};
use doc_store::{DocumentStore, PutOptions};

use crate::collection::{Collection, Versioned};
use crate::error::{DomainError, Result};
use crate::inventory::CAS_RETRIES;
use crate::order::{ORDERS, OrderStatus};

pub const REVIEWS: Collection<Review> = Collection::new("reviews");

/// Visibility status of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Visible,
    Hidden,
}

/// A review of a product, tied to the order that delivered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: UserId,
    pub product_id: DocumentId,
    pub order_id: DocumentId,
    pub rating: u8,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub likes: u32,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub product_id: DocumentId,
    pub order_id: DocumentId,
    pub rating: u8,
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Service for review operations.
///
/// A review may only be written once per (user, product, order), by the
/// order's owner, for a delivered order that contains the product.
pub struct ReviewService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ReviewService<S> {
    /// Creates a new review service backed by the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a review after checking every gate in order: rating
    /// range, order existence, ownership, delivery, product membership
    /// and uniqueness.
    #[tracing::instrument(skip(self, draft), fields(order_id = %draft.order_id))]
    pub async fn create_review(
        &self,
        user_id: UserId,
        draft: ReviewDraft,
    ) -> Result<Versioned<Review>> {
        if !(1..=5).contains(&draft.rating) {
            return Err(DomainError::Validation(
                "Rating must be between 1 and 5".into(),
            ));
        }

        let order = ORDERS.get_required(&*self.store, draft.order_id).await?;

        if order.value.user_id != user_id {
            return Err(DomainError::Forbidden(
                "Only the order's owner may review its products".into(),
            ));
        }
        if order.value.status != OrderStatus::Delivered {
            return Err(DomainError::InvalidState(
                "Reviews require a delivered order".into(),
            ));
        }
        if !order.value.contains_product(draft.product_id) {
            return Err(DomainError::Validation(
                "Product is not part of this order".into(),
            ));
        }

        let existing = REVIEWS
            .find(
                &*self.store,
                json!({
                    "userId": user_id,
                    "productId": draft.product_id,
                    "orderId": draft.order_id,
                }),
            )
            .await?;
        if !existing.is_empty() {
            return Err(DomainError::Conflict(
                "A review for this product and order already exists".into(),
            ));
        }

        let now = Utc::now();
        let review = Review {
            user_id,
            product_id: draft.product_id,
            order_id: draft.order_id,
            rating: draft.rating,
            comment: draft.comment,
            images: draft.images,
            likes: 0,
            status: ReviewStatus::Visible,
            created_at: now,
            updated_at: now,
        };

        let id = DocumentId::new();
        let version = REVIEWS
            .put(&*self.store, id, &review, PutOptions::expect_new())
            .await?;

        Ok(Versioned {
            id,
            version,
            value: review,
        })
    }

    /// Lists visible reviews for a product, optionally filtered by rating.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: DocumentId,
        rating: Option<u8>,
    ) -> Result<Vec<Versioned<Review>>> {
        let filter = match rating {
            Some(rating) => json!({"productId": product_id, "rating": rating, "status": "visible"}),
            None => json!({"productId": product_id, "status": "visible"}),
        };
        REVIEWS.find(&*self.store, filter).await
    }

    /// Updates the rating and comment of the caller's own review.
    #[tracing::instrument(skip(self, comment))]
    pub async fn update_review(
        &self,
        review_id: DocumentId,
        caller: UserId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Versioned<Review>> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::Validation(
                "Rating must be between 1 and 5".into(),
            ));
        }

        let mut review = REVIEWS.get_required(&*self.store, review_id).await?;
        if review.value.user_id != caller {
            return Err(DomainError::Forbidden(
                "Only the author may edit a review".into(),
            ));
        }

        review.value.rating = rating;
        review.value.comment = comment;
        review.value.updated_at = Utc::now();

        let version = REVIEWS
            .put(
                &*self.store,
                review_id,
                &review.value,
                PutOptions::expect_version(review.version),
            )
            .await?;

        Ok(Versioned {
            id: review_id,
            version,
            value: review.value,
        })
    }

    /// Deletes a review. Allowed for the author or an admin.
    #[tracing::instrument(skip(self))]
    pub async fn delete_review(
        &self,
        review_id: DocumentId,
        caller: UserId,
        is_admin: bool,
    ) -> Result<()> {
        let review = REVIEWS.get_required(&*self.store, review_id).await?;
        if review.value.user_id != caller && !is_admin {
            return Err(DomainError::Forbidden(
                "Only the author or an admin may delete a review".into(),
            ));
        }

        REVIEWS.delete(&*self.store, review_id).await?;
        Ok(())
    }

    /// Increments a review's like counter.
    #[tracing::instrument(skip(self))]
    pub async fn like_review(&self, review_id: DocumentId) -> Result<Versioned<Review>> {
        let mut attempts = 0;
        loop {
            let mut review = REVIEWS.get_required(&*self.store, review_id).await?;
            review.value.likes += 1;
            review.value.updated_at = Utc::now();

            match REVIEWS
                .put(
                    &*self.store,
                    review_id,
                    &review.value,
                    PutOptions::expect_version(review.version),
                )
                .await
            {
                Ok(version) => {
                    return Ok(Versioned {
                        id: review_id,
                        version,
                        value: review.value,
                    });
                }
                Err(e) if e.is_conflict() && attempts < CAS_RETRIES => {
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
