//! Per-user shopping cart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{DocumentId, UserId};
use doc_store::{DocumentStore, PutOptions, Version};

use crate::catalog::PRODUCTS;
use crate::collection::{Collection, Versioned};
use crate::error::{DomainError, Result};
use crate::inventory::CAS_RETRIES;
use crate::money::Money;

/// Cart documents, keyed by the owning user's id. One cart per user.
pub const CARTS: Collection<Cart> = Collection::new("carts");

/// A line in a cart.
///
/// Price, name and image are snapshots taken from the product at the
/// time the line was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: DocumentId,
    pub quantity: u32,
    pub price: Money,
    pub name: String,
    pub image: Option<String>,
}

impl CartItem {
    /// Returns the total price for this line (price * quantity).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A user's shopping cart.
///
/// The total is recomputed after every mutation, so it always equals
/// the sum of the line totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub total_amount: Money,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_amount: Money::zero(),
            updated_at: Utc::now(),
        }
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds a line to the cart.
    ///
    /// If a line for the same product already exists, its quantity is
    /// incremented instead of appending a duplicate line. The existing
    /// line keeps its original price snapshot.
    pub fn add_item(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            Some(existing) => existing.quantity += item.quantity,
            None => self.items.push(item),
        }
        self.recompute_total();
    }

    /// Sets the quantity of an existing line.
    ///
    /// Returns false if the product is not in the cart.
    pub fn update_quantity(&mut self, product_id: DocumentId, quantity: u32) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) else {
            return false;
        };
        item.quantity = quantity;
        self.recompute_total();
        true
    }

    /// Removes a line from the cart.
    ///
    /// Returns false if the product is not in the cart.
    pub fn remove_item(&mut self, product_id: DocumentId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return false;
        }
        self.recompute_total();
        true
    }

    /// Removes all lines.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        self.total_amount = self.items.iter().map(CartItem::line_total).sum();
        self.updated_at = Utc::now();
    }
}

/// Service for cart operations.
///
/// A missing cart document reads as an empty cart at the initial
/// version, so the first write creates it.
pub struct CartService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> CartService<S> {
    /// Creates a new cart service backed by the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Loads the user's cart, or an empty unsaved cart if none exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Versioned<Cart>> {
        let id = user_id.as_document_id();
        match CARTS.get(&*self.store, id).await? {
            Some(cart) => Ok(cart),
            None => Ok(Versioned {
                id,
                version: Version::initial(),
                value: Cart::empty(user_id),
            }),
        }
    }

    /// Adds a product to the user's cart, snapshotting its current
    /// price, name and first image.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: DocumentId,
        quantity: u32,
    ) -> Result<Versioned<Cart>> {
        if quantity < 1 {
            return Err(DomainError::Validation(
                "Quantity must be at least 1".into(),
            ));
        }

        let product = PRODUCTS.get_required(&*self.store, product_id).await?;
        let item = CartItem {
            product_id,
            quantity,
            price: product.value.price,
            name: product.value.name.clone(),
            image: product.value.images.first().cloned(),
        };

        self.mutate(user_id, move |cart| {
            cart.add_item(item.clone());
            Ok(())
        })
        .await
    }

    /// Sets the quantity of a line in the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        product_id: DocumentId,
        quantity: u32,
    ) -> Result<Versioned<Cart>> {
        if quantity < 1 {
            return Err(DomainError::Validation(
                "Quantity must be at least 1".into(),
            ));
        }

        self.mutate(user_id, move |cart| {
            if !cart.update_quantity(product_id, quantity) {
                return Err(DomainError::not_found("cart item", product_id));
            }
            Ok(())
        })
        .await
    }

    /// Removes a line from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: DocumentId,
    ) -> Result<Versioned<Cart>> {
        self.mutate(user_id, move |cart| {
            if !cart.remove_item(product_id) {
                return Err(DomainError::not_found("cart item", product_id));
            }
            Ok(())
        })
        .await
    }

    /// Removes every line from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Versioned<Cart>> {
        self.mutate(user_id, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    /// Applies a mutation through a compare-and-set retry loop.
    async fn mutate<F>(&self, user_id: UserId, apply: F) -> Result<Versioned<Cart>>
    where
        F: Fn(&mut Cart) -> Result<()>,
    {
        let id = user_id.as_document_id();
        let mut attempts = 0;
        loop {
            let mut current = self.get_or_create(user_id).await?;
            apply(&mut current.value)?;

            match CARTS
                .put(
                    &*self.store,
                    id,
                    &current.value,
                    PutOptions::expect_version(current.version),
                )
                .await
            {
                Ok(version) => {
                    return Ok(Versioned {
                        id,
                        version,
                        value: current.value,
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
