//! Per-product stock ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::DocumentId;
use doc_store::{DocumentStore, PutOptions};

use crate::collection::{Collection, Versioned};
use crate::error::{DomainError, Result};

/// Inventory documents, keyed by the product's document id.
pub const INVENTORY: Collection<Inventory> = Collection::new("inventory");

/// How many times a read-check-write is retried after losing a version race.
pub const CAS_RETRIES: usize = 3;

/// Errors raised by inventory stock rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// Not enough stock to satisfy an export.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
}

/// Availability status of an inventory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InventoryStatus {
    #[default]
    Active,
    Inactive,
}

/// The stock level before and after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub previous: u32,
    pub current: u32,
}

/// The kind of stock mutation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockChangeType {
    /// Add to the current stock.
    Import,
    /// Remove from the current stock.
    Export,
    /// Set the stock to an absolute value.
    Adjust,
}

/// Stock ledger for a single product.
///
/// Stock can never go negative: `export` rejects a quantity larger than
/// the current stock instead of clamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub product_id: DocumentId,
    pub stock: u32,
    pub min_stock: u32,
    pub max_stock: Option<u32>,
    pub status: InventoryStatus,
    pub last_updated: DateTime<Utc>,
}

impl Inventory {
    /// Creates a new inventory record with the given starting stock.
    pub fn new(product_id: DocumentId, stock: u32, min_stock: u32, max_stock: Option<u32>) -> Self {
        Self {
            product_id,
            stock,
            min_stock,
            max_stock,
            status: InventoryStatus::Active,
            last_updated: Utc::now(),
        }
    }

    /// Returns true if an export of `quantity` would succeed.
    pub fn can_export(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Returns true if an import of `quantity` stays within the capacity,
    /// if one is set. Advisory only; `import` does not enforce it.
    pub fn can_import(&self, quantity: u32) -> bool {
        match self.max_stock {
            Some(cap) => self.stock.saturating_add(quantity) <= cap,
            None => true,
        }
    }

    /// Returns true if the stock has fallen to or below the minimum.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Adds `quantity` to the stock.
    pub fn import(&mut self, quantity: u32) -> StockChange {
        let previous = self.stock;
        self.stock += quantity;
        self.last_updated = Utc::now();
        StockChange {
            previous,
            current: self.stock,
        }
    }

    /// Removes `quantity` from the stock.
    ///
    /// Fails without mutating when the stock is insufficient.
    pub fn export(&mut self, quantity: u32) -> std::result::Result<StockChange, InventoryError> {
        if !self.can_export(quantity) {
            return Err(InventoryError::InsufficientStock {
                requested: quantity,
                available: self.stock,
            });
        }

        let previous = self.stock;
        self.stock -= quantity;
        self.last_updated = Utc::now();
        Ok(StockChange {
            previous,
            current: self.stock,
        })
    }

    /// Sets the stock to an absolute value.
    pub fn adjust(&mut self, quantity: u32) -> StockChange {
        let previous = self.stock;
        self.stock = quantity;
        self.last_updated = Utc::now();
        StockChange {
            previous,
            current: self.stock,
        }
    }
}

/// Service for managing inventory records.
///
/// All mutations go through a compare-and-set retry loop, so two
/// concurrent read-check-write sequences on the same product serialize
/// instead of overwriting each other.
pub struct InventoryService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> InventoryService<S> {
    /// Creates a new inventory service backed by the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an inventory record for a product.
    ///
    /// Fails with Conflict if a record for this product already exists.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        product_id: DocumentId,
        stock: u32,
        min_stock: u32,
        max_stock: Option<u32>,
    ) -> Result<Versioned<Inventory>> {
        let inventory = Inventory::new(product_id, stock, min_stock, max_stock);
        let version = INVENTORY
            .put(&*self.store, product_id, &inventory, PutOptions::expect_new())
            .await?;

        Ok(Versioned {
            id: product_id,
            version,
            value: inventory,
        })
    }

    /// Loads the inventory record for a product.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, product_id: DocumentId) -> Result<Versioned<Inventory>> {
        INVENTORY.get_required(&*self.store, product_id).await
    }

    /// Applies a stock mutation, retrying on version conflicts.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock(
        &self,
        product_id: DocumentId,
        change: StockChangeType,
        quantity: u32,
    ) -> Result<Versioned<Inventory>> {
        let mut attempts = 0;
        loop {
            let mut current = INVENTORY.get_required(&*self.store, product_id).await?;

            match change {
                StockChangeType::Import => {
                    current.value.import(quantity);
                }
                StockChangeType::Export => {
                    current
                        .value
                        .export(quantity)
                        .map_err(|e| DomainError::Validation(e.to_string()))?;
                }
                StockChangeType::Adjust => {
                    current.value.adjust(quantity);
                }
            }

            match INVENTORY
                .put(
                    &*self.store,
                    product_id,
                    &current.value,
                    PutOptions::expect_version(current.version),
                )
                .await
            {
                Ok(version) => {
                    return Ok(Versioned {
                        id: product_id,
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
