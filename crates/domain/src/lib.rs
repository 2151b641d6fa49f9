//! Storefront domain: entities, typed collections and single-entity
//! services over the document store.
//!
//! Multi-entity orchestration (order placement and cancellation) lives
//! in the checkout crate; everything here touches one document at a
//! time, using version checks to serialize read-check-write sequences.

pub mod cart;
pub mod catalog;
pub mod collection;
pub mod error;
pub mod inventory;
pub mod money;
pub mod order;
pub mod review;
pub mod user;

pub use cart::{CARTS, Cart, CartItem, CartService};
pub use catalog::{
    BRANDS, Brand, CATEGORIES, CatalogService, Category, PRODUCTS, Product, ProductDraft,
    ProductStatus,
};
pub use collection::{Collection, Versioned};
pub use common::{DocumentId, UserId};
pub use error::{DomainError, Result};
pub use inventory::{
    CAS_RETRIES, INVENTORY, Inventory, InventoryError, InventoryService, InventoryStatus,
    StockChange, StockChangeType,
};
pub use money::Money;
pub use order::{ORDERS, Order, OrderItem, OrderStatus, PaymentStatus};
pub use review::{REVIEWS, Review, ReviewDraft, ReviewService, ReviewStatus};
pub use user::{Role, USERS, User, UserStatus};
