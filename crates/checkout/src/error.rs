//! Checkout error types.

use common::DocumentId;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The caller's cart is missing or has no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line references a product with no inventory record.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(DocumentId),

    /// A cart line asks for more stock than is available.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: DocumentId,
        requested: u32,
        available: u32,
    },

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(DocumentId),

    /// The caller is not allowed to perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The order is not in a state that permits this operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The request was malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A concurrent write raced this operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
