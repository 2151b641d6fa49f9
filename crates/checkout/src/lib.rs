//! Order orchestration: placing an order spans the cart, the inventory
//! ledger and the orders collection, with compensating rollback when a
//! later step fails.

pub mod error;
pub mod service;
pub mod shipping;

pub use error::{CheckoutError, Result};
pub use service::{CheckoutService, PlaceOrderRequest};
pub use shipping::{FlatRateShipping, ShippingPolicy};
