//! Orders: immutable snapshots of a cart at checkout time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{DocumentId, UserId};

use crate::cart::CartItem;
use crate::collection::Collection;
use crate::money::Money;

pub const ORDERS: Collection<Order> = Collection::new("orders");

/// Lifecycle status of an order.
///
/// The normal flow is pending -> confirmed -> shipping -> delivered.
/// Cancellation is only reachable from pending or confirmed. Delivered
/// and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns true if an order in this status may still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipping" => Ok(Self::Shipping),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown order status: {other}")),
        }
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

/// A line in an order. Values are copied from the cart, so later
/// catalog edits never alter persisted orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: DocumentId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub image: Option<String>,
    pub subtotal: Money,
}

impl OrderItem {
    /// Creates an order line from a cart line, computing the subtotal.
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
            image: item.image.clone(),
            subtotal: item.line_total(),
        }
    }
}

/// An order placed by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub shipping_fee: Money,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub note: Option<String>,
    pub tracking_number: Option<String>,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order from a cart's lines.
    ///
    /// The total is the sum of the line subtotals plus the shipping fee.
    pub fn from_cart_items(
        user_id: UserId,
        items: &[CartItem],
        shipping_address: String,
        shipping_fee: Money,
        payment_method: String,
        note: Option<String>,
    ) -> Self {
        let items: Vec<OrderItem> = items.iter().map(OrderItem::from_cart_item).collect();
        let total_amount = items.iter().map(|i| i.subtotal).sum::<Money>() + shipping_fee;
        let now = Utc::now();

        Self {
            user_id,
            items,
            status: OrderStatus::Pending,
            shipping_address,
            shipping_fee,
            payment_method,
            payment_status: PaymentStatus::Pending,
            note,
            tracking_number: None,
            total_amount,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the order status.
    ///
    /// Membership in the status set is enforced by the type; sequencing
    /// rules (who may move where) are the caller's responsibility.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Returns true if the order contains a line for the given product.
    pub fn contains_product(&self, product_id: DocumentId) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }
}
