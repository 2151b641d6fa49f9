//! Checkout service orchestrating the cart -> order transaction.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use common::{DocumentId, UserId};
use doc_store::{DocumentStore, PutOptions};
use domain::{
    CARTS, CAS_RETRIES, INVENTORY, InventoryError, ORDERS, Order, OrderStatus, Versioned,
};

use crate::error::{CheckoutError, Result};
use crate::shipping::ShippingPolicy;

/// Fields accepted when placing an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: String,
    pub payment_method: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Orchestrates order placement, cancellation and status updates.
///
/// Placement touches three collections (carts, inventory, orders) and
/// has no database transaction to hide behind, so it drives each step
/// through version checks and undoes completed steps when a later one
/// fails. The invariant is that an order document only ever exists with
/// its stock already decremented.
pub struct CheckoutService<S, P> {
    store: Arc<S>,
    shipping: P,
}

impl<S: DocumentStore, P: ShippingPolicy> CheckoutService<S, P> {
    /// Creates a new checkout service with the given store and shipping policy.
    pub fn new(store: Arc<S>, shipping: P) -> Self {
        Self { store, shipping }
    }

    /// Places an order from the caller's cart.
    ///
    /// Steps: validate the cart and every line's stock, reserve the
    /// stock, persist the order, then clear the cart with the version
    /// read at the start. A cart that changed concurrently (for example
    /// a second checkout of the same cart) fails the final version
    /// check; the order is deleted and the stock restored, so at most
    /// one order can come out of one cart snapshot.
    #[tracing::instrument(skip(self, request))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: PlaceOrderRequest,
    ) -> Result<Versioned<Order>> {
        let started = std::time::Instant::now();
        let result = self.try_place_order(user_id, request).await;

        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(order_id = %order.id, total = %order.value.total_amount, "order placed");
            }
            Err(e) => {
                metrics::counter!("checkout_failures_total").increment(1);
                tracing::warn!(error = %e, "order placement failed");
            }
        }
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn try_place_order(
        &self,
        user_id: UserId,
        request: PlaceOrderRequest,
    ) -> Result<Versioned<Order>> {
        if request.shipping_address.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "Shipping address is required".into(),
            ));
        }
        if request.payment_method.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "Payment method is required".into(),
            ));
        }

        // 1. Load the cart, remembering its version for the final clear.
        let cart_id = user_id.as_document_id();
        let cart = CARTS
            .get(&*self.store, cart_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        if cart.value.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // 2. Check every line before touching anything. One failing
        //    line blocks the entire order.
        for item in &cart.value.items {
            let inventory = INVENTORY
                .get(&*self.store, item.product_id)
                .await?
                .ok_or(CheckoutError::ProductUnavailable(item.product_id))?;
            if !inventory.value.can_export(item.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: inventory.value.stock,
                });
            }
        }

        // 3. Quote the shipping fee.
        let shipping_fee = self
            .shipping
            .quote(&cart.value.items, &request.shipping_address);

        // 4. Reserve stock line by line. Each decrement re-reads and
        //    re-checks under a version check, so a concurrent checkout
        //    cannot oversell. Any failure restores what was reserved.
        let mut reserved: Vec<(DocumentId, u32)> = Vec::with_capacity(cart.value.items.len());
        for item in &cart.value.items {
            if let Err(e) = self.reserve_item(item.product_id, item.quantity).await {
                self.restore_stock(&reserved).await;
                return Err(e);
            }
            reserved.push((item.product_id, item.quantity));
        }

        // 5. Persist the order as pending.
        let order = Order::from_cart_items(
            user_id,
            &cart.value.items,
            request.shipping_address,
            shipping_fee,
            request.payment_method,
            request.note,
        );
        let order_id = DocumentId::new();
        let order_version = match ORDERS
            .put(&*self.store, order_id, &order, PutOptions::expect_new())
            .await
        {
            Ok(version) => version,
            Err(e) => {
                self.restore_stock(&reserved).await;
                return Err(e.into());
            }
        };

        // 6. Clear the cart against the version read in step 1. A
        //    conflict means the cart changed underneath us; undo
        //    everything rather than ship a stale snapshot.
        let mut cleared = cart.value.clone();
        cleared.clear();
        if let Err(e) = CARTS
            .put(
                &*self.store,
                cart_id,
                &cleared,
                PutOptions::expect_version(cart.version),
            )
            .await
        {
            if let Err(delete_err) = ORDERS.delete(&*self.store, order_id).await {
                tracing::error!(%order_id, error = %delete_err, "order rollback failed");
            }
            self.restore_stock(&reserved).await;
            return if e.is_conflict() {
                Err(CheckoutError::Conflict(
                    "Cart changed while placing the order".into(),
                ))
            } else {
                Err(e.into())
            };
        }

        Ok(Versioned {
            id: order_id,
            version: order_version,
            value: order,
        })
    }

    /// Decrements one product's stock through a version-checked retry loop.
    async fn reserve_item(&self, product_id: DocumentId, quantity: u32) -> Result<()> {
        let mut attempts = 0;
        loop {
            let mut inventory = INVENTORY
                .get(&*self.store, product_id)
                .await?
                .ok_or(CheckoutError::ProductUnavailable(product_id))?;

            inventory.value.export(quantity).map_err(|e| match e {
                InventoryError::InsufficientStock {
                    requested,
                    available,
                } => CheckoutError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                },
            })?;

            match INVENTORY
                .put(
                    &*self.store,
                    product_id,
                    &inventory.value,
                    PutOptions::expect_version(inventory.version),
                )
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() && attempts < CAS_RETRIES => {
                    attempts += 1;
                }
                Err(e) if e.is_conflict() => {
                    return Err(CheckoutError::Conflict(format!(
                        "Could not reserve stock for product {product_id}"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Re-imports previously reserved stock. Compensation must not fail
    /// the operation it is cleaning up after, so persistent errors are
    /// logged and skipped.
    async fn restore_stock(&self, reserved: &[(DocumentId, u32)]) {
        for &(product_id, quantity) in reserved {
            let mut attempts = 0;
            loop {
                let current = match INVENTORY.get(&*self.store, product_id).await {
                    Ok(Some(inventory)) => inventory,
                    Ok(None) => {
                        tracing::error!(%product_id, "inventory record vanished during rollback");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(%product_id, error = %e, "stock rollback failed");
                        break;
                    }
                };

                let mut restored = current.value;
                restored.import(quantity);

                match INVENTORY
                    .put(
                        &*self.store,
                        product_id,
                        &restored,
                        PutOptions::expect_version(current.version),
                    )
                    .await
                {
                    Ok(_) => break,
                    Err(e) if e.is_conflict() && attempts < CAS_RETRIES => {
                        attempts += 1;
                    }
                    Err(e) => {
                        tracing::error!(%product_id, error = %e, "stock rollback failed");
                        break;
                    }
                }
            }
        }
    }

    /// Cancels an order and restores its stock.
    ///
    /// Allowed for the order's owner or an admin, and only from pending
    /// or confirmed. The status flip is version-checked so a racing
    /// double cancel restores the stock exactly once.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: DocumentId,
        caller: UserId,
        is_admin: bool,
    ) -> Result<Versioned<Order>> {
        let mut order = ORDERS
            .get(&*self.store, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if order.value.user_id != caller && !is_admin {
            return Err(CheckoutError::Forbidden(
                "Only the order's owner or an admin may cancel it".into(),
            ));
        }
        if !order.value.status.can_cancel() {
            return Err(CheckoutError::InvalidState(format!(
                "Cannot cancel an order in status {}",
                order.value.status
            )));
        }

        order.value.set_status(OrderStatus::Cancelled);
        let version = ORDERS
            .put(
                &*self.store,
                order_id,
                &order.value,
                PutOptions::expect_version(order.version),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    CheckoutError::Conflict("Order changed while cancelling".into())
                } else {
                    e.into()
                }
            })?;

        let lines: Vec<(DocumentId, u32)> = order
            .value
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();
        self.restore_stock(&lines).await;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, "order cancelled");

        Ok(Versioned {
            id: order_id,
            version,
            value: order.value,
        })
    }

    /// Sets an order's lifecycle status (admin operation).
    ///
    /// Terminal orders cannot be moved, and cancellation must go
    /// through [`cancel_order`](Self::cancel_order) so stock is restored.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: DocumentId,
        status: OrderStatus,
    ) -> Result<Versioned<Order>> {
        if status == OrderStatus::Cancelled {
            return Err(CheckoutError::InvalidState(
                "Use the cancel operation to cancel an order".into(),
            ));
        }

        let mut order = ORDERS
            .get(&*self.store, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if order.value.status.is_terminal() {
            return Err(CheckoutError::InvalidState(format!(
                "Order in status {} cannot change status",
                order.value.status
            )));
        }

        order.value.set_status(status);
        let version = ORDERS
            .put(
                &*self.store,
                order_id,
                &order.value,
                PutOptions::expect_version(order.version),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    CheckoutError::Conflict("Order changed while updating status".into())
                } else {
                    e.into()
                }
            })?;

        Ok(Versioned {
            id: order_id,
            version,
            value: order.value,
        })
    }

    /// Loads an order, visible to its owner or an admin.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: DocumentId,
        caller: UserId,
        is_admin: bool,
    ) -> Result<Versioned<Order>> {
        let order = ORDERS
            .get(&*self.store, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if order.value.user_id != caller && !is_admin {
            return Err(CheckoutError::Forbidden(
                "Only the order's owner or an admin may view it".into(),
            ));
        }

        Ok(order)
    }

    /// Lists a user's orders, newest first, optionally filtered by status.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Versioned<Order>>> {
        let filter = match status {
            Some(status) => json!({"userId": user_id, "status": status}),
            None => json!({"userId": user_id}),
        };

        let mut orders = ORDERS.find(&*self.store, filter).await?;
        orders.sort_by(|a, b| b.value.created_at.cmp(&a.value.created_at));
        Ok(orders)
    }
}
