//! Shipping fee policies.

use domain::{CartItem, Money};

/// Quotes a shipping fee for a set of cart lines and a destination.
pub trait ShippingPolicy: Send + Sync {
    fn quote(&self, items: &[CartItem], address: &str) -> Money;
}

/// Charges the same fee for every order.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateShipping {
    fee: Money,
}

impl FlatRateShipping {
    /// Creates a flat-rate policy with the given fee.
    pub fn new(fee: Money) -> Self {
        Self { fee }
    }

    /// Ships for free.
    pub fn free() -> Self {
        Self { fee: Money::zero() }
    }
}

impl ShippingPolicy for FlatRateShipping {
    fn quote(&self, _items: &[CartItem], _address: &str) -> Money {
        self.fee
    }
}
