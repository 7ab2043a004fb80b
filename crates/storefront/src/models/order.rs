//! Placed orders.

use chrono::{DateTime, Utc};

use selldesk_core::{Money, OrderId, OrderStatus, ProductId};

/// An order header with its lines.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    /// Total charged, shipping included. Fixed at placement.
    pub amount: Money,
    pub paid: bool,
    pub status: OrderStatus,
    /// Delivery address as it was when the order was placed.
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

/// One product in an order.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: i32,
    /// Price at the time of purchase.
    pub unit_price: Money,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}
