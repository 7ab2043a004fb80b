//! Cart pricing and order drafting.
//!
//! Everything here is pure: the storefront loads cart lines and the selected
//! address inside a transaction, hands them to [`OrderDraft::build`], and
//! only writes if the draft is accepted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderStatus, PaymentMode, ProductId, ProfileId, ShippingAddress, UserId};

/// Smallest quantity a cart line can hold.
pub const MIN_QUANTITY: i32 = 1;

/// How an upsert treats a line that already exists.
///
/// A new line always starts at [`MIN_QUANTITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityPolicy {
    /// Add-to-cart: bump the existing quantity by one.
    Increment,
    /// Buy-now: the line ends up with exactly [`MIN_QUANTITY`] units.
    ResetToOne,
}

/// A +1/-1 adjustment of an existing cart line.
///
/// Decrementing never goes below [`MIN_QUANTITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAdjustment {
    Increment,
    Decrement,
}

/// A cart line joined with the product fields needed for pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub title: String,
    pub image: String,
    pub unit_price: Money,
    pub quantity: i32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Cart totals as shown on the cart, checkout and payment pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Sum of line totals.
    pub amount: Money,
    /// Flat fee, charged only when the cart has at least one line.
    pub shipping: Money,
    pub total: Money,
}

impl CartSummary {
    /// Price a set of cart lines.
    ///
    /// ```
    /// use selldesk_core::{CartSummary, Money};
    ///
    /// let empty = CartSummary::compute(&[], Money::rupees(40));
    /// assert!(empty.total.is_zero());
    /// ```
    #[must_use]
    pub fn compute(lines: &[CartLine], shipping_fee: Money) -> Self {
        let amount: Money = lines.iter().map(CartLine::line_total).sum();
        let shipping = if lines.is_empty() {
            Money::ZERO
        } else {
            shipping_fee
        };
        Self {
            amount,
            shipping,
            total: amount + shipping,
        }
    }
}

/// The delivery address a shopper picked on the confirm-address page.
///
/// Lives in the session between address confirmation and order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSelection {
    pub account: UserId,
    pub address: ProfileId,
    pub selected_at: DateTime<Utc>,
}

impl CheckoutSelection {
    #[must_use]
    pub const fn new(account: UserId, address: ProfileId, selected_at: DateTime<Utc>) -> Self {
        Self {
            account,
            address,
            selected_at,
        }
    }

    /// Whether the selection is older than `ttl` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.selected_at > ttl
    }

    /// The selection if it was made by `account` and has not expired.
    #[must_use]
    pub fn active_for(self, account: UserId, now: DateTime<Utc>, ttl: Duration) -> Option<Self> {
        (self.account == account && !self.is_expired(now, ttl)).then_some(self)
    }
}

/// A saved address together with the account that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAddress {
    pub id: ProfileId,
    pub owner: UserId,
    pub address: ShippingAddress,
}

/// Reasons an order cannot be placed or an address cannot be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("please select a delivery address")]
    NoAddressSelected,
    #[error("the selected address no longer exists")]
    AddressNotFound,
    #[error("that address belongs to another account")]
    Unauthorized,
    #[error("the selected address is incomplete")]
    IncompleteAddress,
}

/// Validate that `address` can be used by `account` for delivery.
///
/// # Errors
///
/// [`CheckoutError::AddressNotFound`], [`CheckoutError::Unauthorized`] or
/// [`CheckoutError::IncompleteAddress`], checked in that order.
pub fn check_address(
    account: UserId,
    address: Option<&OwnedAddress>,
) -> Result<&OwnedAddress, CheckoutError> {
    let address = address.ok_or(CheckoutError::AddressNotFound)?;
    if address.owner != account {
        return Err(CheckoutError::Unauthorized);
    }
    if !address.address.is_complete() {
        return Err(CheckoutError::IncompleteAddress);
    }
    Ok(address)
}

/// One line of an order about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineDraft {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Discounted price at the moment of purchase.
    pub unit_price: Money,
}

/// An order header and its lines, validated and priced, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub account: UserId,
    pub address_id: ProfileId,
    pub address_snapshot: String,
    pub amount: Money,
    pub paid: bool,
    pub status: OrderStatus,
    pub lines: Vec<OrderLineDraft>,
}

impl OrderDraft {
    /// Validate checkout inputs and price the order.
    ///
    /// `selection` must already be filtered for expiry. `address` is the
    /// saved address the selection points at, if it still exists.
    ///
    /// # Errors
    ///
    /// Checks run in a fixed order: [`CheckoutError::EmptyCart`], then
    /// [`CheckoutError::NoAddressSelected`], then the address checks of
    /// [`check_address`].
    pub fn build(
        account: UserId,
        lines: &[CartLine],
        selection: Option<&CheckoutSelection>,
        address: Option<&OwnedAddress>,
        shipping_fee: Money,
        payment: PaymentMode,
    ) -> Result<Self, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let selection = selection.ok_or(CheckoutError::NoAddressSelected)?;
        let address = address.filter(|a| a.id == selection.address);
        let address = check_address(account, address)?;

        let summary = CartSummary::compute(lines, shipping_fee);
        Ok(Self {
            account,
            address_id: address.id,
            address_snapshot: address.address.one_line(),
            amount: summary.total,
            paid: payment.marks_paid(),
            status: OrderStatus::Placed,
            lines: lines
                .iter()
                .map(|line| OrderLineDraft {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: i64, quantity: i32, price: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            title: format!("Product {product}"),
            image: String::new(),
            unit_price: Money::rupees(price),
            quantity,
        }
    }

    fn address(id: i64, owner: i64) -> OwnedAddress {
        OwnedAddress {
            id: ProfileId::new(id),
            owner: UserId::new(owner),
            address: ShippingAddress {
                name: "Asha".to_owned(),
                locality: "MG Road".to_owned(),
                city: "Pune".to_owned(),
                state: "Maharashtra".to_owned(),
                zipcode: Some(411_001),
            },
        }
    }

    fn selection(account: i64, address: i64) -> CheckoutSelection {
        CheckoutSelection::new(UserId::new(account), ProfileId::new(address), Utc::now())
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let summary = CartSummary::compute(&[], Money::rupees(40));
        assert_eq!(summary.amount, Money::ZERO);
        assert_eq!(summary.shipping, Money::ZERO);
        assert_eq!(summary.total, Money::ZERO);
    }

    #[test]
    fn test_shipping_added_once() {
        let lines = [line(1, 2, 50), line(2, 1, 30)];
        let summary = CartSummary::compute(&lines, Money::rupees(40));
        assert_eq!(summary.amount, Money::rupees(130));
        assert_eq!(summary.shipping, Money::rupees(40));
        assert_eq!(summary.total, Money::rupees(170));
    }

    #[test]
    fn test_order_draft_prices_and_snapshots() {
        let lines = [line(1, 2, 50), line(2, 1, 30)];
        let draft = OrderDraft::build(
            UserId::new(9),
            &lines,
            Some(&selection(9, 3)),
            Some(&address(3, 9)),
            Money::rupees(40),
            PaymentMode::Simulated,
        )
        .unwrap();

        assert_eq!(draft.amount, Money::rupees(170));
        assert_eq!(draft.amount.to_string(), "₹170.00");
        assert!(draft.paid);
        assert_eq!(draft.status, OrderStatus::Placed);
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[0].unit_price, Money::rupees(50));
        assert_eq!(draft.lines[1].unit_price, Money::rupees(30));
        assert_eq!(
            draft.address_snapshot,
            "Asha, MG Road, Pune, Maharashtra, 411001"
        );
    }

    #[test]
    fn test_empty_cart_checked_before_selection() {
        let err = OrderDraft::build(
            UserId::new(1),
            &[],
            None,
            None,
            Money::rupees(40),
            PaymentMode::Simulated,
        )
        .unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
    }

    #[test]
    fn test_missing_selection() {
        let err = OrderDraft::build(
            UserId::new(1),
            &[line(1, 1, 10)],
            None,
            Some(&address(3, 1)),
            Money::rupees(40),
            PaymentMode::Simulated,
        )
        .unwrap_err();
        assert_eq!(err, CheckoutError::NoAddressSelected);
    }

    #[test]
    fn test_deleted_address() {
        let err = OrderDraft::build(
            UserId::new(1),
            &[line(1, 1, 10)],
            Some(&selection(1, 3)),
            None,
            Money::rupees(40),
            PaymentMode::Simulated,
        )
        .unwrap_err();
        assert_eq!(err, CheckoutError::AddressNotFound);
    }

    #[test]
    fn test_foreign_address_is_unauthorized() {
        let err = OrderDraft::build(
            UserId::new(1),
            &[line(1, 1, 10)],
            Some(&selection(1, 3)),
            Some(&address(3, 2)),
            Money::rupees(40),
            PaymentMode::Simulated,
        )
        .unwrap_err();
        assert_eq!(err, CheckoutError::Unauthorized);
    }

    #[test]
    fn test_incomplete_address_is_rejected() {
        let mut incomplete = address(3, 1);
        incomplete.address.zipcode = None;
        assert_eq!(
            check_address(UserId::new(1), Some(&incomplete)),
            Err(CheckoutError::IncompleteAddress)
        );
    }

    #[test]
    fn test_selection_expiry() {
        let ttl = Duration::minutes(30);
        let now = Utc::now();
        let fresh = CheckoutSelection::new(UserId::new(1), ProfileId::new(1), now);
        let stale = CheckoutSelection::new(
            UserId::new(1),
            ProfileId::new(1),
            now - Duration::minutes(31),
        );

        assert!(fresh.active_for(UserId::new(1), now, ttl).is_some());
        assert!(stale.is_expired(now, ttl));
        assert!(stale.active_for(UserId::new(1), now, ttl).is_none());
        assert!(fresh.active_for(UserId::new(2), now, ttl).is_none());
    }
}
