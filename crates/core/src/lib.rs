//! SellDesk Core - Shared types and checkout logic.
//!
//! This crate provides the domain model used by the SellDesk components:
//! - `storefront` - Shopper-facing web store
//! - `cli` - Command-line tools for migrations, catalog import and order status
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Database encoding for the newtypes is behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - IDs, money, email, category codes, order status, addresses
//! - [`checkout`] - Cart pricing, checkout selection, order drafting
//! - [`search`] - Search query normalization

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod search;
pub mod types;

pub use checkout::{
    CartLine, CartSummary, CheckoutError, CheckoutSelection, LineAdjustment, MIN_QUANTITY,
    OrderDraft, OrderLineDraft, OwnedAddress, QuantityPolicy, check_address,
};
pub use search::SearchQuery;
pub use types::*;
