//! Core types for SellDesk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod category;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use address::{AddressError, STATES, ShippingAddress};
pub use category::{CategoryCode, CategoryError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use status::{OrderStatus, PaymentMode};
