//! Order management commands.
//!
//! # Usage
//!
//! ```bash
//! selldesk order status 42 shipped
//! ```

use selldesk_core::{OrderId, OrderStatus};
use selldesk_storefront::db::{OrderRepository, RepositoryError};

use super::{ConnectError, connect};

/// Errors that can occur while updating an order.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// No order with that ID.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// Change the status of an order.
///
/// Amounts and lines are never touched; only the status moves.
///
/// # Errors
///
/// Returns `OrderError::NotFound` if the order doesn't exist.
pub async fn set_status(id: OrderId, status: OrderStatus) -> Result<(), OrderError> {
    let pool = connect().await?;

    OrderRepository::new(&pool)
        .set_status(id, status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => OrderError::NotFound(id),
            other => OrderError::Repository(other),
        })?;

    tracing::info!(order_id = %id, %status, "Order status updated");
    Ok(())
}
