//! Order placement and the session-held checkout selection.
//!
//! Placement runs in one transaction: lock the cart, validate the draft,
//! write the order, empty the cart. Nothing is written unless the draft is
//! accepted. Clearing the selection and sending the confirmation happen
//! after commit and cannot undo the order.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;

use selldesk_core::{
    CheckoutError, CheckoutSelection, Money, OrderDraft, OrderId, PaymentMode, ProductId, ProfileId,
    UserId, check_address,
};

use crate::config::NotificationPolicy;
use crate::db::{self, ProfileRepository, RepositoryError, UserRepository};
use crate::models::{FlashMessage, session_keys};
use crate::services::email::{EmailError, EmailService, OrderConfirmation};

/// Errors from order placement and address selection.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Why an order confirmation could not be sent.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("account {0} no longer exists")]
    MissingAccount(UserId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Outcome of a committed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Money,
    pub lines: usize,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    shipping_fee: Money,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, shipping_fee: Money) -> Self {
        Self { pool, shipping_fee }
    }

    /// Check that `address` can be selected for delivery by `account`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AddressNotFound`, `Unauthorized` or
    /// `IncompleteAddress`.
    pub async fn select_address(
        &self,
        account: UserId,
        address: ProfileId,
    ) -> Result<CheckoutSelection, PlaceOrderError> {
        let profile = ProfileRepository::new(self.pool).get_by_id(address).await?;
        let owned = profile.map(|p| p.owned_address());
        check_address(account, owned.as_ref())?;

        Ok(CheckoutSelection::new(account, address, Utc::now()))
    }

    /// Turn the account's cart into an order.
    ///
    /// `selection` must already be filtered for owner and expiry.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `NoAddressSelected`,
    /// `AddressNotFound`, `Unauthorized` or `IncompleteAddress` without
    /// writing anything, or a repository error (rolled back).
    #[tracing::instrument(skip(self), fields(user_id = %account))]
    pub async fn place_order(
        &self,
        account: UserId,
        selection: Option<CheckoutSelection>,
    ) -> Result<PlacedOrder, PlaceOrderError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let lines = db::cart::lock_lines(&mut *tx, account).await?;

        let address = match (&selection, lines.is_empty()) {
            (Some(selection), false) => db::profiles::lock_by_id(&mut *tx, selection.address)
                .await?
                .map(|profile| profile.owned_address()),
            _ => None,
        };

        let draft = OrderDraft::build(
            account,
            &lines,
            selection.as_ref(),
            address.as_ref(),
            self.shipping_fee,
            PaymentMode::Simulated,
        )?;

        let order_id = db::orders::insert_draft(&mut *tx, &draft).await?;
        let ordered: Vec<ProductId> = draft.lines.iter().map(|line| line.product_id).collect();
        db::cart::remove_ordered(&mut *tx, account, &ordered).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(%order_id, total = %draft.amount, lines = draft.lines.len(), "Order placed");

        Ok(PlacedOrder {
            order_id,
            total: draft.amount,
            lines: draft.lines.len(),
        })
    }

    /// Email the confirmation for a placed order.
    ///
    /// Failures are logged and never propagate. Under
    /// [`NotificationPolicy::Warn`] the returned flash tells the shopper.
    pub async fn notify(
        &self,
        email: &EmailService,
        policy: NotificationPolicy,
        account: UserId,
        order: &PlacedOrder,
    ) -> Option<FlashMessage> {
        let Err(error) = self.send_confirmation(email, account, order).await else {
            return None;
        };

        tracing::warn!(
            order_id = %order.order_id,
            user_id = %account,
            error = %error,
            "Order confirmation email failed"
        );
        match policy {
            NotificationPolicy::Suppress => None,
            NotificationPolicy::Warn => Some(FlashMessage::warning(
                "Your order was placed, but we couldn't send the confirmation email.",
            )),
        }
    }

    async fn send_confirmation(
        &self,
        email: &EmailService,
        account: UserId,
        order: &PlacedOrder,
    ) -> Result<(), NotifyError> {
        let user = UserRepository::new(self.pool)
            .get_by_id(account)
            .await?
            .ok_or(NotifyError::MissingAccount(account))?;

        email
            .send_order_confirmation(OrderConfirmation {
                to: user.email.as_str(),
                username: &user.username,
                order_id: order.order_id,
                total: order.total,
            })
            .await?;
        Ok(())
    }
}

// =============================================================================
// Session-held selection
// =============================================================================

/// Store the chosen address in the session.
///
/// # Errors
///
/// Returns the session store error if the value cannot be written.
pub async fn store_selection(
    session: &Session,
    selection: CheckoutSelection,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CHECKOUT_SELECTION, selection)
        .await
}

/// The account's selection, if one is stored and still fresh.
///
/// Selections made by another account or older than `ttl` count as absent.
///
/// # Errors
///
/// Returns the session store error if the value cannot be read.
pub async fn load_selection(
    session: &Session,
    account: UserId,
    ttl: Duration,
) -> Result<Option<CheckoutSelection>, tower_sessions::session::Error> {
    let stored: Option<CheckoutSelection> =
        session.get(session_keys::CHECKOUT_SELECTION).await?;
    Ok(stored.and_then(|s| s.active_for(account, Utc::now(), ttl)))
}

/// Forget the selection after the order is placed.
///
/// # Errors
///
/// Returns the session store error if the value cannot be removed.
pub async fn clear_selection(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CheckoutSelection>(session_keys::CHECKOUT_SELECTION)
        .await
        .map(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_selection_round_trip() {
        let session = session();
        let account = UserId::new(7);
        let selection = CheckoutSelection::new(account, ProfileId::new(3), Utc::now());

        store_selection(&session, selection).await.unwrap();
        let loaded = load_selection(&session, account, Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(loaded, Some(selection));

        clear_selection(&session).await.unwrap();
        let loaded = load_selection(&session, account, Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_expired_selection_is_absent() {
        let session = session();
        let account = UserId::new(7);
        let stale = CheckoutSelection::new(
            account,
            ProfileId::new(3),
            Utc::now() - Duration::minutes(31),
        );

        store_selection(&session, stale).await.unwrap();
        let loaded = load_selection(&session, account, Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_selection_of_other_account_is_absent() {
        let session = session();
        let selection = CheckoutSelection::new(UserId::new(1), ProfileId::new(3), Utc::now());

        store_selection(&session, selection).await.unwrap();
        let loaded = load_selection(&session, UserId::new(2), Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }
}
