//! Email service for order confirmations.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Without SMTP configuration, messages are rendered and logged instead.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use selldesk_core::{Money, OrderId};

use crate::config::EmailConfig;

/// Subject line of the order confirmation email.
pub const ORDER_CONFIRMED_SUBJECT: &str = "Order Confirmed - SellDesk";

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmed.html")]
struct OrderConfirmedHtml<'a> {
    username: &'a str,
    order_id: OrderId,
    total: Money,
    order_url: &'a str,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmed.txt")]
struct OrderConfirmedText<'a> {
    username: &'a str,
    order_id: OrderId,
    total: Money,
    order_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Log,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Mailer,
    from_address: String,
    base_url: String,
}

/// The facts an order confirmation needs.
#[derive(Debug, Clone, Copy)]
pub struct OrderConfirmation<'a> {
    pub to: &'a str,
    pub username: &'a str,
    pub order_id: OrderId,
    pub total: Money,
}

impl EmailService {
    /// Create an SMTP-backed email service.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Mailer::Smtp(mailer),
            from_address: config.from_address.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// An email service that logs messages instead of sending them.
    #[must_use]
    pub fn log_only(base_url: &str) -> Self {
        Self {
            mailer: Mailer::Log,
            from_address: "SellDesk <no-reply@localhost>".to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Send the confirmation for a placed order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        confirmation: OrderConfirmation<'_>,
    ) -> Result<(), EmailError> {
        let order_url = format!(
            "{}/order-success?order_id={}",
            self.base_url, confirmation.order_id
        );
        let html = OrderConfirmedHtml {
            username: confirmation.username,
            order_id: confirmation.order_id,
            total: confirmation.total,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderConfirmedText {
            username: confirmation.username,
            order_id: confirmation.order_id,
            total: confirmation.total,
            order_url: &order_url,
        }
        .render()?;

        self.send_multipart_email(confirmation.to, ORDER_CONFIRMED_SUBJECT, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        match &self.mailer {
            Mailer::Smtp(mailer) => {
                mailer.send(email).await?;
                tracing::info!(to = %to, subject = %subject, "Email sent successfully");
            }
            Mailer::Log => {
                tracing::info!(to = %to, subject = %subject, body = %text_body, "SMTP not configured, email logged");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn confirmation(to: &str) -> OrderConfirmation<'_> {
        OrderConfirmation {
            to,
            username: "asha",
            order_id: OrderId::new(42),
            total: Money::rupees(170),
        }
    }

    #[test]
    fn test_text_body_has_order_id_and_total() {
        let body = OrderConfirmedText {
            username: "asha",
            order_id: OrderId::new(42),
            total: Money::rupees(170),
            order_url: "http://localhost:3000/order-success?order_id=42",
        }
        .render()
        .unwrap();

        assert!(body.contains("#42"));
        assert!(body.contains("₹170.00"));
        assert!(body.contains("order_id=42"));
    }

    #[tokio::test]
    async fn test_log_only_sends_without_smtp() {
        let service = EmailService::log_only("http://localhost:3000/");
        service
            .send_order_confirmation(confirmation("asha@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected() {
        let service = EmailService::log_only("http://localhost:3000");
        let err = service
            .send_order_confirmation(confirmation("not an address"))
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }
}
