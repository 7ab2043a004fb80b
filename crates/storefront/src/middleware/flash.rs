//! Flash messages: one-shot notices that survive exactly one redirect.
//!
//! Handlers attach a [`Flash`] to their response; [`flash_middleware`] moves
//! it into the session, and the next page that extracts [`Flashes`] takes it
//! back out.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponseParts, Response, ResponseParts},
};
use tower_sessions::Session;

use crate::models::{FlashMessage, session_keys};

/// Flashes produced while handling the current request.
#[derive(Clone, Default)]
struct PendingFlashes(Vec<FlashMessage>);

/// Response part that queues a flash message for the next page.
///
/// ```rust,ignore
/// (Flash(FlashMessage::success("Address saved")), Redirect::to("/profile"))
/// ```
#[derive(Debug, Clone)]
pub struct Flash(pub FlashMessage);

impl IntoResponseParts for Flash {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let extensions = res.extensions_mut();
        if let Some(pending) = extensions.get_mut::<PendingFlashes>() {
            pending.0.push(self.0);
        } else {
            extensions.insert(PendingFlashes(vec![self.0]));
        }
        Ok(res)
    }
}

/// Move flashes attached to the response into the session.
///
/// Must run inside the session layer.
pub async fn flash_middleware(session: Session, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if let Some(PendingFlashes(new)) = response.extensions_mut().remove::<PendingFlashes>() {
        let mut queued: Vec<FlashMessage> = session
            .get(session_keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        queued.extend(new);

        if let Err(e) = session.insert(session_keys::FLASH, queued).await {
            tracing::warn!(error = %e, "Failed to store flash messages");
        }
    }

    response
}

/// Extractor that takes pending flash messages out of the session.
#[derive(Debug, Default)]
pub struct Flashes(pub Vec<FlashMessage>);

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let messages = session
            .remove::<Vec<FlashMessage>>(session_keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        Ok(Self(messages))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        middleware,
        response::{IntoResponse, Redirect},
        routing::get,
    };
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn app() -> Router {
        Router::new()
            .route(
                "/save",
                get(|| async {
                    (
                        Flash(FlashMessage::success("Saved")),
                        Flash(FlashMessage::warning("Check your email")),
                        Redirect::to("/show"),
                    )
                        .into_response()
                }),
            )
            .route(
                "/show",
                get(|Flashes(messages): Flashes| async move {
                    messages
                        .iter()
                        .map(|m| m.text.as_str())
                        .collect::<Vec<_>>()
                        .join("|")
                }),
            )
            .layer(middleware::from_fn(flash_middleware))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
    }

    async fn get_page(app: &Router, path: &str, cookie: Option<&str>) -> (StatusCode, Option<String>, String) {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_owned);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, cookie, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_flash_survives_exactly_one_redirect() {
        let app = app();

        let (status, cookie, _) = get_page(&app, "/save", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let cookie = cookie.unwrap();

        let (_, _, first) = get_page(&app, "/show", Some(&cookie)).await;
        assert_eq!(first, "Saved|Check your email");

        let (_, _, second) = get_page(&app, "/show", Some(&cookie)).await;
        assert_eq!(second, "");
    }

    #[tokio::test]
    async fn test_no_session_write_without_flash() {
        let app = app();
        let (status, cookie, body) = get_page(&app, "/show", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookie.is_none());
        assert_eq!(body, "");
    }
}
