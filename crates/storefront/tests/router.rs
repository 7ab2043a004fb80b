//! Router-level tests: the full middleware stack with an in-memory session
//! store and a database pool that is never connected.

#![allow(clippy::unwrap_used)]

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use selldesk_storefront::middleware::request_id::REQUEST_ID_HEADER;
use selldesk_storefront::middleware::session::SESSION_COOKIE_NAME;
use selldesk_storefront::state::AppState;

fn app() -> Router {
    let state = AppState::new(common::test_config(), common::lazy_pool()).unwrap();
    selldesk_storefront::app(state, MemoryStore::default())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.10")
        .body(Body::empty())
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE_NAME))
        .unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let response = app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

// =============================================================================
// Authentication gate
// =============================================================================

#[tokio::test]
async fn test_pages_redirect_anonymous_shoppers_to_login() {
    for path in ["/", "/home", "/cart", "/checkout", "/profile", "/search?q=milk"] {
        let response = app().oneshot(get(path)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/login", "{path}");
    }
}

#[tokio::test]
async fn test_cart_json_endpoints_answer_401() {
    for path in ["/plus-cart?prod_id=1", "/minus-cart?prod_id=1"] {
        let response = app().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn test_login_page_renders() {
    let response = app().oneshot(get("/login")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"action="/login""#));
    assert!(html.contains("SellDesk"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app().oneshot(get("/no-such-page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let response = app().oneshot(get("/login")).await.unwrap();
    let headers = response.headers();

    assert!(
        headers
            .get(header::CONTENT_SECURITY_POLICY)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("default-src 'none'")
    );
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert!(headers.get(REQUEST_ID_HEADER).is_some());
}

#[tokio::test]
async fn test_registration_error_is_flashed_once() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("x-forwarded-for", "198.51.100.11")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "username=asha&email=asha%40example.com\
                     &password=correct-horse&password_confirm=battery-staple",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
    let cookie = session_cookie(&response);

    let page = |cookie: String| {
        Request::builder()
            .uri("/register")
            .header("x-forwarded-for", "198.51.100.11")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let html = body_text(app.clone().oneshot(page(cookie.clone())).await.unwrap()).await;
    assert!(html.contains("The two password fields didn"));

    let html = body_text(app.oneshot(page(cookie)).await.unwrap()).await;
    assert!(!html.contains("The two password fields didn"));
}
