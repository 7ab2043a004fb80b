//! Static page handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::{Flashes, RequireAuth};
use crate::routes::Layout;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
}

/// Display the home page.
pub async fn home(RequireAuth(user): RequireAuth, flashes: Flashes) -> impl IntoResponse {
    HomeTemplate {
        layout: Layout::new(&user, flashes),
    }
}

/// Display the about page.
pub async fn about(RequireAuth(user): RequireAuth, flashes: Flashes) -> impl IntoResponse {
    AboutTemplate {
        layout: Layout::new(&user, flashes),
    }
}

/// Display the contact page.
pub async fn contact(RequireAuth(user): RequireAuth, flashes: Flashes) -> impl IntoResponse {
    ContactTemplate {
        layout: Layout::new(&user, flashes),
    }
}
