//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// URL of a catalog image stored under the media directory.
///
/// Usage in templates: `{{ product.image|media_url }}`
#[askama::filter_fn]
pub fn media_url(path: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let path = path.to_string();
    if path.is_empty() {
        return Ok("/static/img/placeholder.svg".to_owned());
    }
    if path.starts_with('/') || path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path);
    }
    Ok(format!("/media/{path}"))
}
