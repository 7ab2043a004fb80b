//! Catalog route handlers: categories, product detail and search.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use selldesk_core::{CategoryCode, ProductId, SearchQuery};

use crate::db::{ProductRepository, RepositoryError, WishlistRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Flashes, RequireAuth};
use crate::models::Product;
use crate::routes::Layout;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Category listing template, shared by the category and subcategory pages.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/category.html")]
pub struct CategoryTemplate {
    pub layout: Layout,
    pub category: CategoryCode,
    pub subcategories: Vec<String>,
    pub active_subcategory: Option<String>,
    pub products: Vec<Product>,
}

/// Titles in the category of a named product.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/category_title.html")]
pub struct CategoryTitleTemplate {
    pub layout: Layout,
    pub product: Product,
    pub titles: Vec<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/product.html")]
pub struct ProductTemplate {
    pub layout: Layout,
    pub product: Product,
    pub in_wishlist: bool,
}

/// Search results template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/search.html")]
pub struct SearchTemplate {
    pub layout: Layout,
    pub query: String,
    pub products: Vec<Product>,
}

fn parse_category(code: &str) -> Result<CategoryCode> {
    code.parse()
        .map_err(|_| AppError::NotFound(format!("category {code}")))
}

/// Products in a category, with the subcategory sidebar.
#[tracing::instrument(skip(state, user, flashes))]
pub async fn category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
    Path(code): Path<String>,
) -> Result<impl IntoResponse> {
    let category = parse_category(&code)?;
    let repo = ProductRepository::new(state.pool());

    let products = repo.list_by_category(category).await?;
    let subcategories = repo.list_subcategories(category).await?;

    Ok(CategoryTemplate {
        layout: Layout::new(&user, flashes),
        category,
        subcategories,
        active_subcategory: None,
        products,
    })
}

/// Products in one subcategory of a category.
#[tracing::instrument(skip(state, user, flashes))]
pub async fn category_subcategory(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
    Path((code, subcategory)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let category = parse_category(&code)?;
    let repo = ProductRepository::new(state.pool());

    let products = repo
        .list_by_category_subcategory(category, &subcategory)
        .await?;
    let subcategories = repo.list_subcategories(category).await?;

    Ok(CategoryTemplate {
        layout: Layout::new(&user, flashes),
        category,
        subcategories,
        active_subcategory: Some(subcategory),
        products,
    })
}

/// Titles of every product sharing a category with the product named `title`.
#[tracing::instrument(skip(state, user, flashes))]
pub async fn category_title(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
    Path(title): Path<String>,
) -> Result<impl IntoResponse> {
    let repo = ProductRepository::new(state.pool());
    let product = repo.get_by_title(&title).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("product titled {title:?}")),
        other => other.into(),
    })?;
    let titles = repo.list_titles(product.category).await?;

    Ok(CategoryTitleTemplate {
        layout: Layout::new(&user, flashes),
        product,
        titles,
    })
}

/// Product detail page.
#[tracing::instrument(skip(state, user, flashes))]
pub async fn product_detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("product {id}")))?;

    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let in_wishlist = WishlistRepository::new(state.pool())
        .contains(user.id, id)
        .await?;

    Ok(ProductTemplate {
        layout: Layout::new(&user, flashes),
        product,
        in_wishlist,
    })
}

/// Search by title, category code or category label.
///
/// A blank query shows no results without touching the database.
#[tracing::instrument(skip(state, user, flashes))]
pub async fn search(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse> {
    let raw = params.q.unwrap_or_default();

    let products = match SearchQuery::parse(&raw) {
        Some(query) => ProductRepository::new(state.pool()).search(&query).await?,
        None => Vec::new(),
    };

    Ok(SearchTemplate {
        layout: Layout::new(&user, flashes),
        query: raw.trim().to_owned(),
        products,
    })
}
