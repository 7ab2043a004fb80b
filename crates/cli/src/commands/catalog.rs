//! Catalog import command.
//!
//! # Usage
//!
//! ```bash
//! selldesk catalog import products.yaml
//! ```
//!
//! # File Format
//!
//! A YAML list of products:
//!
//! ```yaml
//! - category: ML
//!   subcategory: Curd
//!   title: Amul Masti Dahi
//!   selling_price: 60
//!   discounted_price: 50
//!   image: product/dahi.jpg
//!   description: Thick set curd.
//!   composition: Pasteurised toned milk, active cultures.
//!   product_application: Eat chilled or use in raita.
//! ```
//!
//! Every entry is validated before the database is touched. Image paths are
//! relative to the storefront media directory.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use selldesk_core::{CategoryCode, CategoryError, Money, MoneyError};
use selldesk_storefront::db::catalog::NewProduct;
use selldesk_storefront::db::{ProductRepository, RepositoryError};

use super::{ConnectError, connect};

/// Errors that can occur during a catalog import.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The file is not valid YAML for a product list.
    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One or more entries failed validation.
    #[error("{} invalid product(s):\n  {}", .0.len(), .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to insert {title:?}: {source}")]
    Insert {
        title: String,
        source: RepositoryError,
    },
}

/// Why a single catalog entry was rejected.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("title is required")]
    MissingTitle,

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error("selling_price: {0}")]
    SellingPrice(MoneyError),

    #[error("discounted_price: {0}")]
    DiscountedPrice(MoneyError),

    #[error("discounted_price {discounted} is above selling_price {selling}")]
    DiscountAboveSelling { discounted: Money, selling: Money },
}

/// One product as written in the import file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductEntry {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub title: String,
    pub selling_price: Decimal,
    pub discounted_price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub composition: String,
    #[serde(default)]
    pub product_application: String,
}

impl ProductEntry {
    fn validate(self) -> Result<NewProduct, EntryError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(EntryError::MissingTitle);
        }

        let category: CategoryCode = self.category.parse()?;
        let selling_price = Money::new(self.selling_price).map_err(EntryError::SellingPrice)?;
        let discounted_price =
            Money::new(self.discounted_price).map_err(EntryError::DiscountedPrice)?;
        if discounted_price > selling_price {
            return Err(EntryError::DiscountAboveSelling {
                discounted: discounted_price,
                selling: selling_price,
            });
        }

        Ok(NewProduct {
            category,
            subcategory: self
                .subcategory
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            title,
            selling_price,
            discounted_price,
            image: self.image.trim().to_owned(),
            description: self.description,
            composition: self.composition,
            product_application: self.product_application,
        })
    }
}

/// Parse and validate a catalog file's contents.
///
/// # Errors
///
/// Returns `CatalogError::Yaml` for malformed input and
/// `CatalogError::Invalid` listing every rejected entry.
pub fn parse(content: &str) -> Result<Vec<NewProduct>, CatalogError> {
    let entries: Vec<ProductEntry> = serde_yaml::from_str(content)?;

    let mut products = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let label = format!("#{} ({})", index + 1, entry.title.trim());
        match entry.validate() {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("{label}: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(CatalogError::Invalid(errors))
    }
}

/// Import products from a YAML file.
///
/// Returns the number of products inserted.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or an insert fails.
pub async fn import(path: &Path) -> Result<usize, CatalogError> {
    tracing::info!(path = %path.display(), "Loading catalog file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let products = parse(&content)?;
    tracing::info!(products = products.len(), "Catalog validated");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    for product in &products {
        let id = repo
            .insert(product)
            .await
            .map_err(|source| CatalogError::Insert {
                title: product.title.clone(),
                source,
            })?;
        tracing::info!(%id, title = %product.title, category = %product.category, "Product inserted");
    }

    Ok(products.len())
}
