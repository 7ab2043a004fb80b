//! Catalog product.

use selldesk_core::{CategoryCode, Money, ProductId};

/// A product as listed in the catalog.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub category: CategoryCode,
    /// Free-text grouping inside a category, e.g. "Cow Milk".
    pub subcategory: Option<String>,
    pub title: String,
    pub selling_price: Money,
    /// Price actually charged.
    pub discounted_price: Money,
    /// Image path relative to the media directory.
    pub image: String,
    pub description: String,
    pub composition: String,
    pub product_application: String,
}

impl Product {
    /// Whether the discounted price is below the selling price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.discounted_price < self.selling_price
    }
}
