//! Product catalog queries.

use rust_decimal::Decimal;
use sqlx::PgPool;

use selldesk_core::{CategoryCode, Money, ProductId, SearchQuery};

use super::{RepositoryError, corrupt};
use crate::models::Product;

const PRODUCT_COLUMNS: &str = "id, category, subcategory, title, selling_price, discounted_price, \
                               image, description, composition, product_application";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    category: String,
    subcategory: Option<String>,
    title: String,
    selling_price: Decimal,
    discounted_price: Decimal,
    image: String,
    description: String,
    composition: String,
    product_application: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            category: row.category.parse().map_err(corrupt("category"))?,
            subcategory: row.subcategory.filter(|s| !s.is_empty()),
            title: row.title,
            selling_price: Money::new(row.selling_price).map_err(corrupt("selling price"))?,
            discounted_price: Money::new(row.discounted_price)
                .map_err(corrupt("discounted price"))?,
            image: row.image,
            description: row.description,
            composition: row.composition,
            product_application: row.product_application,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// A product to be inserted by the catalog importer.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category: CategoryCode,
    pub subcategory: Option<String>,
    pub title: String,
    pub selling_price: Money,
    pub discounted_price: Money,
    pub image: String,
    pub description: String,
    pub composition: String,
    pub product_application: String,
}

/// Repository for catalog reads (and imports).
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    /// Get the product with an exact title. The lowest ID wins when titles
    /// are duplicated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has that title.
    pub async fn get_by_title(&self, title: &str) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product
             WHERE title = $1
             ORDER BY id
             LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
        .and_then(Product::try_from)
    }

    /// List all products in a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category: CategoryCode,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product
             WHERE category = $1
             ORDER BY id"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }

    /// List products in a category with an exact subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category_subcategory(
        &self,
        category: CategoryCode,
        subcategory: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product
             WHERE category = $1 AND subcategory = $2
             ORDER BY id"
        ))
        .bind(category)
        .bind(subcategory)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }

    /// Distinct, non-empty subcategories of a category, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_subcategories(
        &self,
        category: CategoryCode,
    ) -> Result<Vec<String>, RepositoryError> {
        let subcategories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT subcategory FROM storefront.product
             WHERE category = $1 AND subcategory IS NOT NULL AND subcategory <> ''
             ORDER BY subcategory",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(subcategories)
    }

    /// Titles of every product in a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_titles(&self, category: CategoryCode) -> Result<Vec<String>, RepositoryError> {
        let titles = sqlx::query_scalar::<_, String>(
            "SELECT title FROM storefront.product WHERE category = $1 ORDER BY id",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(titles)
    }

    /// Case-insensitive substring search over titles and category names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, RepositoryError> {
        let categories: Vec<String> = query
            .categories()
            .into_iter()
            .map(|c| c.code().to_owned())
            .collect();

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product
             WHERE title ILIKE $1 ESCAPE '\\' OR category = ANY($2)
             ORDER BY id"
        ))
        .bind(query.like_pattern())
        .bind(categories)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO storefront.product
                 (category, subcategory, title, selling_price, discounted_price,
                  image, description, composition, product_application)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(product.category)
        .bind(product.subcategory.as_deref())
        .bind(&product.title)
        .bind(product.selling_price)
        .bind(product.discounted_price)
        .bind(&product.image)
        .bind(&product.description)
        .bind(&product.composition)
        .bind(&product.product_application)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}
