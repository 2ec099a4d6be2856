//! Catalog repository.
//!
//! The cart only reads variants. Writes exist for `sacola-cli seed catalog`.

use sqlx::PgPool;
use uuid::Uuid;

use sacola_core::{Price, ProductId, VariantId};

use super::RepositoryError;
use crate::models::ProductVariant;

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    slug: String,
    color: String,
    price_in_cents: i64,
    image_url: String,
}

impl TryFrom<VariantRow> for ProductVariant {
    type Error = RepositoryError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        if row.price_in_cents < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "negative price for variant {}",
                row.id
            )));
        }

        Ok(Self {
            id: VariantId::new(row.id),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            slug: row.slug,
            color: row.color,
            price: Price::from_cents(row.price_in_cents),
            image_url: row.image_url,
        })
    }
}

/// Variant fields accepted by [`CatalogRepository::upsert_variant`].
#[derive(Debug, Clone)]
pub struct VariantUpsert<'v> {
    pub name: &'v str,
    pub slug: &'v str,
    pub color: &'v str,
    pub price: Price,
    pub image_url: &'v str,
}

/// Repository for catalog reads and seeding.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a variant by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored price is negative.
    pub async fn get_variant(
        &self,
        id: VariantId,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, name, slug, color, price_in_cents, image_url
            FROM storefront.product_variant
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a product, or update the one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(
        &self,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<ProductId, RepositoryError> {
        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO storefront.product (name, slug, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE
                SET name = EXCLUDED.name, description = EXCLUDED.description
            RETURNING id
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool)
        .await?;

        Ok(ProductId::new(id))
    }

    /// Insert a variant of `product_id`, or update the one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug belongs to another product.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_variant(
        &self,
        product_id: ProductId,
        variant: &VariantUpsert<'_>,
    ) -> Result<ProductVariant, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r"
            INSERT INTO storefront.product_variant
                (product_id, name, slug, color, price_in_cents, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slug) DO UPDATE
                SET name = EXCLUDED.name,
                    color = EXCLUDED.color,
                    price_in_cents = EXCLUDED.price_in_cents,
                    image_url = EXCLUDED.image_url
                WHERE storefront.product_variant.product_id = EXCLUDED.product_id
            RETURNING id, product_id, name, slug, color, price_in_cents, image_url
            ",
        )
        .bind(product_id)
        .bind(variant.name)
        .bind(variant.slug)
        .bind(variant.color)
        .bind(variant.price.cents())
        .bind(variant.image_url)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "variant slug {} belongs to another product",
                variant.slug
            ))
        })?
        .try_into()
    }
}
