//! Catalog types read by the cart.
//!
//! Products and variants are managed elsewhere (seeded by `sacola-cli`); the
//! cart only checks that a variant exists and reads its price.

use serde::Serialize;

use sacola_core::{Price, ProductId, VariantId};

/// A purchasable configuration of a product (e.g. size or color).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub price: Price,
    pub image_url: String,
}
