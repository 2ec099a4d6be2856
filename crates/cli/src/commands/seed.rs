//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Camiseta Básica
//!     slug: camiseta-basica
//!     description: Malha 100% algodão
//!     variants:
//!       - name: Azul
//!         slug: camiseta-basica-azul
//!         color: Azul
//!         price_in_cents: 7990
//!         image_url: https://cdn.example.com/camiseta-azul.png
//! ```
//!
//! Products and variants are upserted by slug, so re-running a file updates
//! names and prices in place.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use sacola_core::Price;
use sacola_storefront::db::CatalogRepository;
use sacola_storefront::db::catalog::VariantUpsert;

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub variants: Vec<VariantEntry>,
}

#[derive(Debug, Deserialize)]
pub struct VariantEntry {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub price_in_cents: i64,
    pub image_url: String,
}

/// Problems found in a catalog file before touching the database.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("product #{0} has an empty name or slug")]
    EmptyProduct(usize),

    #[error("product {0} has no variants")]
    NoVariants(String),

    #[error("variant {0} has an empty name or slug")]
    EmptyVariant(String),

    #[error("variant {0} has a negative price")]
    NegativePrice(String),

    #[error("slug {0} appears more than once")]
    DuplicateSlug(String),
}

/// Collect every problem in `file`.
#[must_use]
pub fn validate(file: &CatalogFile) -> Vec<CatalogError> {
    let mut errors = Vec::new();
    let mut product_slugs = HashSet::new();
    let mut variant_slugs = HashSet::new();

    for (index, product) in file.products.iter().enumerate() {
        if product.name.trim().is_empty() || product.slug.trim().is_empty() {
            errors.push(CatalogError::EmptyProduct(index));
        }
        if !product_slugs.insert(product.slug.as_str()) {
            errors.push(CatalogError::DuplicateSlug(product.slug.clone()));
        }
        if product.variants.is_empty() {
            errors.push(CatalogError::NoVariants(product.slug.clone()));
        }

        for variant in &product.variants {
            if variant.name.trim().is_empty() || variant.slug.trim().is_empty() {
                errors.push(CatalogError::EmptyVariant(product.slug.clone()));
            }
            if variant.price_in_cents < 0 {
                errors.push(CatalogError::NegativePrice(variant.slug.clone()));
            }
            if !variant_slugs.insert(variant.slug.as_str()) {
                errors.push(CatalogError::DuplicateSlug(variant.slug.clone()));
            }
        }
    }

    errors
}

/// Upsert every product and variant in the YAML file at `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let repo = CatalogRepository::new(&pool);
    let mut variants = 0_usize;

    for product in &file.products {
        let product_id = repo
            .upsert_product(&product.name, &product.slug, &product.description)
            .await?;

        for variant in &product.variants {
            let saved = repo
                .upsert_variant(
                    product_id,
                    &VariantUpsert {
                        name: &variant.name,
                        slug: &variant.slug,
                        color: &variant.color,
                        price: Price::from_cents(variant.price_in_cents),
                        image_url: &variant.image_url,
                    },
                )
                .await?;
            info!(variant_id = %saved.id, slug = %saved.slug, price = %saved.price, "Upserted variant");
            variants += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Products: {}", file.products.len());
    info!("  Variants: {variants}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
products:
  - name: Camiseta Básica
    slug: camiseta-basica
    variants:
      - name: Azul
        slug: camiseta-basica-azul
        color: Azul
        price_in_cents: 7990
        image_url: https://cdn.example.com/azul.png
      - name: Preta
        slug: camiseta-basica-preta
        color: Preta
        price_in_cents: 7990
        image_url: https://cdn.example.com/preta.png
";

    #[test]
    fn test_sample_is_valid() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(file.products[0].variants.len(), 2);
        assert!(file.products[0].description.is_empty());
        assert!(validate(&file).is_empty());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        file.products[0].variants[1].slug = "camiseta-basica-azul".to_owned();
        file.products[0].variants[0].price_in_cents = -1;

        let errors = validate(&file);
        assert_eq!(
            errors,
            vec![
                CatalogError::NegativePrice("camiseta-basica-azul".to_owned()),
                CatalogError::DuplicateSlug("camiseta-basica-azul".to_owned()),
            ]
        );
    }

    #[test]
    fn test_product_without_variants() {
        let file: CatalogFile =
            serde_yaml::from_str("products:\n  - name: Boné\n    slug: bone\n    variants: []\n")
                .unwrap();
        assert_eq!(validate(&file), vec![CatalogError::NoVariants("bone".to_owned())]);
    }
}
