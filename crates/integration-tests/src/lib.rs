//! Integration tests for Sacola.
//!
//! # Running Tests
//!
//! ```bash
//! export SACOLA_TEST_DATABASE_URL=postgres://localhost/sacola_test
//! cargo test -p sacola-integration-tests -- --ignored
//! ```
//!
//! Every test migrates the database, then works with freshly generated users
//! and catalog rows so runs never collide.

use secrecy::SecretString;
use sqlx::PgPool;

use sacola_core::{Email, Price, UserId};
use sacola_storefront::db::{CatalogRepository, PgStore, RepositoryError, catalog::VariantUpsert};
use sacola_storefront::models::{CurrentUser, ProductVariant, ShippingAddressInput};

/// A migrated pool wrapped in the production store.
pub struct TestContext {
    pub pool: PgPool,
    pub store: PgStore,
}

impl TestContext {
    /// Connect to `SACOLA_TEST_DATABASE_URL` and run migrations.
    ///
    /// # Panics
    ///
    /// Panics if the variable is unset or the database is unreachable.
    pub async fn new() -> Self {
        let url = std::env::var("SACOLA_TEST_DATABASE_URL")
            .expect("SACOLA_TEST_DATABASE_URL must be set for integration tests");
        let pool = sacola_storefront::db::create_pool(&SecretString::from(url))
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            store: PgStore::new(pool.clone()),
            pool,
        }
    }

    /// Insert a product with one variant priced at `cents`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if either insert fails.
    pub async fn seed_variant(&self, cents: i64) -> Result<ProductVariant, RepositoryError> {
        let repo = CatalogRepository::new(&self.pool);
        let tag = uuid::Uuid::new_v4();
        let product_id = repo
            .upsert_product("Camiseta Básica", &format!("camiseta-{tag}"), "")
            .await?;
        repo.upsert_variant(
            product_id,
            &VariantUpsert {
                name: "Azul",
                slug: &format!("camiseta-azul-{tag}"),
                color: "Azul",
                price: Price::from_cents(cents),
                image_url: "https://cdn.sacola.example/camiseta-azul.png",
            },
        )
        .await
    }
}

/// A signed-in user with a unique id.
///
/// # Panics
///
/// Never; generated emails are always valid.
#[must_use]
pub fn user() -> CurrentUser {
    let id = UserId::generate();
    CurrentUser {
        id,
        email: Email::parse(&format!("{id}@example.com")).expect("generated email is valid"),
    }
}

/// A valid address form.
#[must_use]
pub fn address_input() -> ShippingAddressInput {
    ShippingAddressInput {
        email: "ana@example.com.br".to_owned(),
        recipient_name: "Ana Souza".to_owned(),
        cpf_or_cnpj: "123.456.789-09".to_owned(),
        phone: "(81) 99999-0000".to_owned(),
        zip_code: "50000-000".to_owned(),
        street: "Rua da Aurora".to_owned(),
        number: "10".to_owned(),
        complement: Some("apto 2".to_owned()),
        neighborhood: "Boa Vista".to_owned(),
        city: "Recife".to_owned(),
        state: "PE".to_owned(),
        country: Some("Portugal".to_owned()),
    }
}
