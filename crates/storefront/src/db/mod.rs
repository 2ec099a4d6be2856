//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `product`, `product_variant` - Catalog (seeded by `sacola-cli seed catalog`)
//! - `cart` - One in-progress cart per user
//! - `cart_item` - Cart lines, unique per (cart, variant)
//! - `shipping_address` - Immutable user addresses
//! - `customer_order`, `order_item` - Finished checkouts
//! - `tower_sessions.session` - Session storage shared with the auth provider
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sacola-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod shipping_addresses;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sacola_core::{AddressId, CartId, CartItemId, Quantity, UserId, VariantId};

pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use shipping_addresses::ShippingAddressRepository;

use crate::models::{
    Cart, CartItem, CartLine, NewOrder, NewShippingAddress, Order, ProductVariant,
    ShippingAddress,
};
use crate::store::CheckoutStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// [`CheckoutStore`] backed by `PostgreSQL`.
///
/// Each call borrows the pool into the matching repository.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        CatalogRepository::new(&self.pool).get_variant(id).await
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        CartRepository::new(&self.pool).find_by_user(user_id).await
    }

    async fn create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        CartRepository::new(&self.pool).create(user_id).await
    }

    async fn set_cart_shipping_address(
        &self,
        cart_id: CartId,
        address_id: AddressId,
    ) -> Result<Cart, RepositoryError> {
        CartRepository::new(&self.pool)
            .set_shipping_address(cart_id, address_id)
            .await
    }

    async fn find_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        CartRepository::new(&self.pool)
            .find_item(cart_id, variant_id)
            .await
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        CartRepository::new(&self.pool).get_item(id).await
    }

    async fn insert_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool)
            .insert_item(cart_id, variant_id, quantity)
            .await
    }

    async fn increment_cart_item(
        &self,
        id: CartItemId,
        by: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool).increment_item(id, by).await
    }

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool)
            .set_item_quantity(id, quantity)
            .await
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool).delete_item(id).await
    }

    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        CartRepository::new(&self.pool).list_lines(cart_id).await
    }

    async fn insert_shipping_address(
        &self,
        user_id: UserId,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress, RepositoryError> {
        ShippingAddressRepository::new(&self.pool)
            .create(user_id, address)
            .await
    }

    async fn get_shipping_address(
        &self,
        id: AddressId,
    ) -> Result<Option<ShippingAddress>, RepositoryError> {
        ShippingAddressRepository::new(&self.pool).get_by_id(id).await
    }

    async fn list_shipping_addresses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShippingAddress>, RepositoryError> {
        ShippingAddressRepository::new(&self.pool)
            .list_for_user(user_id)
            .await
    }

    async fn place_order(&self, order: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).place(order).await
    }
}
