//! Cart repository.
//!
//! `cart.user_id` and `cart_item (cart_id, product_variant_id)` are unique, so
//! concurrent writers converge on a single cart and a single line per variant.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use sacola_core::{AddressId, CartId, CartItemId, Price, Quantity, UserId, VariantId};

use super::RepositoryError;
use crate::models::{Cart, CartItem, CartLine};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    shipping_address_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            shipping_address_id: row.shipping_address_id.map(AddressId::new),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_variant_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity on cart item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_variant_id: VariantId::new(row.product_variant_id),
            quantity,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    cart_id: Uuid,
    product_variant_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
    product_name: String,
    variant_name: String,
    image_url: String,
    price_in_cents: i64,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let item = CartItemRow {
            id: row.id,
            cart_id: row.cart_id,
            product_variant_id: row.product_variant_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
        .try_into()?;

        Ok(Self {
            item,
            product_name: row.product_name,
            variant_name: row.variant_name,
            image_url: row.image_url,
            unit_price: Price::from_cents(row.price_in_cents),
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for carts and their items.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the cart owned by `user_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, shipping_address_id, created_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create the cart for `user_id`.
    ///
    /// If a concurrent request already created it, the existing cart is
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, shipping_address_id, created_at
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Point the cart at a shipping address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_shipping_address(
        &self,
        cart_id: CartId,
        address_id: AddressId,
    ) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            UPDATE storefront.cart
            SET shipping_address_id = $2
            WHERE id = $1
            RETURNING id, user_id, shipping_address_id, created_at
            ",
        )
        .bind(cart_id)
        .bind(address_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Get the line for `variant_id` in `cart_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored quantity is invalid.
    pub async fn find_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_variant_id, quantity, created_at
            FROM storefront.cart_item
            WHERE cart_id = $1 AND product_variant_id = $2
            ",
        )
        .bind(cart_id)
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a cart item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored quantity is invalid.
    pub async fn get_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_variant_id, quantity, created_at
            FROM storefront.cart_item
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Add a line for `variant_id`.
    ///
    /// When a line for the variant already exists (a concurrent insert won),
    /// `quantity` is added to it instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_variant_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_variant_id) DO UPDATE
                SET quantity = LEAST(
                    storefront.cart_item.quantity::BIGINT + EXCLUDED.quantity,
                    2147483647
                )::INTEGER
            RETURNING id, cart_id, product_variant_id, quantity, created_at
            ",
        )
        .bind(cart_id)
        .bind(variant_id)
        .bind(quantity.get())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Atomically add `by` to an item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn increment_item(
        &self,
        id: CartItemId,
        by: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE storefront.cart_item
            SET quantity = LEAST(quantity::BIGINT + $2, 2147483647)::INTEGER
            WHERE id = $1
            RETURNING id, cart_id, product_variant_id, quantity, created_at
            ",
        )
        .bind(id)
        .bind(i64::from(by.get()))
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Overwrite an item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_item_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE storefront.cart_item
            SET quantity = $2
            WHERE id = $1
            RETURNING id, cart_id, product_variant_id, quantity, created_at
            ",
        )
        .bind(id)
        .bind(quantity.get())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete an item. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_item(&self, id: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Items of `cart_id` with catalog data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn list_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        fetch_lines(self.pool, cart_id, false).await
    }
}

const LINES_QUERY: &str = r"
    SELECT ci.id, ci.cart_id, ci.product_variant_id, ci.quantity, ci.created_at,
           p.name AS product_name,
           pv.name AS variant_name,
           pv.image_url,
           pv.price_in_cents
    FROM storefront.cart_item ci
    JOIN storefront.product_variant pv ON pv.id = ci.product_variant_id
    JOIN storefront.product p ON p.id = pv.product_id
    WHERE ci.cart_id = $1
    ORDER BY ci.created_at, ci.id
";

/// Load the lines of `cart_id` through `executor`.
///
/// With `for_update` the item rows stay locked until the surrounding
/// transaction ends, so quantity changes wait for it.
pub(super) async fn fetch_lines<'e>(
    executor: impl PgExecutor<'e>,
    cart_id: CartId,
    for_update: bool,
) -> Result<Vec<CartLine>, RepositoryError> {
    let sql = if for_update {
        format!("{LINES_QUERY} FOR UPDATE OF ci")
    } else {
        LINES_QUERY.to_owned()
    };

    let rows = sqlx::query_as::<_, CartLineRow>(&sql)
        .bind(cart_id)
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}
