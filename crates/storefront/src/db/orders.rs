//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use sacola_core::{OrderId, OrderItemId, OrderStatus, Price, Quantity, UserId};

use super::{RepositoryError, carts};
use crate::models::{CartLine, NewOrder, Order, OrderItem};

#[derive(Debug, sqlx::FromRow)]
struct OrderHeaderRow {
    id: Uuid,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

/// Repository for placed orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn the cart into an order and delete the cart.
    ///
    /// Runs in one transaction. The cart row is locked first and its lines
    /// are read under that lock, so items added or changed concurrently
    /// either wait for the order or land in it; none are deleted unseen.
    /// Returns `None`, writing nothing, if the cart has no items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart was already removed.
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn place(&self, order: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM storefront.cart WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(order.cart_id)
        .bind(order.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let lines = carts::fetch_lines(&mut *tx, order.cart_id, true).await?;
        if lines.is_empty() {
            return Ok(None);
        }
        let total: Price = lines.iter().map(CartLine::total).sum();
        let f = &order.shipping;

        let header = sqlx::query_as::<_, OrderHeaderRow>(
            r"
            INSERT INTO storefront.customer_order
                (user_id, shipping_address_id, recipient_name, street, number, complement,
                 neighborhood, city, state, zip_code, country, phone, email, cpf_or_cnpj,
                 total_price_in_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id, status, created_at
            ",
        )
        .bind(order.user_id)
        .bind(order.shipping_address_id)
        .bind(&f.recipient_name)
        .bind(&f.street)
        .bind(&f.number)
        .bind(f.complement.as_deref())
        .bind(&f.neighborhood)
        .bind(&f.city)
        .bind(&f.state)
        .bind(&f.zip_code)
        .bind(&f.country)
        .bind(&f.phone)
        .bind(f.email.as_str())
        .bind(&f.cpf_or_cnpj)
        .bind(total.cents())
        .fetch_one(&mut *tx)
        .await?;

        let order_id = OrderId::new(header.id);
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let id: Uuid = sqlx::query_scalar(
                r"
                INSERT INTO storefront.order_item
                    (order_id, product_variant_id, quantity, price_in_cents)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                ",
            )
            .bind(order_id)
            .bind(line.item.product_variant_id)
            .bind(line.item.quantity.get())
            .bind(line.unit_price.cents())
            .fetch_one(&mut *tx)
            .await?;

            items.push(OrderItem {
                id: OrderItemId::new(id),
                order_id,
                product_variant_id: line.item.product_variant_id,
                quantity: line.item.quantity,
                unit_price: line.unit_price,
            });
        }

        sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
            .bind(order.cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(Order {
            id: order_id,
            user_id: order.user_id,
            shipping_address_id: order.shipping_address_id,
            shipping: order.shipping.clone(),
            total,
            status: header.status,
            items,
            created_at: header.created_at,
        }))
    }

    /// Count orders placed by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.customer_order WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Items of an order, as stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<(Uuid, Uuid, i32, i64)> = sqlx::query_as(
            r"
            SELECT id, product_variant_id, quantity, price_in_cents
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, variant_id, quantity, price)| {
                let quantity = Quantity::new(i64::from(quantity)).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid quantity on order item {id}: {e}"))
                })?;
                Ok(OrderItem {
                    id: OrderItemId::new(id),
                    order_id,
                    product_variant_id: variant_id.into(),
                    quantity,
                    unit_price: Price::from_cents(price),
                })
            })
            .collect()
    }
}
