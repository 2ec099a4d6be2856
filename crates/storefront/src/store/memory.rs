//! In-process [`CheckoutStore`].
//!
//! Holds everything behind one mutex, which makes each trait call atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use sacola_core::{
    AddressId, CartId, CartItemId, OrderId, OrderItemId, OrderStatus, Quantity, UserId,
    VariantId,
};

use super::CheckoutStore;
use crate::db::RepositoryError;
use crate::models::{
    Cart, CartItem, CartLine, NewOrder, NewShippingAddress, Order, OrderItem, ProductVariant,
    ShippingAddress,
};

#[derive(Default)]
struct Tables {
    products: HashMap<sacola_core::ProductId, String>,
    variants: HashMap<VariantId, ProductVariant>,
    carts: Vec<Cart>,
    items: Vec<CartItem>,
    addresses: Vec<ShippingAddress>,
    orders: Vec<Order>,
    unavailable: bool,
}

impl Tables {
    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        self.items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .map(|item| {
                let variant = self.variants.get(&item.product_variant_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} references missing variant",
                        item.id
                    ))
                })?;
                Ok(CartLine {
                    item: item.clone(),
                    product_name: self
                        .products
                        .get(&variant.product_id)
                        .cloned()
                        .unwrap_or_default(),
                    variant_name: variant.name.clone(),
                    image_url: variant.image_url.clone(),
                    unit_price: variant.price,
                })
            })
            .collect()
    }

    fn item_mut(&mut self, id: CartItemId) -> Result<&mut CartItem, RepositoryError> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// [`CheckoutStore`] kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a variant (and its product name) to the catalog.
    pub fn insert_variant(&self, product_name: &str, variant: ProductVariant) {
        let mut tables = self.lock();
        tables
            .products
            .insert(variant.product_id, product_name.to_owned());
        tables.variants.insert(variant.id, variant);
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Snapshot of all carts.
    #[must_use]
    pub fn carts(&self) -> Vec<Cart> {
        self.lock().carts.clone()
    }

    /// Snapshot of all cart items.
    #[must_use]
    pub fn cart_items(&self) -> Vec<CartItem> {
        self.lock().items.clone()
    }

    /// Snapshot of all placed orders.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.lock().check_available()
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        Ok(tables.variants.get(&id).cloned())
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        Ok(tables.carts.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        if let Some(existing) = tables.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(existing.clone());
        }
        let cart = Cart {
            id: CartId::generate(),
            user_id,
            shipping_address_id: None,
            created_at: Utc::now(),
        };
        tables.carts.push(cart.clone());
        Ok(cart)
    }

    async fn set_cart_shipping_address(
        &self,
        cart_id: CartId,
        address_id: AddressId,
    ) -> Result<Cart, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        let cart = tables
            .carts
            .iter_mut()
            .find(|c| c.id == cart_id)
            .ok_or(RepositoryError::NotFound)?;
        cart.shipping_address_id = Some(address_id);
        Ok(cart.clone())
    }

    async fn find_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        Ok(tables
            .items
            .iter()
            .find(|i| i.cart_id == cart_id && i.product_variant_id == variant_id)
            .cloned())
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        Ok(tables.items.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        if !tables.carts.iter().any(|c| c.id == cart_id) {
            return Err(RepositoryError::Conflict(format!("cart {cart_id} does not exist")));
        }
        if let Some(existing) = tables
            .items
            .iter_mut()
            .find(|i| i.cart_id == cart_id && i.product_variant_id == variant_id)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return Ok(existing.clone());
        }
        let item = CartItem {
            id: CartItemId::generate(),
            cart_id,
            product_variant_id: variant_id,
            quantity,
            created_at: Utc::now(),
        };
        tables.items.push(item.clone());
        Ok(item)
    }

    async fn increment_cart_item(
        &self,
        id: CartItemId,
        by: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        let item = tables.item_mut(id)?;
        item.quantity = item.quantity.saturating_add(by);
        Ok(item.clone())
    }

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        let item = tables.item_mut(id)?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        let before = tables.items.len();
        tables.items.retain(|i| i.id != id);
        Ok(tables.items.len() < before)
    }

    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        tables.lines(cart_id)
    }

    async fn insert_shipping_address(
        &self,
        user_id: UserId,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        let saved = ShippingAddress {
            id: AddressId::generate(),
            user_id,
            fields: address.fields.clone(),
            created_at: Utc::now(),
        };
        tables.addresses.push(saved.clone());
        Ok(saved)
    }

    async fn get_shipping_address(
        &self,
        id: AddressId,
    ) -> Result<Option<ShippingAddress>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        Ok(tables.addresses.iter().find(|a| a.id == id).cloned())
    }

    async fn list_shipping_addresses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShippingAddress>, RepositoryError> {
        let tables = self.lock();
        tables.check_available()?;
        Ok(tables
            .addresses
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn place_order(&self, order: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        let mut tables = self.lock();
        tables.check_available()?;
        let Some(position) = tables
            .carts
            .iter()
            .position(|c| c.id == order.cart_id && c.user_id == order.user_id)
        else {
            return Err(RepositoryError::NotFound);
        };

        let lines = tables.lines(order.cart_id)?;
        if lines.is_empty() {
            return Ok(None);
        }

        let order_id = OrderId::generate();
        let placed = Order {
            id: order_id,
            user_id: order.user_id,
            shipping_address_id: order.shipping_address_id,
            shipping: order.shipping.clone(),
            total: lines.iter().map(CartLine::total).sum(),
            status: OrderStatus::Pending,
            items: lines
                .iter()
                .map(|line| OrderItem {
                    id: OrderItemId::generate(),
                    order_id,
                    product_variant_id: line.item.product_variant_id,
                    quantity: line.item.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            created_at: Utc::now(),
        };

        tables.carts.remove(position);
        tables.items.retain(|i| i.cart_id != order.cart_id);
        tables.orders.push(placed.clone());
        Ok(Some(placed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sacola_core::{Price, ProductId};

    use super::*;

    fn variant() -> ProductVariant {
        ProductVariant {
            id: VariantId::generate(),
            product_id: ProductId::generate(),
            name: "Azul".to_owned(),
            slug: "camiseta-azul".to_owned(),
            color: "#0000ff".to_owned(),
            price: Price::from_cents(7990),
            image_url: "https://cdn.example.com/azul.png".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_cart_is_idempotent_per_user() {
        let store = MemoryStore::new();
        let user = UserId::generate();

        let first = store.create_cart(user).await.unwrap();
        let second = store.create_cart(user).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.carts().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_merges_same_variant() {
        let store = MemoryStore::new();
        let v = variant();
        store.insert_variant("Camiseta", v.clone());
        let cart = store.create_cart(UserId::generate()).await.unwrap();

        store
            .insert_cart_item(cart.id, v.id, Quantity::new(2).unwrap())
            .await
            .unwrap();
        let merged = store
            .insert_cart_item(cart.id, v.id, Quantity::new(3).unwrap())
            .await
            .unwrap();

        assert_eq!(merged.quantity.get(), 5);
        assert_eq!(store.cart_items().len(), 1);
    }

    #[tokio::test]
    async fn test_lines_carry_catalog_data() {
        let store = MemoryStore::new();
        let v = variant();
        store.insert_variant("Camiseta", v.clone());
        let cart = store.create_cart(UserId::generate()).await.unwrap();
        store
            .insert_cart_item(cart.id, v.id, Quantity::ONE)
            .await
            .unwrap();

        let lines = store.list_cart_lines(cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_name, "Camiseta");
        assert_eq!(lines[0].unit_price, Price::from_cents(7990));
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.ping().await,
            Err(RepositoryError::Database(_))
        ));
        assert!(store.create_cart(UserId::generate()).await.is_err());
    }
}
