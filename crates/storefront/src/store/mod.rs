//! Persistence seam for the checkout flow.
//!
//! Services talk to a [`CheckoutStore`] trait object so they run unchanged
//! against `PostgreSQL` ([`crate::db::PgStore`]) or the in-process
//! [`MemoryStore`] used by tests and local demos.

mod memory;

use async_trait::async_trait;

use sacola_core::{AddressId, CartId, CartItemId, Quantity, UserId, VariantId};

pub use memory::MemoryStore;

use crate::db::RepositoryError;
use crate::models::{
    Cart, CartItem, CartLine, NewOrder, NewShippingAddress, Order, ProductVariant,
    ShippingAddress,
};

/// Storage operations needed by the cart, shipping and order services.
///
/// Implementations must keep at most one cart per user and at most one item
/// per (cart, variant): `create_cart` returns the existing cart on conflict
/// and `insert_cart_item` merges quantities on conflict.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError>;

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Create the user's cart, or return it if it already exists.
    async fn create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] if the cart is gone.
    async fn set_cart_shipping_address(
        &self,
        cart_id: CartId,
        address_id: AddressId,
    ) -> Result<Cart, RepositoryError>;

    async fn find_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
    ) -> Result<Option<CartItem>, RepositoryError>;

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError>;

    /// Insert a line, or add `quantity` to the existing line for the variant.
    async fn insert_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError>;

    /// Atomically add `by` to the item's quantity.
    async fn increment_cart_item(
        &self,
        id: CartItemId,
        by: Quantity,
    ) -> Result<CartItem, RepositoryError>;

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError>;

    /// Returns whether an item was removed.
    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError>;

    /// Items of the cart joined with catalog data, oldest first.
    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    async fn insert_shipping_address(
        &self,
        user_id: UserId,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress, RepositoryError>;

    async fn get_shipping_address(
        &self,
        id: AddressId,
    ) -> Result<Option<ShippingAddress>, RepositoryError>;

    /// A user's addresses, newest first.
    async fn list_shipping_addresses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShippingAddress>, RepositoryError>;

    /// Turn the cart's current lines into an order and delete the cart, as
    /// one unit. Lines must be read while the cart is held so nothing added
    /// in the meantime is dropped. `None` means the cart had no items.
    async fn place_order(&self, order: &NewOrder) -> Result<Option<Order>, RepositoryError>;
}
