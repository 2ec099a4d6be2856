//! Order service.

use tracing::instrument;

use super::error::{CheckoutError, require_user};
use crate::db::RepositoryError;
use crate::models::{CurrentUser, NewOrder, Order};
use crate::store::CheckoutStore;

/// Turns the caller's cart into an order.
pub struct OrderService<'a> {
    store: &'a dyn CheckoutStore,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CheckoutStore) -> Self {
        Self { store }
    }

    /// Place an order from the caller's cart and delete the cart.
    ///
    /// The store reads the cart's lines while placing the order, pricing them
    /// at the variants' current prices, and the linked address is copied into
    /// the order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthorized` without a session.
    /// Returns `CheckoutError::CartNotFound` if the caller has no cart.
    /// Returns `CheckoutError::ShippingAddressMissing` if no address is linked.
    /// Returns `CheckoutError::EmptyCart` if the cart has no items.
    #[instrument(skip_all)]
    pub async fn finish(&self, user: Option<&CurrentUser>) -> Result<Order, CheckoutError> {
        let user_id = require_user(user)?;
        let cart = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .ok_or(CheckoutError::CartNotFound)?;

        let address_id = cart
            .shipping_address_id
            .ok_or(CheckoutError::ShippingAddressMissing)?;
        let address = self
            .store
            .get_shipping_address(address_id)
            .await?
            .ok_or(CheckoutError::ShippingAddressMissing)?;
        if address.user_id != user_id {
            return Err(CheckoutError::AddressNotOwned);
        }

        let new_order = NewOrder {
            user_id,
            cart_id: cart.id,
            shipping_address_id: address.id,
            shipping: address.fields,
        };

        let order = self
            .store
            .place_order(&new_order)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CheckoutError::CartNotFound,
                other => CheckoutError::Store(other),
            })?
            .ok_or(CheckoutError::EmptyCart)?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total,
            items = order.items.len(),
            "order placed"
        );
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use sacola_core::{
        AddressId, CartId, CartItemId, OrderStatus, Price, Quantity, UserId, VariantId,
    };

    use super::*;
    use crate::models::{
        Cart, CartItem, CartLine, NewShippingAddress, ProductVariant, ShippingAddress,
    };
    use crate::services::{AddProductInput, CartService, ShippingService};
    use crate::store::MemoryStore;
    use crate::test_support::{address_input, seeded_store, user, variant};

    /// Adds `late` to the cart right before the order is placed, like an
    /// add-to-cart from another tab landing mid-checkout.
    struct LateAddStore {
        inner: MemoryStore,
        late: ProductVariant,
    }

    #[async_trait]
    impl CheckoutStore for LateAddStore {
        async fn ping(&self) -> Result<(), RepositoryError> {
            self.inner.ping().await
        }

        async fn get_variant(
            &self,
            id: VariantId,
        ) -> Result<Option<ProductVariant>, RepositoryError> {
            self.inner.get_variant(id).await
        }

        async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
            self.inner.find_cart_by_user(user_id).await
        }

        async fn create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
            self.inner.create_cart(user_id).await
        }

        async fn set_cart_shipping_address(
            &self,
            cart_id: CartId,
            address_id: AddressId,
        ) -> Result<Cart, RepositoryError> {
            self.inner.set_cart_shipping_address(cart_id, address_id).await
        }

        async fn find_cart_item(
            &self,
            cart_id: CartId,
            variant_id: VariantId,
        ) -> Result<Option<CartItem>, RepositoryError> {
            self.inner.find_cart_item(cart_id, variant_id).await
        }

        async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
            self.inner.get_cart_item(id).await
        }

        async fn insert_cart_item(
            &self,
            cart_id: CartId,
            variant_id: VariantId,
            quantity: Quantity,
        ) -> Result<CartItem, RepositoryError> {
            self.inner.insert_cart_item(cart_id, variant_id, quantity).await
        }

        async fn increment_cart_item(
            &self,
            id: CartItemId,
            by: Quantity,
        ) -> Result<CartItem, RepositoryError> {
            self.inner.increment_cart_item(id, by).await
        }

        async fn set_cart_item_quantity(
            &self,
            id: CartItemId,
            quantity: Quantity,
        ) -> Result<CartItem, RepositoryError> {
            self.inner.set_cart_item_quantity(id, quantity).await
        }

        async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError> {
            self.inner.delete_cart_item(id).await
        }

        async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
            self.inner.list_cart_lines(cart_id).await
        }

        async fn insert_shipping_address(
            &self,
            user_id: UserId,
            address: &NewShippingAddress,
        ) -> Result<ShippingAddress, RepositoryError> {
            self.inner.insert_shipping_address(user_id, address).await
        }

        async fn get_shipping_address(
            &self,
            id: AddressId,
        ) -> Result<Option<ShippingAddress>, RepositoryError> {
            self.inner.get_shipping_address(id).await
        }

        async fn list_shipping_addresses(
            &self,
            user_id: UserId,
        ) -> Result<Vec<ShippingAddress>, RepositoryError> {
            self.inner.list_shipping_addresses(user_id).await
        }

        async fn place_order(&self, order: &NewOrder) -> Result<Option<Order>, RepositoryError> {
            self.inner
                .insert_cart_item(order.cart_id, self.late.id, Quantity::new(4).unwrap())
                .await?;
            self.inner.place_order(order).await
        }
    }

    #[tokio::test]
    async fn test_finish_places_order_and_deletes_cart() {
        let (store, variant) = seeded_store();
        let alice = user();
        CartService::new(&store)
            .add_product(
                Some(&alice),
                &AddProductInput {
                    product_variant_id: variant.id.to_string(),
                    quantity: 2,
                },
            )
            .await
            .unwrap();
        let address = ShippingService::new(&store)
            .create(Some(&alice), address_input())
            .await
            .unwrap();

        let order = OrderService::new(&store).finish(Some(&alice)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipping_address_id, address.id);
        assert_eq!(order.shipping, address.fields);
        assert_eq!(order.total.cents(), 2 * variant.price.cents());
        assert_eq!(order.items.len(), 1);
        assert!(store.carts().is_empty());
        assert!(store.cart_items().is_empty());
    }

    #[tokio::test]
    async fn test_finish_requires_address() {
        let (store, variant) = seeded_store();
        let alice = user();
        CartService::new(&store)
            .add_product(
                Some(&alice),
                &AddProductInput {
                    product_variant_id: variant.id.to_string(),
                    quantity: 1,
                },
            )
            .await
            .unwrap();

        let err = OrderService::new(&store)
            .finish(Some(&alice))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ShippingAddressMissing));
        assert_eq!(store.carts().len(), 1);
    }

    #[tokio::test]
    async fn test_finish_rejects_empty_cart() {
        let (store, variant) = seeded_store();
        let alice = user();
        let carts = CartService::new(&store);
        let item = carts
            .add_product(
                Some(&alice),
                &AddProductInput {
                    product_variant_id: variant.id.to_string(),
                    quantity: 1,
                },
            )
            .await
            .unwrap();
        ShippingService::new(&store)
            .create(Some(&alice), address_input())
            .await
            .unwrap();
        carts.remove_item(Some(&alice), item.id).await.unwrap();

        let err = OrderService::new(&store)
            .finish(Some(&alice))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_finish_without_cart() {
        let (store, _) = seeded_store();
        let err = OrderService::new(&store)
            .finish(Some(&user()))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::CartNotFound));
    }

    #[tokio::test]
    async fn test_item_added_during_checkout_is_ordered_not_dropped() {
        let (inner, tee) = seeded_store();
        let hoodie = ProductVariant {
            price: Price::from_cents(18_990),
            ..variant()
        };
        inner.insert_variant("Moletom", hoodie.clone());
        let store = LateAddStore {
            inner,
            late: hoodie.clone(),
        };
        let alice = user();
        CartService::new(&store)
            .add_product(
                Some(&alice),
                &AddProductInput {
                    product_variant_id: tee.id.to_string(),
                    quantity: 1,
                },
            )
            .await
            .unwrap();
        ShippingService::new(&store)
            .create(Some(&alice), address_input())
            .await
            .unwrap();

        let order = OrderService::new(&store).finish(Some(&alice)).await.unwrap();

        assert_eq!(order.items.len(), 2);
        let late = order
            .items
            .iter()
            .find(|i| i.product_variant_id == hoodie.id)
            .unwrap();
        assert_eq!(late.quantity.get(), 4);
        assert_eq!(order.total.cents(), 7990 + 4 * 18_990);
        assert!(store.inner.cart_items().is_empty());
    }
}
