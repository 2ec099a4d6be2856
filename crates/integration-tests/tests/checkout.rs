//! Cart, address and order flows against `PostgreSQL`.
//!
//! Run with: `cargo test -p sacola-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use sacola_integration_tests::{TestContext, address_input, user};
use sacola_storefront::db::{CartRepository, OrderRepository};
use sacola_storefront::models::COUNTRY;
use sacola_storefront::services::{
    AddProductInput, CartService, CheckoutError, DecreaseOutcome, OrderService,
    SelectShippingAddressInput, ShippingService,
};
use sacola_storefront::store::CheckoutStore;

fn add(variant_id: impl ToString, quantity: i64) -> AddProductInput {
    AddProductInput {
        product_variant_id: variant_id.to_string(),
        quantity,
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_add_twice_merges_into_one_item() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant(7990).await.unwrap();
    let alice = user();
    let carts = CartService::new(&ctx.store);

    let first = carts.add_product(Some(&alice), &add(variant.id, 2)).await.unwrap();
    let second = carts.add_product(Some(&alice), &add(variant.id, 3)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity.get(), 5);

    let view = carts.get_cart(Some(&alice)).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.total_in_cents, 5 * 7990);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_create_cart_is_idempotent() {
    let ctx = TestContext::new().await;
    let alice = user();
    let repo = CartRepository::new(&ctx.pool);

    let a = repo.create(alice.id).await.unwrap();
    let b = repo.create(alice.id).await.unwrap();
    assert_eq!(a.id, b.id);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_add_without_session_writes_nothing() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant(1000).await.unwrap();

    let err = CartService::new(&ctx.store)
        .add_product(None, &add(variant.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Unauthorized));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_decrease_to_zero_deletes_item() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant(1000).await.unwrap();
    let alice = user();
    let carts = CartService::new(&ctx.store);

    let item = carts.add_product(Some(&alice), &add(variant.id, 1)).await.unwrap();
    let outcome = carts.decrease_item(Some(&alice), item.id).await.unwrap();

    assert_eq!(outcome, DecreaseOutcome::Removed);
    assert!(ctx.store.get_cart_item(item.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_address_country_and_foreign_select() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant(1000).await.unwrap();
    let alice = user();
    let bob = user();
    let shipping = ShippingService::new(&ctx.store);

    CartService::new(&ctx.store)
        .add_product(Some(&alice), &add(variant.id, 1))
        .await
        .unwrap();
    let bobs = shipping.create(Some(&bob), address_input()).await.unwrap();
    assert_eq!(bobs.fields.country, COUNTRY);

    let err = shipping
        .select(
            Some(&alice),
            &SelectShippingAddressInput {
                address_id: bobs.id.to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AddressNotOwned));

    let cart = ctx.store.find_cart_by_user(alice.id).await.unwrap().unwrap();
    assert!(cart.shipping_address_id.is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_finish_order_snapshots_and_clears_cart() {
    let ctx = TestContext::new().await;
    let tee = ctx.seed_variant(7990).await.unwrap();
    let hoodie = ctx.seed_variant(18990).await.unwrap();
    let alice = user();
    let carts = CartService::new(&ctx.store);

    carts.add_product(Some(&alice), &add(tee.id, 2)).await.unwrap();
    carts.add_product(Some(&alice), &add(hoodie.id, 1)).await.unwrap();
    let address = ShippingService::new(&ctx.store)
        .create(Some(&alice), address_input())
        .await
        .unwrap();

    let order = OrderService::new(&ctx.store)
        .finish(Some(&alice))
        .await
        .unwrap();

    assert_eq!(order.shipping_address_id, address.id);
    assert_eq!(order.shipping.city, "Recife");
    assert_eq!(order.total.cents(), 2 * 7990 + 18990);
    assert_eq!(order.items.len(), 2);
    assert!(ctx.store.find_cart_by_user(alice.id).await.unwrap().is_none());

    let orders = OrderRepository::new(&ctx.pool);
    assert_eq!(orders.count_for_user(alice.id).await.unwrap(), 1);
    assert_eq!(orders.list_items(order.id).await.unwrap().len(), 2);

    let err = OrderService::new(&ctx.store)
        .finish(Some(&alice))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::CartNotFound));
}
