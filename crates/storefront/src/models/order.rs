//! Orders created when checkout is finished.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sacola_core::{AddressId, CartId, OrderId, OrderItemId, OrderStatus, Price, Quantity, UserId, VariantId};

use super::shipping_address::AddressFields;

/// A placed order.
///
/// The shipping address is copied into the order so later address rows can
/// never change where an existing order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_address_id: AddressId,
    #[serde(flatten)]
    pub shipping: AddressFields,
    pub total: Price,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// One line of a placed order, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_variant_id: VariantId,
    pub quantity: Quantity,
    pub unit_price: Price,
}

/// Everything needed to write an order and retire the cart it came from.
///
/// Lines are not part of the request: the store reads them from the cart
/// while holding it, so the order always matches what the cart contained.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub cart_id: CartId,
    pub shipping_address_id: AddressId,
    pub shipping: AddressFields,
}
