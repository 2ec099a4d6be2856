//! Cart domain types and the cart view returned to clients.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sacola_core::{AddressId, CartId, CartItemId, Price, Quantity, UserId, VariantId};

/// A user's in-progress cart.
///
/// At most one exists per user. It is created lazily by the first
/// add-to-cart and removed when the order is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// Address the order will ship to, once the user picked one.
    pub shipping_address_id: Option<AddressId>,
    pub created_at: DateTime<Utc>,
}

/// One line of a cart: a variant and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_variant_id: VariantId,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
}

/// A cart item joined with the catalog data needed to display and price it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub product_name: String,
    pub variant_name: String,
    pub image_url: String,
    pub unit_price: Price,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.unit_price.times(self.item.quantity)
    }
}

/// A cart line as rendered by the cart sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_name: String,
    pub product_variant_id: VariantId,
    pub product_variant_name: String,
    pub product_variant_image_url: String,
    pub unit_price_in_cents: i64,
    pub quantity: Quantity,
    pub total_in_cents: i64,
    pub total_formatted: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let total = line.total();
        Self {
            id: line.item.id,
            product_name: line.product_name.clone(),
            product_variant_id: line.item.product_variant_id,
            product_variant_name: line.variant_name.clone(),
            product_variant_image_url: line.image_url.clone(),
            unit_price_in_cents: line.unit_price.cents(),
            quantity: line.item.quantity,
            total_in_cents: total.cents(),
            total_formatted: total.to_brl(),
        }
    }
}

/// The cart as returned by `GET /api/cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// `None` until the first item is added.
    pub id: Option<CartId>,
    pub shipping_address_id: Option<AddressId>,
    pub items: Vec<CartLineView>,
    /// Sum of all line quantities.
    pub item_count: i64,
    pub total_in_cents: i64,
    /// Total in reais, serialized as a decimal string such as `"174.80"`.
    pub total_amount: Decimal,
    pub total_formatted: String,
}

impl CartView {
    /// The view for a user who has no cart yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: None,
            shipping_address_id: None,
            items: Vec::new(),
            item_count: 0,
            total_in_cents: 0,
            total_amount: Price::ZERO.amount(),
            total_formatted: Price::ZERO.to_brl(),
        }
    }

    /// Build the view for an existing cart from its lines.
    #[must_use]
    pub fn from_lines(cart: &Cart, lines: &[CartLine]) -> Self {
        let total: Price = lines.iter().map(CartLine::total).sum();
        Self {
            id: Some(cart.id),
            shipping_address_id: cart.shipping_address_id,
            items: lines.iter().map(CartLineView::from).collect(),
            item_count: lines
                .iter()
                .map(|l| i64::from(l.item.quantity.get()))
                .sum(),
            total_in_cents: total.cents(),
            total_amount: total.amount(),
            total_formatted: total.to_brl(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(unit_cents: i64, quantity: i64) -> CartLine {
        CartLine {
            item: CartItem {
                id: CartItemId::generate(),
                cart_id: CartId::generate(),
                product_variant_id: VariantId::generate(),
                quantity: Quantity::new(quantity).unwrap(),
                created_at: Utc::now(),
            },
            product_name: "Camiseta".to_owned(),
            variant_name: "Azul".to_owned(),
            image_url: "https://cdn.example.com/azul.png".to_owned(),
            unit_price: Price::from_cents(unit_cents),
        }
    }

    #[test]
    fn test_empty_view() {
        let view = CartView::empty();
        assert!(view.id.is_none());
        assert!(view.items.is_empty());
        assert_eq!(view.total_formatted, "R$ 0,00");
    }

    #[test]
    fn test_view_totals_lines() {
        let cart = Cart {
            id: CartId::generate(),
            user_id: UserId::generate(),
            shipping_address_id: None,
            created_at: Utc::now(),
        };
        let lines = vec![line(7990, 2), line(1500, 1)];
        let view = CartView::from_lines(&cart, &lines);

        assert_eq!(view.id, Some(cart.id));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total_in_cents, 17_480);
        assert_eq!(view.total_formatted, "R$ 174,80");
        assert_eq!(view.total_amount.to_string(), "174.80");
        assert_eq!(view.items[0].total_in_cents, 15_980);
    }
}
