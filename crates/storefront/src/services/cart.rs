//! Cart service.

use serde::Deserialize;
use tracing::instrument;

use sacola_core::{CartItemId, Quantity, UserId, VariantId, parse_id};

use super::error::{CheckoutError, require_user};
use crate::models::{CartItem, CartView, CurrentUser, ValidationErrors};
use crate::store::CheckoutStore;

/// Body of `POST /api/cart/items`.
///
/// Fields are kept raw so validation can report them as field errors.
#[derive(Debug, Clone, Deserialize)]
pub struct AddProductInput {
    pub product_variant_id: String,
    pub quantity: i64,
}

impl AddProductInput {
    fn validate(&self) -> Result<(VariantId, Quantity), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let variant_id = parse_id::<VariantId>(self.product_variant_id.trim());
        if variant_id.is_none() {
            errors.add("product_variant_id", "Produto inválido");
        }
        let quantity = Quantity::new(self.quantity)
            .map_err(|_| errors.add("quantity", "Quantidade deve ser no mínimo 1"))
            .ok();

        match (variant_id, quantity) {
            (Some(v), Some(q)) => Ok((v, q)),
            _ => Err(errors),
        }
    }
}

/// What happened to an item after a decrease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecreaseOutcome {
    Decremented(CartItem),
    /// The item had quantity 1 and was deleted.
    Removed,
}

/// Cart operations for the signed-in user.
pub struct CartService<'a> {
    store: &'a dyn CheckoutStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CheckoutStore) -> Self {
        Self { store }
    }

    /// Add `quantity` of a variant to the caller's cart.
    ///
    /// Creates the cart on first use. If the variant is already in the cart
    /// its quantity is increased, otherwise a new item is inserted.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidInput` for a malformed id or quantity.
    /// Returns `CheckoutError::Unauthorized` without a session.
    /// Returns `CheckoutError::VariantNotFound` if the variant does not exist.
    #[instrument(skip(self, user), fields(user_id = tracing::field::Empty))]
    pub async fn add_product(
        &self,
        user: Option<&CurrentUser>,
        input: &AddProductInput,
    ) -> Result<CartItem, CheckoutError> {
        let (variant_id, quantity) = input.validate()?;
        let user_id = require_user(user)?;
        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        self.add_validated(user_id, variant_id, quantity).await
    }

    async fn add_validated(
        &self,
        user_id: UserId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, CheckoutError> {
        self.store
            .get_variant(variant_id)
            .await?
            .ok_or(CheckoutError::VariantNotFound)?;

        let cart = match self.store.find_cart_by_user(user_id).await? {
            Some(cart) => cart,
            None => self.store.create_cart(user_id).await?,
        };

        let item = match self.store.find_cart_item(cart.id, variant_id).await? {
            Some(existing) => self.store.increment_cart_item(existing.id, quantity).await?,
            None => {
                self.store
                    .insert_cart_item(cart.id, variant_id, quantity)
                    .await?
            }
        };

        tracing::debug!(cart_item_id = %item.id, quantity = %item.quantity, "cart item updated");
        Ok(item)
    }

    /// Add one unit of an item's variant.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_product`], plus `CheckoutError::CartItemNotFound`
    /// and `CheckoutError::CartItemNotOwned` for the item lookup.
    #[instrument(skip(self, user))]
    pub async fn increase_item(
        &self,
        user: Option<&CurrentUser>,
        item_id: CartItemId,
    ) -> Result<CartItem, CheckoutError> {
        let user_id = require_user(user)?;
        let item = self.owned_item(user, item_id).await?;
        self.add_validated(user_id, item.product_variant_id, Quantity::ONE)
            .await
    }

    /// Take one unit off an item, deleting it when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthorized` without a session.
    /// Returns `CheckoutError::CartItemNotFound` if the item does not exist.
    /// Returns `CheckoutError::CartItemNotOwned` if it is in another user's cart.
    #[instrument(skip(self, user))]
    pub async fn decrease_item(
        &self,
        user: Option<&CurrentUser>,
        item_id: CartItemId,
    ) -> Result<DecreaseOutcome, CheckoutError> {
        let item = self.owned_item(user, item_id).await?;

        match item.quantity.decremented() {
            Some(quantity) => {
                let item = self.store.set_cart_item_quantity(item.id, quantity).await?;
                Ok(DecreaseOutcome::Decremented(item))
            }
            None => {
                self.store.delete_cart_item(item.id).await?;
                Ok(DecreaseOutcome::Removed)
            }
        }
    }

    /// Delete an item regardless of quantity.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthorized` without a session.
    /// Returns `CheckoutError::CartItemNotFound` if the item does not exist.
    /// Returns `CheckoutError::CartItemNotOwned` if it is in another user's cart.
    #[instrument(skip(self, user))]
    pub async fn remove_item(
        &self,
        user: Option<&CurrentUser>,
        item_id: CartItemId,
    ) -> Result<(), CheckoutError> {
        let item = self.owned_item(user, item_id).await?;
        if !self.store.delete_cart_item(item.id).await? {
            return Err(CheckoutError::CartItemNotFound);
        }
        Ok(())
    }

    /// The caller's cart with priced lines. Never creates a cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthorized` without a session.
    #[instrument(skip(self, user))]
    pub async fn get_cart(&self, user: Option<&CurrentUser>) -> Result<CartView, CheckoutError> {
        let user_id = require_user(user)?;
        let Some(cart) = self.store.find_cart_by_user(user_id).await? else {
            return Ok(CartView::empty());
        };
        let lines = self.store.list_cart_lines(cart.id).await?;
        Ok(CartView::from_lines(&cart, &lines))
    }

    async fn owned_item(
        &self,
        user: Option<&CurrentUser>,
        item_id: CartItemId,
    ) -> Result<CartItem, CheckoutError> {
        let user_id = require_user(user)?;
        let item = self
            .store
            .get_cart_item(item_id)
            .await?
            .ok_or(CheckoutError::CartItemNotFound)?;

        let owns = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .is_some_and(|cart| cart.id == item.cart_id);
        if !owns {
            return Err(CheckoutError::CartItemNotOwned);
        }
        Ok(item)
    }
}
