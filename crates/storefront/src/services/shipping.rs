//! Shipping address service.

use serde::Deserialize;
use tracing::instrument;

use sacola_core::{AddressId, UserId, parse_id};

use super::error::{CheckoutError, require_user};
use crate::models::{
    AddressOption, Cart, CurrentUser, IdentificationView, ShippingAddress, ShippingAddressInput,
    ValidationErrors,
};
use crate::store::CheckoutStore;

const INVALID_ADDRESS_ID: &str = "ID do endereço inválido";

/// Body of `POST /api/cart/shipping-address/select`.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectShippingAddressInput {
    pub address_id: String,
}

/// Body of `PUT /api/cart/shipping-address`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartShippingAddressInput {
    pub shipping_address_id: String,
}

fn parse_address_id(field: &'static str, raw: &str) -> Result<AddressId, ValidationErrors> {
    parse_id(raw.trim()).ok_or_else(|| ValidationErrors::single(field, INVALID_ADDRESS_ID))
}

/// Shipping address operations for the signed-in user.
pub struct ShippingService<'a> {
    store: &'a dyn CheckoutStore,
}

impl<'a> ShippingService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CheckoutStore) -> Self {
        Self { store }
    }

    /// Save a new address and link it to the caller's cart, if there is one.
    ///
    /// The country is always stored as `Brasil`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidInput` listing every invalid field.
    /// Returns `CheckoutError::Unauthorized` without a session.
    #[instrument(skip_all)]
    pub async fn create(
        &self,
        user: Option<&CurrentUser>,
        input: ShippingAddressInput,
    ) -> Result<ShippingAddress, CheckoutError> {
        let address = input.validate()?;
        let user_id = require_user(user)?;

        let saved = self.store.insert_shipping_address(user_id, &address).await?;

        if let Some(cart) = self.store.find_cart_by_user(user_id).await? {
            self.store
                .set_cart_shipping_address(cart.id, saved.id)
                .await?;
        }

        tracing::info!(address_id = %saved.id, user_id = %user_id, "shipping address created");
        Ok(saved)
    }

    /// The caller's addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthorized` without a session.
    #[instrument(skip_all)]
    pub async fn list(
        &self,
        user: Option<&CurrentUser>,
    ) -> Result<Vec<ShippingAddress>, CheckoutError> {
        let user_id = require_user(user)?;
        Ok(self.store.list_shipping_addresses(user_id).await?)
    }

    /// Link one of the caller's addresses to their cart, returning the address.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidInput` for a malformed id.
    /// Returns `CheckoutError::Unauthorized` without a session.
    /// Returns `CheckoutError::AddressNotFound` or `CheckoutError::AddressNotOwned`
    /// for an address the caller cannot use.
    /// Returns `CheckoutError::CartNotFound` if the caller has no cart.
    #[instrument(skip(self, user))]
    pub async fn select(
        &self,
        user: Option<&CurrentUser>,
        input: &SelectShippingAddressInput,
    ) -> Result<ShippingAddress, CheckoutError> {
        let address_id = parse_address_id("address_id", &input.address_id)?;
        let user_id = require_user(user)?;
        let (address, _) = self.link(user_id, address_id).await?;
        Ok(address)
    }

    /// Link one of the caller's addresses to their cart, returning the cart.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select`].
    #[instrument(skip(self, user))]
    pub async fn update_cart_address(
        &self,
        user: Option<&CurrentUser>,
        input: &UpdateCartShippingAddressInput,
    ) -> Result<Cart, CheckoutError> {
        let address_id = parse_address_id("shipping_address_id", &input.shipping_address_id)?;
        let user_id = require_user(user)?;
        let (_, cart) = self.link(user_id, address_id).await?;
        Ok(cart)
    }

    /// Addresses plus the one currently linked to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthorized` without a session.
    #[instrument(skip_all)]
    pub async fn identification(
        &self,
        user: Option<&CurrentUser>,
    ) -> Result<IdentificationView, CheckoutError> {
        let user_id = require_user(user)?;
        let addresses = self.store.list_shipping_addresses(user_id).await?;
        let selected_shipping_address_id = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .and_then(|cart| cart.shipping_address_id);

        Ok(IdentificationView {
            addresses: addresses.into_iter().map(AddressOption::from).collect(),
            selected_shipping_address_id,
        })
    }

    async fn link(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<(ShippingAddress, Cart), CheckoutError> {
        let address = self
            .store
            .get_shipping_address(address_id)
            .await?
            .ok_or(CheckoutError::AddressNotFound)?;
        if address.user_id != user_id {
            return Err(CheckoutError::AddressNotOwned);
        }

        let cart = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .ok_or(CheckoutError::CartNotFound)?;

        let cart = self
            .store
            .set_cart_shipping_address(cart.id, address.id)
            .await?;
        Ok((address, cart))
    }
}
