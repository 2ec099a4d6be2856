//! Checkout error types.

use thiserror::Error;

use sacola_core::UserId;

use crate::db::RepositoryError;
use crate::models::{CurrentUser, ValidationErrors};

/// Errors returned by the cart, shipping and order services.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Request fields failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(ValidationErrors),

    /// No user in the session.
    #[error("unauthorized")]
    Unauthorized,

    #[error("product variant not found")]
    VariantNotFound,

    #[error("cart not found")]
    CartNotFound,

    #[error("cart item not found")]
    CartItemNotFound,

    /// The item exists but lives in another user's cart.
    #[error("cart item not owned by caller")]
    CartItemNotOwned,

    #[error("shipping address not found")]
    AddressNotFound,

    /// The address exists but belongs to another user.
    #[error("shipping address not owned by caller")]
    AddressNotOwned,

    /// Checkout needs an address linked to the cart.
    #[error("cart has no shipping address")]
    ShippingAddressMissing,

    #[error("cart is empty")]
    EmptyCart,

    /// Repository/database error.
    #[error("database error: {0}")]
    Store(#[from] RepositoryError),
}

impl From<ValidationErrors> for CheckoutError {
    fn from(errors: ValidationErrors) -> Self {
        Self::InvalidInput(errors)
    }
}

/// Resolve the caller or fail with [`CheckoutError::Unauthorized`].
///
/// # Errors
///
/// Returns `CheckoutError::Unauthorized` when `user` is `None`.
pub fn require_user(user: Option<&CurrentUser>) -> Result<UserId, CheckoutError> {
    user.map(|u| u.id).ok_or(CheckoutError::Unauthorized)
}
