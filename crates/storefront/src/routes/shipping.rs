//! Shipping address and identification route handlers.

use axum::{Json, extract::State, http::StatusCode, response::Response};
use tracing::instrument;

use super::{ApiJson, mutation_response};
use crate::cache::{CachedQuery, MutationKey};
use crate::error::{Result, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{IdentificationView, ShippingAddress, ShippingAddressInput};
use crate::services::{
    SelectShippingAddressInput, ShippingService, UpdateCartShippingAddressInput, require_user,
};
use crate::state::AppState;

/// List the caller's addresses.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ShippingAddress>>> {
    set_sentry_user(&user.id, Some(user.email.as_str()));
    if let Some(addresses) = state.queries().shipping_addresses(user.id).await {
        return Ok(Json(addresses));
    }

    let seen = state.queries().generation(user.id);
    let addresses = ShippingService::new(state.store()).list(Some(&user)).await?;
    state
        .queries()
        .insert(user.id, seen, CachedQuery::ShippingAddresses(addresses.clone()))
        .await;
    Ok(Json(addresses))
}

/// Create an address and link it to the cart.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiJson(input): ApiJson<ShippingAddressInput>,
) -> Result<Response> {
    let address = ShippingService::new(state.store())
        .create(user.as_ref(), input)
        .await?;
    let user_id = require_user(user.as_ref())?;

    Ok(mutation_response(
        &state,
        user_id,
        &MutationKey::CreateShippingAddress,
        StatusCode::CREATED,
        &address,
    )
    .await)
}

/// Link an address to the cart and return the address.
#[instrument(skip(state, user))]
pub async fn select(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiJson(input): ApiJson<SelectShippingAddressInput>,
) -> Result<Response> {
    let address = ShippingService::new(state.store())
        .select(user.as_ref(), &input)
        .await?;
    let user_id = require_user(user.as_ref())?;

    Ok(mutation_response(
        &state,
        user_id,
        &MutationKey::SelectShippingAddress,
        StatusCode::OK,
        &address,
    )
    .await)
}

/// Link an address to the cart and return the cart.
#[instrument(skip(state, user))]
pub async fn update_cart_address(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiJson(input): ApiJson<UpdateCartShippingAddressInput>,
) -> Result<Response> {
    let cart = ShippingService::new(state.store())
        .update_cart_address(user.as_ref(), &input)
        .await?;
    let user_id = require_user(user.as_ref())?;

    Ok(mutation_response(
        &state,
        user_id,
        &MutationKey::UpdateCartShippingAddress,
        StatusCode::OK,
        &cart,
    )
    .await)
}

/// Data for the identification step.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn identification(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<IdentificationView>> {
    if let Some(view) = state.queries().identification(user.id).await {
        return Ok(Json(view));
    }

    let seen = state.queries().generation(user.id);
    let view = ShippingService::new(state.store())
        .identification(Some(&user))
        .await?;
    state
        .queries()
        .insert(user.id, seen, CachedQuery::Identification(Box::new(view.clone())))
        .await;
    Ok(Json(view))
}
