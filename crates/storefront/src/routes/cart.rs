//! Cart route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Serialize;
use tracing::instrument;

use sacola_core::{CartItemId, parse_id};

use super::{ApiJson, mutation_response};
use crate::cache::{CachedQuery, MutationKey};
use crate::error::{Result, add_breadcrumb, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartItem, CartView, ValidationErrors};
use crate::services::{AddProductInput, CartService, CheckoutError, DecreaseOutcome, require_user};
use crate::state::AppState;

fn parse_item_id(raw: &str) -> std::result::Result<CartItemId, CheckoutError> {
    parse_id(raw).ok_or_else(|| {
        CheckoutError::InvalidInput(ValidationErrors::single("id", "ID do item inválido"))
    })
}

/// Body returned by the decrease endpoint.
#[derive(Debug, Serialize)]
pub struct DecreaseResponse {
    pub removed: bool,
    pub item: Option<CartItem>,
}

/// Show the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    set_sentry_user(&user.id, Some(user.email.as_str()));
    if let Some(view) = state.queries().cart(user.id).await {
        return Ok(Json(view));
    }

    let seen = state.queries().generation(user.id);
    let view = CartService::new(state.store()).get_cart(Some(&user)).await?;
    state
        .queries()
        .insert(user.id, seen, CachedQuery::Cart(Box::new(view.clone())))
        .await;
    Ok(Json(view))
}

/// Add a variant to the cart.
#[instrument(skip(state, user, input))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiJson(input): ApiJson<AddProductInput>,
) -> Result<Response> {
    let item = CartService::new(state.store())
        .add_product(user.as_ref(), &input)
        .await?;
    let user_id = require_user(user.as_ref())?;

    let variant_id = item.product_variant_id.to_string();
    add_breadcrumb("cart", "Added product", Some(&[("variant_id", variant_id.as_str())]));
    let mutation = MutationKey::AddProductToCart {
        variant: item.product_variant_id,
        quantity: item.quantity,
    };
    Ok(mutation_response(&state, user_id, &mutation, StatusCode::OK, &item).await)
}

/// Add one unit of an existing line.
#[instrument(skip(state, user))]
pub async fn increase(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_item_id(&id)?;
    let item = CartService::new(state.store())
        .increase_item(user.as_ref(), id)
        .await?;
    let user_id = require_user(user.as_ref())?;

    let mutation = MutationKey::IncreaseProductFromCart(item.product_variant_id);
    Ok(mutation_response(&state, user_id, &mutation, StatusCode::OK, &item).await)
}

/// Remove one unit of a line, deleting it at zero.
#[instrument(skip(state, user))]
pub async fn decrease(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_item_id(&id)?;
    let outcome = CartService::new(state.store())
        .decrease_item(user.as_ref(), id)
        .await?;
    let user_id = require_user(user.as_ref())?;

    let body = match outcome {
        DecreaseOutcome::Decremented(item) => DecreaseResponse {
            removed: false,
            item: Some(item),
        },
        DecreaseOutcome::Removed => DecreaseResponse {
            removed: true,
            item: None,
        },
    };
    let mutation = MutationKey::DecreaseProductFromCart(id);
    Ok(mutation_response(&state, user_id, &mutation, StatusCode::OK, &body).await)
}

/// Delete a line.
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_item_id(&id)?;
    CartService::new(state.store())
        .remove_item(user.as_ref(), id)
        .await?;
    let user_id = require_user(user.as_ref())?;

    let mutation = MutationKey::RemoveProductFromCart(id);
    Ok(mutation_response(
        &state,
        user_id,
        &mutation,
        StatusCode::OK,
        &serde_json::json!({ "removed": true }),
    )
    .await)
}
