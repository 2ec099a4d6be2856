//! Order route handlers.

use axum::{extract::State, http::StatusCode, response::Response};
use tracing::instrument;

use super::mutation_response;
use crate::cache::MutationKey;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::services::{OrderService, require_user};
use crate::state::AppState;

/// Finish checkout: place the order and delete the cart.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let user_id = require_user(user.as_ref())?;
    let order = OrderService::new(state.store()).finish(user.as_ref()).await?;

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok(mutation_response(
        &state,
        user_id,
        &MutationKey::FinishOrder,
        StatusCode::CREATED,
        &order,
    )
    .await)
}
