//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                            - Liveness
//! GET    /health/ready                      - Readiness (store ping)
//!
//! # Cart
//! GET    /api/cart                          - Cart with priced lines
//! POST   /api/cart/items                    - Add a variant
//! POST   /api/cart/items/{id}/increase      - One more unit
//! POST   /api/cart/items/{id}/decrease      - One less unit (deletes at zero)
//! DELETE /api/cart/items/{id}               - Remove the line
//!
//! # Shipping
//! GET    /api/shipping-addresses            - Caller's addresses, newest first
//! POST   /api/shipping-addresses            - Create (links to cart if any)
//! POST   /api/cart/shipping-address/select  - Link address, returns address
//! PUT    /api/cart/shipping-address         - Link address, returns cart
//! GET    /api/checkout/identification       - Addresses + linked address
//!
//! # Orders
//! POST   /api/orders                        - Finish checkout
//! ```
//!
//! Successful mutations carry an `HX-Trigger` header naming the client
//! events for every query they invalidated.

pub mod cart;
pub mod orders;
pub mod shipping;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use sacola_core::UserId;

use crate::cache::MutationKey;
use crate::error::AppError;
use crate::middleware::{
    api_rate_limiter, checkout_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Response header htmx listens on for client-side events.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// JSON body extractor whose rejections use the API's error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Drop the queries `mutation` invalidated for `user` and build the response.
pub(crate) async fn mutation_response<T: Serialize>(
    state: &AppState,
    user: UserId,
    mutation: &MutationKey,
    status: StatusCode,
    body: &T,
) -> Response {
    let events = state
        .queries()
        .invalidate(user, mutation)
        .await
        .iter()
        .map(|key| key.event_name())
        .collect::<Vec<_>>()
        .join(", ");

    (status, AppendHeaders([(HX_TRIGGER, events)]), Json(body)).into_response()
}

/// Create the cart routes router.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add))
        .route("/items/{id}", delete(cart::remove))
        .route("/items/{id}/increase", post(cart::increase))
        .route("/items/{id}/decrease", post(cart::decrease))
        .route("/shipping-address", put(shipping::update_cart_address))
        .route("/shipping-address/select", post(shipping::select))
}

/// Create the `/api` router, rate limited when enabled.
fn api_routes(rate_limit: bool) -> Router<AppState> {
    let mut api = Router::new()
        .nest("/cart", cart_routes())
        .route(
            "/shipping-addresses",
            get(shipping::index).post(shipping::create),
        )
        .route("/checkout/identification", get(shipping::identification));
    let mut orders = Router::new().route("/orders", post(orders::create));

    if rate_limit {
        api = api.layer(api_rate_limiter());
        orders = orders.layer(checkout_rate_limiter());
    }

    api.merge(orders)
}

/// Build the application router with every layer except sessions.
///
/// The caller adds the session layer (`PostgreSQL` in production, an
/// in-memory store in tests).
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(state.config().rate_limit_enabled))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
