//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; the body is always JSON.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::models::FieldError;
use crate::services::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A checkout action failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// The request body was missing, not JSON, or the wrong shape.
    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "no_fields")]
    fields: &'a [FieldError],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn no_fields(fields: &&[FieldError]) -> bool {
    fields.is_empty()
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Checkout(CheckoutError::Store(_)))
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(rejection) => rejection.status(),
            Self::Checkout(err) => match err {
                CheckoutError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::Unauthorized => StatusCode::UNAUTHORIZED,
                // Ownership failures look like missing rows.
                CheckoutError::VariantNotFound
                | CheckoutError::CartNotFound
                | CheckoutError::CartItemNotFound
                | CheckoutError::CartItemNotOwned
                | CheckoutError::AddressNotFound
                | CheckoutError::AddressNotOwned => StatusCode::NOT_FOUND,
                CheckoutError::ShippingAddressMissing | CheckoutError::EmptyCart => {
                    StatusCode::CONFLICT
                }
                CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message safe to show to the client.
    const fn public_message(&self) -> &'static str {
        match self {
            Self::Body(_) => "Corpo da requisição inválido",
            Self::Checkout(err) => match err {
                CheckoutError::InvalidInput(_) => "Dados inválidos",
                CheckoutError::Unauthorized => "Não autorizado",
                CheckoutError::VariantNotFound => "Produto não encontrado",
                CheckoutError::CartNotFound => "Carrinho não encontrado",
                CheckoutError::CartItemNotFound | CheckoutError::CartItemNotOwned => {
                    "Item não encontrado"
                }
                CheckoutError::AddressNotFound | CheckoutError::AddressNotOwned => {
                    "Endereço não encontrado"
                }
                CheckoutError::ShippingAddressMissing => "Selecione um endereço de entrega",
                CheckoutError::EmptyCart => "Carrinho vazio",
                CheckoutError::Store(_) => "Erro interno do servidor",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let fields = match &self {
            Self::Checkout(CheckoutError::InvalidInput(errors)) => errors.fields(),
            _ => &[],
        };
        let body = ErrorBody {
            error: self.public_message(),
            fields,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("variant_id", "…")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
