//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` (tower-sessions) and are shared with the
//! auth provider, which writes the signed-in identity under
//! [`crate::models::session_keys::CURRENT_USER`]. The cookie is signed with
//! the configured session secret.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sacola_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Apply the cookie settings shared by every session layer.
#[must_use]
pub fn configure<S: SessionStore + Clone>(
    layer: SessionManagerLayer<S>,
    secure: bool,
) -> SessionManagerLayer<S> {
    layer
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Create the signed session layer backed by `PostgreSQL`.
///
/// The `tower_sessions.session` table is created by `sacola-cli migrate`.
///
/// # Errors
///
/// Returns an error if the session secret is too short to derive a signing key.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, tower_sessions::cookie::KeyError> {
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())?;
    let store = PostgresStore::new(pool.clone());
    Ok(configure(SessionManagerLayer::new(store), config.is_https()).with_signed(key))
}
