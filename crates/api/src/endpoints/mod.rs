//! API endpoints.

mod auth;
mod login_ips;
mod password_logs;
mod passwords;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/passwords", passwords::router())
        .nest("/login-ips", login_ips::router())
        .nest("/password-logs", password_logs::router())
}
