//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use keyward_core::{AuditService, AuthService, CredentialService, LoginIpService, LoginMonitor};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub credential_service: CredentialService,
    pub login_ip_service: LoginIpService,
    pub login_monitor: LoginMonitor,
    pub audit_service: AuditService,
}

/// Resolve a bearer token to a user and attach it to the request.
///
/// Requests without a valid token pass through unauthenticated; handlers
/// that need a user reject them via [`crate::extractors::AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.authenticate(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_server_error() => {
                tracing::error!(error = %e, "Failed to resolve session token");
            }
            Err(_) => {}
        }
    }

    next.run(req).await
}
