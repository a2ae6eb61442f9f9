//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use keyward_common::AppResult;
use keyward_core::{ChangePasswordInput, IssuedSession};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthUser, ClientIp, DeviceInfo},
    middleware::AppState,
    response::ApiResponse,
};

/// Password sign-in request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Signed-in user summary.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

/// Sign-in response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: SessionUser,
}

impl From<&IssuedSession> for LoginResponse {
    fn from(session: &IssuedSession) -> Self {
        Self {
            token: session.token.clone(),
            expires_in: session.expires_in,
            user: SessionUser {
                id: session.user.id.clone(),
                name: session.user.name.clone(),
                email: session.user.email.clone(),
                is_admin: session.user.is_admin,
            },
        }
    }
}

/// Sign in with email and password.
async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    DeviceInfo(device): DeviceInfo,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    req.validate()?;

    let session = state.auth_service.login(&req.email, &req.password).await?;

    let response = LoginResponse::from(&session);
    drop(state.login_monitor.spawn_track(session.user, ip, device));

    Ok(ApiResponse::ok(response))
}

/// Change the account password.
async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state.auth_service.change_password(&user.id, input).await?;

    Ok(ApiResponse::empty())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/change-password", post(change_password))
}
