//! Sign-in address endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use keyward_common::AppResult;
use keyward_db::entities::login_ip;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Sign-in address response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginIpResponse {
    pub id: String,
    pub ip_address: String,
    pub device_info: Option<String>,
    pub is_trusted: bool,
    pub first_seen: String,
    pub last_seen: String,
}

impl From<login_ip::Model> for LoginIpResponse {
    fn from(r: login_ip::Model) -> Self {
        Self {
            id: r.id,
            ip_address: r.ip_address,
            device_info: r.device_info,
            is_trusted: r.is_trusted,
            first_seen: r.first_seen.to_rfc3339(),
            last_seen: r.last_seen.to_rfc3339(),
        }
    }
}

/// Trust toggle request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTrustRequest {
    pub is_trusted: bool,
}

/// List the caller's sign-in addresses, most recently seen first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<LoginIpResponse>>> {
    let records = state.login_ip_service.list(&user.id).await?;

    Ok(ApiResponse::ok(
        records.into_iter().map(LoginIpResponse::from).collect(),
    ))
}

/// Mark one address trusted or untrusted.
async fn set_trust(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetTrustRequest>,
) -> AppResult<ApiResponse<LoginIpResponse>> {
    let record = state
        .login_ip_service
        .set_trust(&user.id, &id, req.is_trusted)
        .await?;

    Ok(ApiResponse::ok(record.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", put(set_trust))
}
