//! Stored credential endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use keyward_common::AppResult;
use keyward_core::{CreateCredentialInput, UpdateCredentialInput};
use keyward_db::entities::credential;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Credential response. The secret is only returned by `reveal`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    pub id: String,
    pub name: String,
    pub login: Option<String>,
    pub favorite: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<credential::Model> for CredentialResponse {
    fn from(c: credential::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            login: c.login,
            favorite: c.favorite,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub favorite: Option<bool>,
}

/// Reveal request.
#[derive(Debug, Deserialize)]
pub struct RevealRequest {
    pub password: String,
}

/// Reveal response.
#[derive(Serialize)]
pub struct RevealResponse {
    pub password: String,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<CredentialResponse>>> {
    let credentials = state
        .credential_service
        .list(&user.id, query.favorite)
        .await?;

    Ok(ApiResponse::ok(
        credentials.into_iter().map(CredentialResponse::from).collect(),
    ))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCredentialInput>,
) -> AppResult<ApiResponse<CredentialResponse>> {
    let created = state.credential_service.create(&user.id, input).await?;

    Ok(ApiResponse::ok(created.into()))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CredentialResponse>> {
    let credential = state.credential_service.get(&user.id, &id).await?;

    Ok(ApiResponse::ok(credential.into()))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCredentialInput>,
) -> AppResult<ApiResponse<CredentialResponse>> {
    let updated = state
        .credential_service
        .update(&user.id, &id, input)
        .await?;

    Ok(ApiResponse::ok(updated.into()))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.credential_service.delete(&user.id, &id).await?;

    Ok(ApiResponse::empty())
}

async fn reveal(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RevealRequest>,
) -> AppResult<ApiResponse<RevealResponse>> {
    let password = state
        .credential_service
        .reveal(&user.id, &id, &req.password)
        .await?;

    Ok(ApiResponse::ok(RevealResponse { password }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/reveal", post(reveal))
}
