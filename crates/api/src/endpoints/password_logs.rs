//! Credential audit history endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use keyward_common::{AppError, AppResult};
use keyward_db::entities::audit_entry::{self, ActionType};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Audit entry response. Ciphertext columns are never exposed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    pub id: String,
    pub credential_id: String,
    pub credential_name: String,
    pub action_type: ActionType,
    pub field_changed: Option<String>,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub contains_sensitive_data: bool,
    pub timestamp: String,
}

impl From<audit_entry::Model> for AuditEntryResponse {
    fn from(e: audit_entry::Model) -> Self {
        Self {
            id: e.id,
            credential_id: e.credential_id,
            credential_name: e.credential_name,
            action_type: e.action_type,
            field_changed: e.field_changed,
            previous_value: e.previous_value,
            new_value: e.new_value,
            contains_sensitive_data: e.contains_sensitive_data,
            timestamp: e.created_at.to_rfc3339(),
        }
    }
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
}

/// Password re-verification request.
#[derive(Debug, Deserialize)]
pub struct SensitiveRequest {
    pub password: String,
}

/// Clear response.
#[derive(Serialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

fn to_responses(entries: Vec<audit_entry::Model>) -> Vec<AuditEntryResponse> {
    entries.into_iter().map(AuditEntryResponse::from).collect()
}

/// Parse the path filter: `all` or one action type.
fn parse_filter(raw: &str) -> AppResult<Option<ActionType>> {
    if raw == "all" {
        return Ok(None);
    }

    raw.parse::<ActionType>()
        .map(Some)
        .map_err(AppError::BadRequest)
}

/// History with sensitive values redacted.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<AuditEntryResponse>>> {
    let entries = state.audit_service.list(&user.id, query.limit).await?;

    Ok(ApiResponse::ok(to_responses(entries)))
}

/// History with sensitive values decoded, after re-checking the password.
async fn list_sensitive(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SensitiveRequest>,
) -> AppResult<ApiResponse<Vec<AuditEntryResponse>>> {
    let entries = state
        .audit_service
        .list_with_sensitive(&user.id, &req.password)
        .await?;

    Ok(ApiResponse::ok(to_responses(entries)))
}

/// Delete the whole history.
async fn clear_all(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ClearResponse>> {
    let deleted = state.audit_service.clear(&user.id, None).await?;

    Ok(ApiResponse::ok(ClearResponse { deleted }))
}

/// Delete the history of one action type, or `all`.
async fn clear_by_type(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(action_type): Path<String>,
) -> AppResult<ApiResponse<ClearResponse>> {
    let filter = parse_filter(&action_type)?;
    let deleted = state.audit_service.clear(&user.id, filter).await?;

    Ok(ApiResponse::ok(ClearResponse { deleted }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).delete(clear_all))
        .route("/sensitive", post(list_sensitive))
        .route("/{action_type}", delete(clear_by_type))
}
