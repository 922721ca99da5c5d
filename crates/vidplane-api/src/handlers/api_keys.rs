//! API key management (JWT-only, owner/admin).

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use vidplane_core::AppError;
use vidplane_db::ApiKey;

use crate::auth::api_key::{extract_key_prefix, generate_api_key, hash_api_key};
use crate::auth::models::{AuthMethod, OrgContext};
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    #[schema(example = "Production key")]
    pub name: String,
    /// Create a `vp_test_` key instead of `vp_live_`
    #[serde(default)]
    pub test: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    /// The full API key, shown only once
    pub api_key: String,
    pub name: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ApiKeyInfo {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyInfo {
    fn from(key: ApiKey) -> Self {
        Self {
            is_active: key.is_active(),
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

fn require_key_management(ctx: &OrgContext) -> Result<(), AppError> {
    if ctx.auth_method != AuthMethod::Jwt {
        return Err(AppError::Forbidden(
            "API keys cannot manage other API keys".to_string(),
        ));
    }
    if !ctx.can_manage_keys() {
        return Err(AppError::Forbidden(
            "Requires owner or admin role".to_string(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "API key created", body = CreateApiKeyResponse),
        (status = 403, description = "Insufficient role")
    ),
    security(("bearer_auth" = [])),
    tag = "api-keys"
)]
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreateApiKeyResponse>), HttpAppError> {
    require_key_management(&ctx)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Key name is required".to_string()).into());
    }

    let raw_key = generate_api_key(!payload.test);
    let key_hash = hash_api_key(&raw_key)?;
    let key_prefix = extract_key_prefix(&raw_key);

    let key = state
        .api_keys
        .create(ctx.organization_id, name, &key_prefix, &key_hash)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            id: key.id,
            api_key: raw_key,
            name: key.name,
            key_prefix: key.key_prefix,
            created_at: key.created_at,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/keys",
    responses((status = 200, description = "API keys for the organization", body = [ApiKeyInfo])),
    security(("bearer_auth" = [])),
    tag = "api-keys"
)]
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
) -> Result<Json<Vec<ApiKeyInfo>>, HttpAppError> {
    require_key_management(&ctx)?;

    let keys = state.api_keys.list_for_org(ctx.organization_id).await?;
    Ok(Json(keys.into_iter().map(ApiKeyInfo::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/keys/{id}",
    params(("id" = Uuid, Path, description = "API key id")),
    responses(
        (status = 204, description = "API key revoked"),
        (status = 404, description = "Key not found")
    ),
    security(("bearer_auth" = [])),
    tag = "api-keys"
)]
pub async fn revoke_key(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    require_key_management(&ctx)?;

    state.api_keys.revoke(ctx.organization_id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
