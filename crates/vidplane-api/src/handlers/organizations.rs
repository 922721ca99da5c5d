//! Organization signup.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use vidplane_core::models::{Organization, SubscriptionPlan};
use vidplane_core::AppError;

use crate::auth::{api_key, jwt};
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    #[schema(example = "Acme Video")]
    pub name: String,
    #[schema(example = "ops@acme.example")]
    pub contact_email: String,
    /// Optional starting plan, defaults to free
    pub plan: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateOrganizationResponse {
    pub organization: Organization,
    /// Initial live API key, shown only once
    pub api_key: String,
    /// Dashboard session token for the owner
    pub token: String,
}

/// Public signup: creates the organization, its first live API key, and
/// an owner session token.
#[utoipa::path(
    post,
    path = "/api/organizations",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = CreateOrganizationResponse),
        (status = 400, description = "Invalid signup payload")
    ),
    tag = "organizations"
)]
pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrganizationRequest>,
) -> Result<(axum::http::StatusCode, Json<CreateOrganizationResponse>), HttpAppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Organization name is required".to_string()).into());
    }
    let contact_email = payload.contact_email.trim();
    if !contact_email.contains('@') {
        return Err(AppError::InvalidInput("A valid contact email is required".to_string()).into());
    }

    let plan = match payload.plan.as_deref() {
        None => SubscriptionPlan::Free,
        Some(p) => SubscriptionPlan::parse(p)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown plan '{}'", p)))?,
    };

    let organization = state.organizations.create(name, contact_email, plan).await?;

    let raw_key = api_key::generate_api_key(true);
    let key_hash = api_key::hash_api_key(&raw_key)?;
    let key_prefix = api_key::extract_key_prefix(&raw_key);
    state
        .api_keys
        .create(organization.id, "Default", &key_prefix, &key_hash)
        .await?;

    let owner_id = Uuid::new_v4();
    let token = jwt::issue_token(
        &state.config.jwt_secret,
        organization.id,
        owner_id,
        "owner",
        state.config.jwt_expiry_hours,
    )?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateOrganizationResponse {
            organization,
            api_key: raw_key,
            token,
        }),
    ))
}
