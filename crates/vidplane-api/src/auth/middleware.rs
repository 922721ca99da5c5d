//! Bearer authentication: API keys and dashboard JWTs on one header.
//!
//! Tokens shaped like our API keys take the key path (prefix lookup,
//! argon2 verify, last-used touch); everything else is decoded as an
//! HS256 JWT. Both paths resolve the organization, reject suspended
//! tenants, and attach an `OrgContext` extension.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use vidplane_core::AppError;
use vidplane_db::{ApiKeyRepository, OrganizationRepository, UsageRepository};

use crate::auth::api_key::{extract_key_prefix, is_api_key_format, verify_api_key};
use crate::auth::jwt;
use crate::auth::models::{AuthMethod, OrgContext};
use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub api_keys: ApiKeyRepository,
    pub organizations: OrganizationRepository,
    pub usage: UsageRepository,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token.to_string(),
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing or malformed Authorization header".to_string(),
            ))
            .into_response()
        }
    };

    let context = if is_api_key_format(&token) {
        authenticate_api_key(&auth_state, &token).await
    } else {
        authenticate_jwt(&auth_state, &token).await
    };

    let context = match context {
        Ok(context) => context,
        Err(e) => return HttpAppError(e).into_response(),
    };

    if !context.organization.is_active() {
        return HttpAppError(AppError::Forbidden(
            "Organization is suspended".to_string(),
        ))
        .into_response();
    }

    // Usage tick is fire-and-forget: a ledger hiccup must not fail the
    // primary request.
    {
        let usage = auth_state.usage.clone();
        let org_id = context.organization_id;
        tokio::spawn(async move {
            if let Err(e) = usage.record_api_call(org_id).await {
                tracing::warn!(organization_id = %org_id, error = %e, "Failed to record API call");
            }
        });
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authenticate_api_key(state: &AuthState, token: &str) -> Result<OrgContext, AppError> {
    let prefix = extract_key_prefix(token);
    let candidates = state.api_keys.find_active_by_prefix(&prefix).await?;

    for key in candidates {
        if verify_api_key(token, &key.key_hash)? {
            let organization = state.organizations.get(key.organization_id).await?;

            let api_keys = state.api_keys.clone();
            let key_id = key.id;
            tokio::spawn(async move {
                if let Err(e) = api_keys.touch_last_used(key_id).await {
                    tracing::warn!(api_key_id = %key_id, error = %e, "Failed to touch API key");
                }
            });

            return Ok(OrgContext {
                organization_id: organization.id,
                organization,
                role: "admin".to_string(),
                auth_method: AuthMethod::ApiKey,
            });
        }
    }

    Err(AppError::Unauthorized("Invalid API key".to_string()))
}

async fn authenticate_jwt(state: &AuthState, token: &str) -> Result<OrgContext, AppError> {
    let claims = jwt::verify_token(&state.jwt_secret, token)?;
    let organization = state.organizations.get(claims.org).await.map_err(|_| {
        // Do not reveal whether the org exists to holders of stale tokens.
        AppError::Unauthorized("Invalid token".to_string())
    })?;

    Ok(OrgContext {
        organization_id: organization.id,
        organization,
        role: claims.role,
        auth_method: AuthMethod::Jwt,
    })
}
