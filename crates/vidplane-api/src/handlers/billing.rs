//! Plan changes and billing-provider webhooks.

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use vidplane_core::models::{Organization, OrganizationStatus, SubscriptionPlan, UNLIMITED};
use vidplane_core::AppError;

use crate::auth::models::OrgContext;
use crate::error::HttpAppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePlanRequest {
    #[schema(example = "starter")]
    pub plan: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChangePlanResponse {
    pub organization: Organization,
}

/// Verify the webhook signature header against the raw body.
fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> Result<(), AppError> {
    let expected = hex::decode(signature_hex)
        .map_err(|_| AppError::Unauthorized("Malformed webhook signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    if computed.ct_eq(expected.as_slice()).into() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Webhook signature mismatch".to_string(),
        ))
    }
}

/// Whether an organization's current usage fits within `plan`'s limits.
/// Used as the downgrade guard before switching.
fn usage_fits_plan(
    plan: SubscriptionPlan,
    videos_uploaded: i64,
    minutes_processed: f64,
    storage_bytes: i64,
) -> Option<String> {
    let limits = plan.limits();

    if limits.videos_per_month != UNLIMITED && videos_uploaded > limits.videos_per_month {
        return Some(format!(
            "{} videos uploaded this month exceeds the {} plan limit of {}",
            videos_uploaded,
            plan.as_str(),
            limits.videos_per_month
        ));
    }
    if limits.minutes_per_month != UNLIMITED && minutes_processed > limits.minutes_per_month as f64
    {
        return Some(format!(
            "{:.1} minutes processed this month exceeds the {} plan limit of {}",
            minutes_processed,
            plan.as_str(),
            limits.minutes_per_month
        ));
    }
    if limits.storage_gb != UNLIMITED && storage_bytes > limits.storage_limit_bytes() {
        return Some(format!(
            "{} bytes stored exceeds the {} plan limit of {} bytes",
            storage_bytes,
            plan.as_str(),
            limits.storage_limit_bytes()
        ));
    }
    None
}

#[utoipa::path(
    post,
    path = "/api/billing/change-plan",
    request_body = ChangePlanRequest,
    responses(
        (status = 200, description = "Plan changed", body = ChangePlanResponse),
        (status = 400, description = "Unknown plan or usage exceeds target limits"),
        (status = 403, description = "Owner role required")
    ),
    security(("bearer_auth" = [])),
    tag = "billing"
)]
pub async fn change_plan(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Json(payload): Json<ChangePlanRequest>,
) -> Result<Json<ChangePlanResponse>, HttpAppError> {
    if !ctx.is_owner() {
        return Err(AppError::Forbidden("Owner role required".to_string()).into());
    }

    let target = SubscriptionPlan::parse(&payload.plan)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown plan '{}'", payload.plan)))?;

    let usage = state.usage.get_or_create(ctx.organization_id).await?;
    if let Some(reason) = usage_fits_plan(
        target,
        usage.videos_uploaded as i64,
        usage.minutes_processed,
        usage.storage_bytes,
    ) {
        return Err(AppError::BadRequest(format!(
            "Cannot switch plans: {}",
            reason
        ))
        .into());
    }

    let organization = state
        .organizations
        .update_plan(ctx.organization_id, target)
        .await?;

    tracing::info!(
        organization_id = %ctx.organization_id,
        plan = %organization.plan,
        "Plan changed"
    );
    Ok(Json(ChangePlanResponse { organization }))
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub customer_id: String,
    pub plan: Option<String>,
    /// Present on `customer_created`, which links a provider customer to
    /// an organization; later events carry only the customer id.
    pub organization_id: Option<uuid::Uuid>,
    pub subscription_id: Option<String>,
}

/// Billing provider webhook: HMAC-signed, unauthenticated otherwise.
#[utoipa::path(
    post,
    path = "/api/billing/webhook",
    request_body(content = String, description = "Raw webhook payload"),
    responses(
        (status = 200, description = "Event applied"),
        (status = 401, description = "Missing or invalid signature")
    ),
    tag = "billing"
)]
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HttpAppError> {
    let signature = headers
        .get("X-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Signature header".to_string()))?;

    verify_signature(&state.config.billing_webhook_secret, &body, signature)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Malformed webhook body: {}", e)))?;

    // customer_created is the one event that arrives before the customer
    // id is on any organization row; it carries our id instead.
    if event.event_type == "customer_created" {
        let org_id = event
            .data
            .organization_id
            .ok_or_else(|| AppError::InvalidInput("Missing organization_id in event".to_string()))?;
        state
            .organizations
            .update_billing_refs(
                org_id,
                Some(&event.data.customer_id),
                event.data.subscription_id.as_deref(),
            )
            .await?;
        tracing::info!(
            organization_id = %org_id,
            customer_id = %event.data.customer_id,
            "Billing customer linked"
        );
        return Ok(StatusCode::OK);
    }

    let organization = state
        .organizations
        .get_by_billing_customer(&event.data.customer_id)
        .await?;

    match event.event_type.as_str() {
        "payment_failed" => {
            state
                .organizations
                .update_status(organization.id, OrganizationStatus::Suspended)
                .await?;
            tracing::warn!(organization_id = %organization.id, "Organization suspended after failed payment");
        }
        "payment_succeeded" => {
            state
                .organizations
                .update_status(organization.id, OrganizationStatus::Active)
                .await?;
        }
        "subscription_updated" => {
            let plan_name = event
                .data
                .plan
                .as_deref()
                .ok_or_else(|| AppError::InvalidInput("Missing plan in event".to_string()))?;
            let plan = SubscriptionPlan::parse(plan_name)
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown plan '{}'", plan_name)))?;
            state.organizations.update_plan(organization.id, plan).await?;
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring unhandled billing event");
        }
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"type":"payment_failed","data":{"customer_id":"cus_1"}}"#;
        let sig = sign("whsec_test", body);
        assert!(verify_signature("whsec_test", body, &sig).is_ok());
    }

    #[test]
    fn test_signature_mismatch_rejected() {
        let body = b"payload";
        let sig = sign("whsec_test", body);
        assert!(verify_signature("whsec_other", body, &sig).is_err());
        assert!(verify_signature("whsec_test", b"tampered", &sig).is_err());
        assert!(verify_signature("whsec_test", body, "not-hex").is_err());
    }

    #[test]
    fn test_customer_created_event_shape() {
        let body = br#"{
            "type": "customer_created",
            "data": {
                "customer_id": "cus_1",
                "organization_id": "7b7e4f6e-1d2b-4a4e-9a1a-0c8f6d1e2b3c",
                "subscription_id": "sub_1"
            }
        }"#;
        let event: WebhookEvent = serde_json::from_slice(body).unwrap();
        assert_eq!(event.event_type, "customer_created");
        assert_eq!(event.data.customer_id, "cus_1");
        assert!(event.data.organization_id.is_some());
        assert_eq!(event.data.subscription_id.as_deref(), Some("sub_1"));

        // later events omit the linkage fields
        let body = br#"{"type":"payment_failed","data":{"customer_id":"cus_1"}}"#;
        let event: WebhookEvent = serde_json::from_slice(body).unwrap();
        assert!(event.data.organization_id.is_none());
        assert!(event.data.plan.is_none());
    }

    #[test]
    fn test_downgrade_guard() {
        // 50 videos does not fit free (10) but fits starter (100)
        assert!(usage_fits_plan(SubscriptionPlan::Free, 50, 0.0, 0).is_some());
        assert!(usage_fits_plan(SubscriptionPlan::Starter, 50, 0.0, 0).is_none());

        // storage over the free 5 GB cap
        let six_gb = 6 * vidplane_core::models::BYTES_PER_GB;
        assert!(usage_fits_plan(SubscriptionPlan::Free, 1, 0.0, six_gb).is_some());

        // enterprise always fits
        assert!(usage_fits_plan(SubscriptionPlan::Enterprise, 10_000, 1e9, i64::MAX / 2).is_none());
    }
}
