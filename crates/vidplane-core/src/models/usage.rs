//! Per-organization, per-month usage counters backing quota enforcement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::plan::{PlanLimits, SubscriptionPlan};

/// Calendar-month key for the usage ledger, e.g. "2026-08".
pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// One ledger row per (organization, calendar month). Uniqueness on the
/// pair is a database constraint; rows are created lazily on first access.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct UsageRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub month: String,
    pub videos_uploaded: i32,
    pub minutes_processed: f64,
    pub storage_bytes: i64,
    pub api_calls: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a quota check. `reason` is set when `allowed` is false.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotaDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl QuotaDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Read-only usage projection for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsageSnapshot {
    pub month: String,
    pub plan: SubscriptionPlan,
    pub videos_uploaded: i32,
    pub minutes_processed: f64,
    pub storage_bytes: i64,
    pub api_calls: i32,
    pub limits: PlanLimits,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_key_format() {
        let at = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        assert_eq!(month_key(at), "2026-08");
    }

    #[test]
    fn test_month_key_zero_pads() {
        let at = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(month_key(at), "2027-01");
    }

    #[test]
    fn test_quota_decision_deny_carries_reason() {
        let decision = QuotaDecision::deny("Monthly video limit reached (10/10)");
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("limit reached"));
    }
}
