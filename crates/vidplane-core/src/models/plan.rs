//! Static subscription plan catalog.
//!
//! Plans are defined in code, not persisted: billing webhooks only move an
//! organization between catalog entries. Numeric limits use `-1` as the
//! "unlimited" sentinel.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sentinel meaning "no limit" for any numeric plan limit.
pub const UNLIMITED: i64 = -1;

/// 2^30 bytes, the unit for the storage limit.
pub const BYTES_PER_GB: i64 = 1 << 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, sqlx::Type)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionPlan::Free),
            "starter" => Some(SubscriptionPlan::Starter),
            "pro" => Some(SubscriptionPlan::Pro),
            "enterprise" => Some(SubscriptionPlan::Enterprise),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "Free",
            SubscriptionPlan::Starter => "Starter",
            SubscriptionPlan::Pro => "Pro",
            SubscriptionPlan::Enterprise => "Enterprise",
        }
    }

    pub fn monthly_price_cents(&self) -> i64 {
        match self {
            SubscriptionPlan::Free => 0,
            SubscriptionPlan::Starter => 2900,
            SubscriptionPlan::Pro => 9900,
            SubscriptionPlan::Enterprise => 49900,
        }
    }

    pub fn limits(&self) -> PlanLimits {
        match self {
            SubscriptionPlan::Free => PlanLimits {
                videos_per_month: 10,
                minutes_per_month: 60,
                storage_gb: 5,
                api_calls_per_month: 10_000,
                max_team_members: 2,
                allowed_resolutions: &["720p"],
                support_tier: "community",
            },
            SubscriptionPlan::Starter => PlanLimits {
                videos_per_month: 100,
                minutes_per_month: 600,
                storage_gb: 50,
                api_calls_per_month: 100_000,
                max_team_members: 5,
                allowed_resolutions: &["720p", "1080p"],
                support_tier: "email",
            },
            SubscriptionPlan::Pro => PlanLimits {
                videos_per_month: 1000,
                minutes_per_month: 6000,
                storage_gb: 500,
                api_calls_per_month: 1_000_000,
                max_team_members: 20,
                allowed_resolutions: &["720p", "1080p"],
                support_tier: "priority",
            },
            SubscriptionPlan::Enterprise => PlanLimits {
                videos_per_month: UNLIMITED,
                minutes_per_month: UNLIMITED,
                storage_gb: UNLIMITED,
                api_calls_per_month: UNLIMITED,
                max_team_members: UNLIMITED,
                allowed_resolutions: &["720p", "1080p"],
                support_tier: "dedicated",
            },
        }
    }

    pub fn all() -> &'static [SubscriptionPlan] {
        &[
            SubscriptionPlan::Free,
            SubscriptionPlan::Starter,
            SubscriptionPlan::Pro,
            SubscriptionPlan::Enterprise,
        ]
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource limits for a subscription plan. `-1` means unlimited.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanLimits {
    pub videos_per_month: i64,
    pub minutes_per_month: i64,
    pub storage_gb: i64,
    pub api_calls_per_month: i64,
    pub max_team_members: i64,
    pub allowed_resolutions: &'static [&'static str],
    pub support_tier: &'static str,
}

impl PlanLimits {
    /// Storage limit in bytes, or `UNLIMITED`.
    pub fn storage_limit_bytes(&self) -> i64 {
        if self.storage_gb == UNLIMITED {
            UNLIMITED
        } else {
            self.storage_gb * BYTES_PER_GB
        }
    }

    /// Whether one more video upload is allowed at the given monthly count.
    pub fn allows_upload(&self, current_videos: i64) -> bool {
        self.videos_per_month == UNLIMITED || current_videos < self.videos_per_month
    }

    /// Whether `additional_bytes` more storage fits under the plan limit.
    pub fn allows_storage(&self, current_bytes: i64, additional_bytes: i64) -> bool {
        self.storage_gb == UNLIMITED
            || current_bytes + additional_bytes <= self.storage_limit_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_always_allows_uploads() {
        let limits = SubscriptionPlan::Enterprise.limits();
        assert!(limits.allows_upload(0));
        assert!(limits.allows_upload(i64::MAX - 1));
    }

    #[test]
    fn test_free_plan_upload_boundary() {
        let limits = SubscriptionPlan::Free.limits();
        assert_eq!(limits.videos_per_month, 10);
        assert!(limits.allows_upload(9));
        assert!(!limits.allows_upload(10));
        assert!(!limits.allows_upload(11));
    }

    #[test]
    fn test_storage_boundary_is_exact() {
        // allowed iff current + additional <= limit_gb * 2^30
        let limits = SubscriptionPlan::Free.limits();
        let limit_bytes = 5 * BYTES_PER_GB;
        assert_eq!(limits.storage_limit_bytes(), limit_bytes);
        assert!(limits.allows_storage(limit_bytes - 100, 100));
        assert!(!limits.allows_storage(limit_bytes - 100, 101));
        assert!(limits.allows_storage(0, limit_bytes));
    }

    #[test]
    fn test_unlimited_storage() {
        let limits = SubscriptionPlan::Enterprise.limits();
        assert_eq!(limits.storage_limit_bytes(), UNLIMITED);
        assert!(limits.allows_storage(i64::MAX / 2, i64::MAX / 4));
    }

    #[test]
    fn test_plan_parse_round_trip() {
        for plan in SubscriptionPlan::all() {
            assert_eq!(SubscriptionPlan::parse(plan.as_str()), Some(*plan));
        }
        assert_eq!(SubscriptionPlan::parse("platinum"), None);
    }

    #[test]
    fn test_free_plan_has_no_1080p() {
        let limits = SubscriptionPlan::Free.limits();
        assert!(!limits.allowed_resolutions.contains(&"1080p"));
        assert!(limits.allowed_resolutions.contains(&"720p"));
    }
}
