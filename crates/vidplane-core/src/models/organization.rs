use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::plan::SubscriptionPlan;

/// Account status, toggled by billing webhooks. Organizations are never
/// hard-deleted in the normal flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, sqlx::Type)]
#[sqlx(type_name = "organization_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Suspended,
}

/// The tenant boundary. Owns videos, API keys, and usage records.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub contact_email: String,
    pub plan: SubscriptionPlan,
    pub status: OrganizationStatus,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn is_active(&self) -> bool {
        self.status == OrganizationStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active() {
        let now = Utc::now();
        let mut org = Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            contact_email: "ops@acme.example".to_string(),
            plan: SubscriptionPlan::Free,
            status: OrganizationStatus::Active,
            billing_customer_id: None,
            billing_subscription_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(org.is_active());
        org.status = OrganizationStatus::Suspended;
        assert!(!org.is_active());
    }
}
