use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vidplane_core::models::{Organization, OrganizationStatus, SubscriptionPlan};
use vidplane_core::AppError;

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new organization on the given plan.
    pub async fn create(
        &self,
        name: &str,
        contact_email: &str,
        plan: SubscriptionPlan,
    ) -> Result<Organization, AppError> {
        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            INSERT INTO organizations (id, name, contact_email, plan, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(contact_email)
        .bind(plan)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create organization");
            AppError::Database(e)
        })?;

        tracing::info!(organization_id = %org.id, plan = %org.plan, "Organization created");
        Ok(org)
    }

    pub async fn get(&self, org_id: Uuid) -> Result<Organization, AppError> {
        sqlx::query_as::<Postgres, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::OrganizationNotFound("Organization not found".to_string()))
    }

    pub async fn update_plan(
        &self,
        org_id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<Organization, AppError> {
        sqlx::query_as::<Postgres, Organization>(
            "UPDATE organizations SET plan = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(org_id)
        .bind(plan)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::OrganizationNotFound("Organization not found".to_string()))
    }

    pub async fn update_status(
        &self,
        org_id: Uuid,
        status: OrganizationStatus,
    ) -> Result<Organization, AppError> {
        sqlx::query_as::<Postgres, Organization>(
            "UPDATE organizations SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(org_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::OrganizationNotFound("Organization not found".to_string()))
    }

    /// Attach billing provider references after checkout.
    pub async fn update_billing_refs(
        &self,
        org_id: Uuid,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
    ) -> Result<Organization, AppError> {
        sqlx::query_as::<Postgres, Organization>(
            r#"
            UPDATE organizations
            SET billing_customer_id = $2,
                billing_subscription_id = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(customer_id)
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::OrganizationNotFound("Organization not found".to_string()))
    }

    pub async fn get_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Organization, AppError> {
        sqlx::query_as::<Postgres, Organization>(
            "SELECT * FROM organizations WHERE billing_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::OrganizationNotFound("Organization not found".to_string()))
    }
}
