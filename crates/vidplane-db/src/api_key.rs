use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vidplane_core::AppError;

/// Stored API key. Only the argon2 hash and a short lookup prefix are
/// persisted; the full key is shown to the caller once at creation time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<ApiKey, AppError> {
        let key = sqlx::query_as::<Postgres, ApiKey>(
            r#"
            INSERT INTO api_keys (id, organization_id, name, key_prefix, key_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .bind(key_prefix)
        .bind(key_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, organization_id = %organization_id, "Failed to create API key");
            AppError::Database(e)
        })?;

        tracing::info!(api_key_id = %key.id, organization_id = %organization_id, "API key created");
        Ok(key)
    }

    /// Fetch candidate keys for a lookup prefix. Prefixes are not unique,
    /// so the caller verifies each candidate's hash.
    pub async fn find_active_by_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKey>, AppError> {
        sqlx::query_as::<Postgres, ApiKey>(
            "SELECT * FROM api_keys WHERE key_prefix = $1 AND revoked_at IS NULL",
        )
        .bind(key_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_for_org(&self, organization_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        sqlx::query_as::<Postgres, ApiKey>(
            "SELECT * FROM api_keys WHERE organization_id = $1 ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn touch_last_used(&self, key_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn revoke(&self, organization_id: Uuid, key_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET revoked_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(key_id)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("API key not found".to_string()));
        }

        tracing::info!(api_key_id = %key_id, organization_id = %organization_id, "API key revoked");
        Ok(())
    }
}
