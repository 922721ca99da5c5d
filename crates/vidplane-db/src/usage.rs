use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vidplane_core::models::{month_key, Organization, QuotaDecision, UsageRecord, UsageSnapshot};
use vidplane_core::AppError;

/// Per-organization, per-month usage ledger.
///
/// Counters only ever move through this repository. The upload counters are
/// advanced by a single conditional UPDATE so two concurrent uploads can
/// never both pass a nearly-exhausted quota.
#[derive(Clone)]
pub struct UsageRepository {
    pool: PgPool,
}

impl UsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the current month's record, creating a zeroed row if this is
    /// the organization's first activity this month.
    pub async fn get_or_create(&self, organization_id: Uuid) -> Result<UsageRecord, AppError> {
        let month = month_key(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO usage_records (id, organization_id, month)
            VALUES ($1, $2, $3)
            ON CONFLICT (organization_id, month) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(&month)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        sqlx::query_as::<Postgres, UsageRecord>(
            "SELECT * FROM usage_records WHERE organization_id = $1 AND month = $2",
        )
        .bind(organization_id)
        .bind(&month)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Advisory check for the monthly upload count. The authoritative gate
    /// is `try_record_upload`; this exists to produce a precise rejection
    /// message before any bytes are accepted.
    pub async fn can_upload_video(&self, org: &Organization) -> Result<QuotaDecision, AppError> {
        let usage = self.get_or_create(org.id).await?;
        let limits = org.plan.limits();

        if limits.allows_upload(usage.videos_uploaded as i64) {
            Ok(QuotaDecision::allow())
        } else {
            Ok(QuotaDecision::deny(format!(
                "Monthly video limit reached ({} of {} this month)",
                usage.videos_uploaded, limits.videos_per_month
            )))
        }
    }

    /// Advisory check for storage capacity, mirroring `can_upload_video`.
    pub async fn has_storage_capacity(
        &self,
        org: &Organization,
        additional_bytes: i64,
    ) -> Result<QuotaDecision, AppError> {
        let usage = self.get_or_create(org.id).await?;
        let limits = org.plan.limits();

        if limits.allows_storage(usage.storage_bytes, additional_bytes) {
            Ok(QuotaDecision::allow())
        } else {
            Ok(QuotaDecision::deny(format!(
                "Storage limit reached ({} of {} bytes used, {} more requested)",
                usage.storage_bytes,
                limits.storage_limit_bytes(),
                additional_bytes
            )))
        }
    }

    /// Atomically claim one upload slot and `file_size` bytes of storage.
    ///
    /// Both quota conditions are evaluated inside the UPDATE itself, so the
    /// check and the increment are one statement and concurrent uploads
    /// serialize on the row lock. Returns false when either quota would be
    /// exceeded; a -1 limit means unlimited.
    pub async fn try_record_upload(
        &self,
        org: &Organization,
        file_size: i64,
    ) -> Result<bool, AppError> {
        // Row must exist before the conditional UPDATE can match it.
        self.get_or_create(org.id).await?;

        let limits = org.plan.limits();
        let month = month_key(Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE usage_records
            SET videos_uploaded = videos_uploaded + 1,
                storage_bytes = storage_bytes + $3,
                updated_at = NOW()
            WHERE organization_id = $1
              AND month = $2
              AND ($4 = -1 OR videos_uploaded < $4)
              AND ($5 = -1 OR storage_bytes + $3 <= $5)
            "#,
        )
        .bind(org.id)
        .bind(&month)
        .bind(file_size)
        .bind(limits.videos_per_month)
        .bind(limits.storage_limit_bytes())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let claimed = result.rows_affected() == 1;
        if !claimed {
            tracing::warn!(
                organization_id = %org.id,
                plan = %org.plan,
                file_size_bytes = file_size,
                "Upload rejected by quota gate"
            );
        }
        Ok(claimed)
    }

    /// Undo a `try_record_upload` claim when the upload fails after the
    /// counters were advanced (storage write or row insert failed).
    pub async fn release_upload(&self, organization_id: Uuid, file_size: i64) -> Result<(), AppError> {
        let month = month_key(Utc::now());

        sqlx::query(
            r#"
            UPDATE usage_records
            SET videos_uploaded = GREATEST(videos_uploaded - 1, 0),
                storage_bytes = GREATEST(storage_bytes - $3, 0),
                updated_at = NOW()
            WHERE organization_id = $1 AND month = $2
            "#,
        )
        .bind(organization_id)
        .bind(&month)
        .bind(file_size)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    /// Account for transcoded renditions landing in storage. Unlike the
    /// upload gate this is unconditional: the bytes already exist by the
    /// time the pipeline reports them.
    pub async fn record_transcoded_bytes(
        &self,
        organization_id: Uuid,
        bytes: i64,
    ) -> Result<(), AppError> {
        self.get_or_create(organization_id).await?;
        let month = month_key(Utc::now());

        sqlx::query(
            r#"
            UPDATE usage_records
            SET storage_bytes = storage_bytes + $3,
                updated_at = NOW()
            WHERE organization_id = $1 AND month = $2
            "#,
        )
        .bind(organization_id)
        .bind(&month)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    /// Credit processing time against the monthly minutes counter.
    pub async fn record_processed_minutes(
        &self,
        organization_id: Uuid,
        seconds: f64,
    ) -> Result<(), AppError> {
        self.get_or_create(organization_id).await?;
        let month = month_key(Utc::now());
        let minutes = seconds / 60.0;

        sqlx::query(
            r#"
            UPDATE usage_records
            SET minutes_processed = minutes_processed + $3,
                updated_at = NOW()
            WHERE organization_id = $1 AND month = $2
            "#,
        )
        .bind(organization_id)
        .bind(&month)
        .bind(minutes)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    /// Return `bytes` of storage to the organization's quota.
    ///
    /// The counter is clamped at zero rather than allowed to go negative;
    /// a clamp firing means the ledger disagrees with the files on disk,
    /// which is logged loudly but does not fail the deletion.
    pub async fn record_deletion(&self, organization_id: Uuid, bytes: i64) -> Result<(), AppError> {
        self.get_or_create(organization_id).await?;
        let month = month_key(Utc::now());

        let previous: Option<i64> = sqlx::query_scalar(
            r#"
            WITH before AS (
                SELECT storage_bytes FROM usage_records
                WHERE organization_id = $1 AND month = $2
                FOR UPDATE
            )
            UPDATE usage_records
            SET storage_bytes = GREATEST(storage_bytes - $3, 0),
                updated_at = NOW()
            WHERE organization_id = $1 AND month = $2
            RETURNING (SELECT storage_bytes FROM before)
            "#,
        )
        .bind(organization_id)
        .bind(&month)
        .bind(bytes)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if let Some(previous) = previous {
            if previous < bytes {
                tracing::warn!(
                    organization_id = %organization_id,
                    previous_bytes = previous,
                    freed_bytes = bytes,
                    "Storage counter clamped at zero; ledger was below the freed size"
                );
            }
        }
        Ok(())
    }

    pub async fn record_api_call(&self, organization_id: Uuid) -> Result<(), AppError> {
        self.get_or_create(organization_id).await?;
        let month = month_key(Utc::now());

        sqlx::query(
            r#"
            UPDATE usage_records
            SET api_calls = api_calls + 1, updated_at = NOW()
            WHERE organization_id = $1 AND month = $2
            "#,
        )
        .bind(organization_id)
        .bind(&month)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn snapshot(&self, org: &Organization) -> Result<UsageSnapshot, AppError> {
        let usage = self.get_or_create(org.id).await?;
        Ok(UsageSnapshot {
            month: usage.month,
            plan: org.plan,
            videos_uploaded: usage.videos_uploaded,
            minutes_processed: usage.minutes_processed,
            storage_bytes: usage.storage_bytes,
            api_calls: usage.api_calls,
            limits: org.plan.limits(),
        })
    }
}
