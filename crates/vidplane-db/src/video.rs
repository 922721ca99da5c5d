use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vidplane_core::models::{TranscodedVideo, VariantStatus, Video, VideoStatus};
use vidplane_core::AppError;

/// Video records and their per-resolution transcode variants.
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new video in `pending` status.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        video_id: Uuid,
        original_filename: &str,
        storage_key: &str,
        file_size: i64,
        content_type: &str,
    ) -> Result<Video, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            INSERT INTO videos (id, organization_id, original_filename, storage_key,
                                file_size, content_type, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *
            "#,
        )
        .bind(video_id)
        .bind(organization_id)
        .bind(original_filename)
        .bind(storage_key)
        .bind(file_size)
        .bind(content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, video_id = %video_id, "Failed to create video record");
            AppError::Database(e)
        })?;

        Ok(video)
    }

    pub async fn list_for_org(&self, organization_id: Uuid) -> Result<Vec<Video>, AppError> {
        sqlx::query_as::<Postgres, Video>(
            "SELECT * FROM videos WHERE organization_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Tenant-scoped fetch; a video belonging to another organization is
    /// indistinguishable from a missing one.
    pub async fn get_for_org(
        &self,
        organization_id: Uuid,
        video_id: Uuid,
    ) -> Result<Video, AppError> {
        sqlx::query_as::<Postgres, Video>(
            "SELECT * FROM videos WHERE id = $1 AND organization_id = $2",
        )
        .bind(video_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    /// Unscoped fetch for the transcode pipeline, which only ever holds ids
    /// it created itself.
    pub async fn get(&self, video_id: Uuid) -> Result<Video, AppError> {
        sqlx::query_as::<Postgres, Video>("SELECT * FROM videos WHERE id = $1")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    /// Advance the processing state machine by one step.
    ///
    /// The transition is validated against the current status, and the
    /// UPDATE re-checks that status so a concurrent writer cannot sneak a
    /// state change in between.
    pub async fn transition_status(
        &self,
        video_id: Uuid,
        to: VideoStatus,
    ) -> Result<Video, AppError> {
        let current = self.get(video_id).await?;

        if !current.status.can_transition(to) {
            return Err(AppError::InvalidStatusTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }

        let updated = sqlx::query_as::<Postgres, Video>(
            r#"
            UPDATE videos
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(video_id)
        .bind(to)
        .bind(current.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::InvalidStatusTransition {
            from: current.status.to_string(),
            to: to.to_string(),
        })?;

        tracing::debug!(video_id = %video_id, from = %current.status, to = %to, "Video status transition");
        Ok(updated)
    }

    /// Move a video to `failed` with an operator-facing message. Valid from
    /// any non-terminal status; a no-op if the video already finished.
    pub async fn mark_failed(&self, video_id: Uuid, message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE videos
            SET status = 'failed', error_message = $2, updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(video_id)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        tracing::warn!(video_id = %video_id, message = %message, "Video marked failed");
        Ok(())
    }

    /// Record probed media properties and/or the thumbnail key. Fields left
    /// as `None` keep their current value; status is not touched.
    pub async fn update_streaming_info(
        &self,
        video_id: Uuid,
        thumbnail_key: Option<&str>,
        duration: Option<f64>,
        width: Option<i32>,
        height: Option<i32>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE videos
            SET thumbnail_key = COALESCE($2, thumbnail_key),
                duration = COALESCE($3, duration),
                width = COALESCE($4, width),
                height = COALESCE($5, height),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(video_id)
        .bind(thumbnail_key)
        .bind(duration)
        .bind(width)
        .bind(height)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn set_hls_master_playlist(
        &self,
        video_id: Uuid,
        playlist_key: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE videos SET hls_master_playlist = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(video_id)
        .bind(playlist_key)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    /// Insert or update the variant row for one resolution of a video.
    /// Output fields are only overwritten when the new value is present.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_variant(
        &self,
        video_id: Uuid,
        resolution: &str,
        status: VariantStatus,
        storage_key: Option<&str>,
        file_size: Option<i64>,
        bitrate_kbps: Option<i32>,
        codec: Option<&str>,
    ) -> Result<TranscodedVideo, AppError> {
        sqlx::query_as::<Postgres, TranscodedVideo>(
            r#"
            INSERT INTO transcoded_videos (id, video_id, resolution, status,
                                           storage_key, file_size, bitrate_kbps, codec)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (video_id, resolution) DO UPDATE
            SET status = EXCLUDED.status,
                storage_key = COALESCE(EXCLUDED.storage_key, transcoded_videos.storage_key),
                file_size = COALESCE(EXCLUDED.file_size, transcoded_videos.file_size),
                bitrate_kbps = COALESCE(EXCLUDED.bitrate_kbps, transcoded_videos.bitrate_kbps),
                codec = COALESCE(EXCLUDED.codec, transcoded_videos.codec),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(video_id)
        .bind(resolution)
        .bind(status)
        .bind(storage_key)
        .bind(file_size)
        .bind(bitrate_kbps)
        .bind(codec)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_variants(&self, video_id: Uuid) -> Result<Vec<TranscodedVideo>, AppError> {
        sqlx::query_as::<Postgres, TranscodedVideo>(
            "SELECT * FROM transcoded_videos WHERE video_id = $1 ORDER BY resolution",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Delete a video row; variant rows follow via ON DELETE CASCADE.
    /// Returns the deleted record so the caller can release storage quota.
    pub async fn delete_cascade(
        &self,
        organization_id: Uuid,
        video_id: Uuid,
    ) -> Result<Video, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            "DELETE FROM videos WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(video_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

        tracing::info!(video_id = %video_id, organization_id = %organization_id, "Video deleted");
        Ok(video)
    }
}
