//! Video upload: validate, claim quota, store, record, enqueue.

use axum::{
    extract::{Extension, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use vidplane_core::models::VideoResponse;
use vidplane_core::AppError;
use vidplane_processing::validate_upload;
use vidplane_storage::keys;

use crate::auth::models::OrgContext;
use crate::error::HttpAppError;
use crate::job_queue::TranscodeJob;
use crate::state::AppState;

/// Accept a multipart upload (field `video`), gate it against the plan
/// quotas, persist it, and enqueue processing. Returns immediately with
/// the pending record; processing errors never surface here.
#[utoipa::path(
    post,
    path = "/api/videos/upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Upload accepted, processing queued", body = VideoResponse),
        (status = 400, description = "Validation failed"),
        (status = 413, description = "File exceeds size limit"),
        (status = 429, description = "Plan quota exceeded")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<VideoResponse>), HttpAppError> {
    let (filename, data) = read_video_field(&mut multipart).await?;

    // Everything below is gated on validation passing; a rejected file
    // leaves no row and no ledger change.
    let validated = validate_upload(
        &filename,
        data.len() as u64,
        &state.config.allowed_video_extensions,
        state.config.max_upload_size_bytes as u64,
    )?;
    let file_size = data.len() as i64;

    // Friendly checks first for a precise rejection reason.
    let decision = state.usage.can_upload_video(&ctx.organization).await?;
    if !decision.allowed {
        return Err(AppError::QuotaExceeded(
            decision.reason.unwrap_or_else(|| "Monthly video limit reached".to_string()),
        )
        .into());
    }
    let decision = state
        .usage
        .has_storage_capacity(&ctx.organization, file_size)
        .await?;
    if !decision.allowed {
        return Err(AppError::QuotaExceeded(
            decision.reason.unwrap_or_else(|| "Storage limit reached".to_string()),
        )
        .into());
    }

    // Authoritative gate: the conditional increment closes the race the
    // checks above cannot.
    if !state.usage.try_record_upload(&ctx.organization, file_size).await? {
        return Err(AppError::QuotaExceeded(
            "Plan limit reached for this month".to_string(),
        )
        .into());
    }

    let video_id = Uuid::new_v4();
    let storage_key = keys::original_key(ctx.organization_id, video_id, &validated.extension);

    if let Err(e) = state.storage.upload(&storage_key, data).await {
        let release = state.usage.release_upload(ctx.organization_id, file_size).await;
        return Err(compensation_error(e.into(), release, ctx.organization_id));
    }

    let video = match state
        .videos
        .create(
            ctx.organization_id,
            video_id,
            &validated.filename,
            &storage_key,
            file_size,
            validated.content_type,
        )
        .await
    {
        Ok(video) => video,
        Err(e) => {
            // Compensate: remove the stored file and return the quota.
            if let Err(cleanup_err) = state.storage.delete(&storage_key).await {
                tracing::error!(key = %storage_key, error = %cleanup_err, "Failed to clean up orphaned upload");
            }
            let release = state.usage.release_upload(ctx.organization_id, file_size).await;
            return Err(compensation_error(e.into(), release, ctx.organization_id));
        }
    };

    if let Err(e) = state
        .job_queue
        .submit(TranscodeJob::ProcessVideo { video_id: video.id })
    {
        // The upload itself succeeded; the video stays pending.
        tracing::warn!(video_id = %video.id, error = %e, "Upload accepted but processing not queued");
    }

    tracing::info!(
        video_id = %video.id,
        organization_id = %ctx.organization_id,
        file_size_bytes = file_size,
        "Video upload accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(VideoResponse::from(video))))
}

/// The caller's failure is what the client must see; a failed
/// compensating decrement is logged but never shadows it.
fn compensation_error(
    original: HttpAppError,
    release: Result<(), AppError>,
    organization_id: Uuid,
) -> HttpAppError {
    if let Err(release_err) = release {
        tracing::error!(
            organization_id = %organization_id,
            error = %release_err,
            "Failed to release quota after upload failure"
        );
    }
    original
}

/// Pull the `video` field out of the multipart body.
async fn read_video_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), HttpAppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        HttpAppError(AppError::BadRequest(format!("Malformed multipart body: {}", e)))
    })? {
        if field.name() != Some("video") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput("Missing filename".to_string()))?;

        let data = field.bytes().await.map_err(|e| {
            HttpAppError(AppError::BadRequest(format!("Failed to read upload: {}", e)))
        })?;

        return Ok((filename, data.to_vec()));
    }

    Err(AppError::InvalidInput("Missing multipart field 'video'".to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_failure_keeps_original_error() {
        let original = HttpAppError(AppError::Storage("disk full".to_string()));
        let err = compensation_error(
            original,
            Err(AppError::Internal("ledger unavailable".to_string())),
            Uuid::new_v4(),
        );
        assert!(matches!(err.0, AppError::Storage(_)));
    }

    #[test]
    fn test_successful_release_keeps_original_error() {
        let original = HttpAppError(AppError::BadRequest("bad row".to_string()));
        let err = compensation_error(original, Ok(()), Uuid::new_v4());
        assert!(matches!(err.0, AppError::BadRequest(_)));
    }
}
