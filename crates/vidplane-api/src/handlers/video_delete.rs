//! Video deletion: files first, then the row, then the ledger.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;
use vidplane_storage::keys;

use crate::auth::models::OrgContext;
use crate::error::HttpAppError;
use crate::state::AppState;

#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path(video_id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    // Scoped fetch first so cross-tenant ids 404 before anything happens.
    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;
    let variants = state.videos.list_variants(video.id).await?;

    let freed_bytes =
        video.file_size + variants.iter().filter_map(|v| v.file_size).sum::<i64>();

    // Remove the whole key prefix: original, thumbnail, playlists, segments.
    let prefix = keys::video_prefix(ctx.organization_id, video.id);
    state.storage.delete_prefix(&prefix).await?;

    state
        .videos
        .delete_cascade(ctx.organization_id, video.id)
        .await?;
    state
        .usage
        .record_deletion(ctx.organization_id, freed_bytes)
        .await?;

    tracing::info!(
        video_id = %video.id,
        organization_id = %ctx.organization_id,
        freed_bytes = freed_bytes,
        "Video deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
