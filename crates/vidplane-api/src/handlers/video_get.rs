//! Video listing and detail.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use vidplane_core::models::{TranscodedVideo, VideoResponse};

use crate::auth::models::OrgContext;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct VideoDetailResponse {
    #[serde(flatten)]
    pub video: VideoResponse,
    pub variants: Vec<TranscodedVideo>,
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses((status = 200, description = "Videos for the organization", body = [VideoResponse])),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
) -> Result<Json<Vec<VideoResponse>>, HttpAppError> {
    let videos = state.videos.list_for_org(ctx.organization_id).await?;
    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video with its transcode variants", body = VideoDetailResponse),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<VideoDetailResponse>, HttpAppError> {
    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;
    let variants = state.videos.list_variants(video.id).await?;

    Ok(Json(VideoDetailResponse {
        video: VideoResponse::from(video),
        variants,
    }))
}
