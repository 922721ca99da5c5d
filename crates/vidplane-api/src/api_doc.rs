//! OpenAPI document aggregation.

use utoipa::OpenApi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::organizations::create_organization,
        handlers::api_keys::create_key,
        handlers::api_keys::list_keys,
        handlers::api_keys::revoke_key,
        handlers::video_upload::upload_video,
        handlers::video_get::list_videos,
        handlers::video_get::get_video,
        handlers::video_delete::delete_video,
        handlers::video_stream::stream_video,
        handlers::video_stream::variant_playlist,
        handlers::video_stream::variant_segment,
        handlers::video_stream::thumbnail,
        handlers::video_stream::download_video,
        handlers::usage::usage_stats,
        handlers::billing::change_plan,
        handlers::billing::webhook,
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "organizations", description = "Tenant signup"),
        (name = "api-keys", description = "API key management"),
        (name = "videos", description = "Video upload and lifecycle"),
        (name = "streaming", description = "Playback and delivery"),
        (name = "usage", description = "Quota and usage reporting"),
        (name = "billing", description = "Plans and billing events"),
    ),
    info(
        title = "Vidplane API",
        description = "Multi-tenant video upload, transcoding, and streaming"
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
