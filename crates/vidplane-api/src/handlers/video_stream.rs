//! Streaming delivery: HLS playlists and segments, byte-range originals,
//! thumbnails, and downloads.

use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;
use vidplane_core::models::Video;
use vidplane_core::AppError;
use vidplane_storage::keys;

use crate::auth::models::OrgContext;
use crate::error::HttpAppError;
use crate::state::AppState;

const HLS_PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const HLS_SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Parsed `Range` header, inclusive byte positions clamped to the file.
#[derive(Debug, PartialEq, Eq)]
enum RangeRequest {
    /// No Range header: serve the whole file with 200.
    Full,
    /// Satisfiable range: serve 206 with this inclusive slice.
    Slice { start: u64, end: u64 },
    /// Present but unsatisfiable: 416.
    Unsatisfiable,
}

/// Parse a `Range: bytes=start-end` header against a file of `total` bytes.
/// Only single ranges are supported; an unparseable header falls back to
/// the full file, an out-of-bounds one is unsatisfiable.
fn parse_range(header: Option<&str>, total: u64) -> RangeRequest {
    let Some(header) = header else {
        return RangeRequest::Full;
    };
    let Some(spec) = header.strip_prefix("bytes=") else {
        return RangeRequest::Full;
    };
    if total == 0 || spec.contains(',') {
        return RangeRequest::Unsatisfiable;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeRequest::Unsatisfiable;
    };

    match (start_str.is_empty(), end_str.is_empty()) {
        // bytes=start-end
        (false, false) => {
            let (Ok(start), Ok(end)) = (start_str.parse::<u64>(), end_str.parse::<u64>()) else {
                return RangeRequest::Unsatisfiable;
            };
            if start > end || start >= total {
                return RangeRequest::Unsatisfiable;
            }
            RangeRequest::Slice {
                start,
                end: end.min(total - 1),
            }
        }
        // bytes=start-
        (false, true) => {
            let Ok(start) = start_str.parse::<u64>() else {
                return RangeRequest::Unsatisfiable;
            };
            if start >= total {
                return RangeRequest::Unsatisfiable;
            }
            RangeRequest::Slice {
                start,
                end: total - 1,
            }
        }
        // bytes=-suffix
        (true, false) => {
            let Ok(suffix) = end_str.parse::<u64>() else {
                return RangeRequest::Unsatisfiable;
            };
            if suffix == 0 {
                return RangeRequest::Unsatisfiable;
            }
            RangeRequest::Slice {
                start: total.saturating_sub(suffix),
                end: total - 1,
            }
        }
        (true, true) => RangeRequest::Unsatisfiable,
    }
}

/// Segment and variant names come from the URL; anything that could walk
/// out of the video's directory is rejected.
fn is_safe_path_component(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Stream a video: master HLS playlist when transcoding produced one,
/// otherwise the original file with byte-range support.
#[utoipa::path(
    get,
    path = "/api/videos/{id}/stream",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Full content (HLS playlist or original)"),
        (status = 206, description = "Partial content for a Range request"),
        (status = 404, description = "Video not found"),
        (status = 416, description = "Unsatisfiable range")
    ),
    security(("bearer_auth" = [])),
    tag = "streaming"
)]
pub async fn stream_video(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path(video_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;

    if let Some(ref playlist_key) = video.hls_master_playlist {
        if state.storage.exists(playlist_key).await.unwrap_or(false) {
            let data = state.storage.download(playlist_key).await?;
            return Ok((
                [(header::CONTENT_TYPE, HLS_PLAYLIST_CONTENT_TYPE)],
                data,
            )
                .into_response());
        }
        tracing::warn!(video_id = %video.id, key = %playlist_key, "Master playlist missing from storage");
    }

    serve_original_with_ranges(&state, &video, &headers).await
}

async fn serve_original_with_ranges(
    state: &AppState,
    video: &Video,
    headers: &HeaderMap,
) -> Result<Response, HttpAppError> {
    let total = state.storage.content_length(&video.storage_key).await?;
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    match parse_range(range_header, total) {
        RangeRequest::Full => {
            let stream = state.storage.download_stream(&video.storage_key).await?;
            Ok((
                [
                    (header::CONTENT_TYPE, video.content_type.clone()),
                    (header::CONTENT_LENGTH, total.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                Body::from_stream(stream),
            )
                .into_response())
        }
        RangeRequest::Slice { start, end } => {
            let data = state.storage.download_range(&video.storage_key, start, end).await?;
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, video.content_type.clone()),
                    (header::CONTENT_LENGTH, data.len().to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", start, end, total),
                    ),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                data,
            )
                .into_response())
        }
        RangeRequest::Unsatisfiable => Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", total))],
        )
            .into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}/stream/{variant}/index.m3u8",
    params(
        ("id" = Uuid, Path, description = "Video id"),
        ("variant" = String, Path, description = "Resolution label")
    ),
    responses(
        (status = 200, description = "Variant playlist"),
        (status = 404, description = "Video or variant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "streaming"
)]
pub async fn variant_playlist(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path((video_id, variant)): Path<(Uuid, String)>,
) -> Result<Response, HttpAppError> {
    if !is_safe_path_component(&variant) {
        return Err(AppError::BadRequest("Invalid variant name".to_string()).into());
    }

    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;
    let key = keys::variant_playlist_key(ctx.organization_id, video.id, &variant);
    let data = state.storage.download(&key).await?;

    Ok(([(header::CONTENT_TYPE, HLS_PLAYLIST_CONTENT_TYPE)], data).into_response())
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}/stream/{variant}/{segment}",
    params(
        ("id" = Uuid, Path, description = "Video id"),
        ("variant" = String, Path, description = "Resolution label"),
        ("segment" = String, Path, description = "Segment filename")
    ),
    responses(
        (status = 200, description = "MPEG-TS segment"),
        (status = 404, description = "Segment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "streaming"
)]
pub async fn variant_segment(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path((video_id, variant, segment)): Path<(Uuid, String, String)>,
) -> Result<Response, HttpAppError> {
    if !is_safe_path_component(&variant) || !is_safe_path_component(&segment) {
        return Err(AppError::BadRequest("Invalid segment name".to_string()).into());
    }

    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;
    let key = keys::segment_key(ctx.organization_id, video.id, &variant, &segment);
    let stream = state.storage.download_stream(&key).await?;

    Ok((
        [(header::CONTENT_TYPE, HLS_SEGMENT_CONTENT_TYPE)],
        Body::from_stream(stream),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}/thumbnail",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "JPEG thumbnail"),
        (status = 404, description = "Video or thumbnail not found")
    ),
    security(("bearer_auth" = [])),
    tag = "streaming"
)]
pub async fn thumbnail(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path(video_id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;
    let thumbnail_key = video
        .thumbnail_key
        .ok_or_else(|| AppError::NotFound("Thumbnail not available".to_string()))?;

    let data = state.storage.download(&thumbnail_key).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], data).into_response())
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}/download",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Original file as attachment"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer_auth" = [])),
    tag = "streaming"
)]
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
    Path(video_id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let video = state.videos.get_for_org(ctx.organization_id, video_id).await?;
    let stream = state.storage.download_stream(&video.storage_key).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        video.original_filename.replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, video.content_type.clone()),
            (header::CONTENT_LENGTH, video.file_size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header_serves_full() {
        assert_eq!(parse_range(None, 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("chunks=0-99"), 1000), RangeRequest::Full);
    }

    #[test]
    fn test_explicit_range() {
        // bytes=0-99 of a larger file is a 100-byte slice
        assert_eq!(
            parse_range(Some("bytes=0-99"), 1000),
            RangeRequest::Slice { start: 0, end: 99 }
        );
        assert_eq!(
            parse_range(Some("bytes=500-999"), 1000),
            RangeRequest::Slice {
                start: 500,
                end: 999
            }
        );
    }

    #[test]
    fn test_end_clamped_to_file_size() {
        assert_eq!(
            parse_range(Some("bytes=900-5000"), 1000),
            RangeRequest::Slice {
                start: 900,
                end: 999
            }
        );
    }

    #[test]
    fn test_open_ended_and_suffix_ranges() {
        assert_eq!(
            parse_range(Some("bytes=950-"), 1000),
            RangeRequest::Slice {
                start: 950,
                end: 999
            }
        );
        assert_eq!(
            parse_range(Some("bytes=-100"), 1000),
            RangeRequest::Slice {
                start: 900,
                end: 999
            }
        );
        // suffix larger than the file means the whole file
        assert_eq!(
            parse_range(Some("bytes=-5000"), 1000),
            RangeRequest::Slice { start: 0, end: 999 }
        );
    }

    #[test]
    fn test_unsatisfiable_ranges() {
        assert_eq!(
            parse_range(Some("bytes=1000-1100"), 1000),
            RangeRequest::Unsatisfiable
        );
        assert_eq!(
            parse_range(Some("bytes=200-100"), 1000),
            RangeRequest::Unsatisfiable
        );
        assert_eq!(
            parse_range(Some("bytes=-"), 1000),
            RangeRequest::Unsatisfiable
        );
        assert_eq!(
            parse_range(Some("bytes=abc-def"), 1000),
            RangeRequest::Unsatisfiable
        );
        assert_eq!(
            parse_range(Some("bytes=0-10,20-30"), 1000),
            RangeRequest::Unsatisfiable
        );
        assert_eq!(parse_range(Some("bytes=0-0"), 0), RangeRequest::Unsatisfiable);
    }

    #[test]
    fn test_safe_path_components() {
        assert!(is_safe_path_component("segment_003.ts"));
        assert!(is_safe_path_component("720p"));
        assert!(is_safe_path_component("index.m3u8"));

        assert!(!is_safe_path_component(""));
        assert!(!is_safe_path_component("../secret"));
        assert!(!is_safe_path_component("a/b.ts"));
        assert!(!is_safe_path_component("a\\b.ts"));
    }
}
