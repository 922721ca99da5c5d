use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Pipeline state for a video. Transitions are linear with `Failed`
/// reachable from any non-terminal state; `can_transition` is the single
/// authority consulted before any status write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, sqlx::Type)]
#[sqlx(type_name = "video_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Thumbnailing,
    Probing,
    Transcoding,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }

    /// Whether the pipeline may move from `self` to `to`.
    pub fn can_transition(&self, to: VideoStatus) -> bool {
        use VideoStatus::*;
        match (self, to) {
            (Pending, Thumbnailing)
            | (Thumbnailing, Probing)
            | (Probing, Transcoding)
            | (Transcoding, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl Display for VideoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Thumbnailing => "thumbnailing",
            VideoStatus::Probing => "probing",
            VideoStatus::Transcoding => "transcoding",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Status of a single resolution-specific transcode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, sqlx::Type)]
#[sqlx(type_name = "variant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One row per uploaded asset.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub original_filename: String,
    pub storage_key: String,
    pub file_size: i64,
    pub content_type: String,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub status: VideoStatus,
    pub error_message: Option<String>,
    pub thumbnail_key: Option<String>,
    pub hls_master_playlist: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per (video, resolution) derived encode; unique on the pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct TranscodedVideo {
    pub id: Uuid,
    pub video_id: Uuid,
    pub resolution: String,
    pub storage_key: Option<String>,
    pub file_size: Option<i64>,
    pub bitrate_kbps: Option<i32>,
    pub codec: Option<String>,
    pub status: VariantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-facing video representation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub status: VideoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub has_thumbnail: bool,
    pub has_hls: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            filename: video.original_filename,
            content_type: video.content_type,
            file_size: video.file_size,
            duration: video.duration,
            width: video.width,
            height: video.height,
            status: video.status,
            error_message: video.error_message,
            has_thumbnail: video.thumbnail_key.is_some(),
            has_hls: video.hls_master_playlist.is_some(),
            uploaded_at: video.uploaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use VideoStatus::*;
        assert!(Pending.can_transition(Thumbnailing));
        assert!(Thumbnailing.can_transition(Probing));
        assert!(Probing.can_transition(Transcoding));
        assert!(Transcoding.can_transition(Completed));
    }

    #[test]
    fn test_failure_reachable_from_any_non_terminal_state() {
        use VideoStatus::*;
        for from in [Pending, Thumbnailing, Probing, Transcoding] {
            assert!(from.can_transition(Failed), "{from} -> failed");
        }
        assert!(!Completed.can_transition(Failed));
        assert!(!Failed.can_transition(Failed));
    }

    #[test]
    fn test_no_skipping_or_rewinding() {
        use VideoStatus::*;
        assert!(!Pending.can_transition(Probing));
        assert!(!Pending.can_transition(Completed));
        assert!(!Probing.can_transition(Thumbnailing));
        assert!(!Completed.can_transition(Probing));
        assert!(!Failed.can_transition(Pending));
    }

    #[test]
    fn test_terminal_states() {
        use VideoStatus::*;
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Transcoding.is_terminal());
    }

    #[test]
    fn test_video_response_flags() {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            original_filename: "demo.mp4".to_string(),
            storage_key: "videos/org/id/original.mp4".to_string(),
            file_size: 1024,
            content_type: "video/mp4".to_string(),
            duration: Some(12.5),
            width: Some(1920),
            height: Some(1080),
            status: VideoStatus::Completed,
            error_message: None,
            thumbnail_key: Some("videos/org/id/thumbnail.jpg".to_string()),
            hls_master_playlist: None,
            uploaded_at: now,
            updated_at: now,
        };
        let response = VideoResponse::from(video);
        assert_eq!(response.filename, "demo.mp4");
        assert!(response.has_thumbnail);
        assert!(!response.has_hls);
        assert_eq!(response.status, VideoStatus::Completed);
    }
}
