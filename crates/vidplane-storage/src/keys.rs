//! Storage key layout for video assets.
//!
//! Everything for one video lives under `videos/{org_id}/{video_id}/`:
//! the original upload, the thumbnail, the HLS master playlist, and one
//! directory per resolution variant.

use uuid::Uuid;

/// Directory prefix holding all of a video's objects.
pub fn video_prefix(org_id: Uuid, video_id: Uuid) -> String {
    format!("videos/{}/{}", org_id, video_id)
}

pub fn original_key(org_id: Uuid, video_id: Uuid, extension: &str) -> String {
    format!("{}/original.{}", video_prefix(org_id, video_id), extension)
}

pub fn thumbnail_key(org_id: Uuid, video_id: Uuid) -> String {
    format!("{}/thumbnail.jpg", video_prefix(org_id, video_id))
}

pub fn master_playlist_key(org_id: Uuid, video_id: Uuid) -> String {
    format!("{}/master.m3u8", video_prefix(org_id, video_id))
}

pub fn variant_playlist_key(org_id: Uuid, video_id: Uuid, resolution: &str) -> String {
    format!("{}/{}/index.m3u8", video_prefix(org_id, video_id), resolution)
}

pub fn segment_key(org_id: Uuid, video_id: Uuid, resolution: &str, segment: &str) -> String {
    format!(
        "{}/{}/{}",
        video_prefix(org_id, video_id),
        resolution,
        segment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let org = Uuid::nil();
        let video = Uuid::nil();
        let prefix = video_prefix(org, video);
        assert!(original_key(org, video, "mp4").starts_with(&prefix));
        assert!(original_key(org, video, "mp4").ends_with("/original.mp4"));
        assert!(thumbnail_key(org, video).ends_with("/thumbnail.jpg"));
        assert!(master_playlist_key(org, video).ends_with("/master.m3u8"));
        assert_eq!(
            variant_playlist_key(org, video, "720p"),
            format!("{}/720p/index.m3u8", prefix)
        );
        assert_eq!(
            segment_key(org, video, "720p", "segment_000.ts"),
            format!("{}/720p/segment_000.ts", prefix)
        );
    }
}
