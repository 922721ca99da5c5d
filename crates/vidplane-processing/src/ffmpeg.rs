//! ffmpeg/ffprobe subprocess wrapper.
//!
//! Every subprocess runs under a deadline with `kill_on_drop`, so a stuck
//! encode cannot hold a worker slot forever.

use crate::resolutions::ResolutionSpec;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

/// One completed HLS rendition on disk, playlist path relative to the
/// video's output directory.
#[derive(Debug, Clone)]
pub struct HlsVariant {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub playlist_path: String,
}

#[derive(Clone)]
pub struct FFmpegService {
    ffmpeg_path: String,
    ffprobe_path: String,
    segment_duration: u64,
    timeout: Duration,
}

impl FFmpegService {
    pub fn new(
        ffmpeg_path: String,
        ffprobe_path: String,
        segment_duration: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            segment_duration,
            timeout,
        }
    }

    /// Run a subprocess under the configured deadline. On expiry the future
    /// is dropped and the child killed.
    async fn run(&self, program: &str, args: &[String], operation: &str) -> Result<Vec<u8>> {
        let start = std::time::Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                tracing::warn!(
                    operation = operation,
                    timeout_secs = self.timeout.as_secs(),
                    "Subprocess killed after deadline"
                );
                anyhow!(
                    "{} timed out after {} seconds",
                    operation,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to execute {}", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{} failed: {}", operation, stderr.trim()));
        }

        tracing::debug!(
            operation = operation,
            duration_ms = start.elapsed().as_millis() as u64,
            "Subprocess completed"
        );
        Ok(output.stdout)
    }

    /// Probe duration, dimensions, and codec of the first video stream.
    pub async fn probe(&self, input: &Path) -> Result<VideoMetadata> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            input.to_string_lossy().to_string(),
        ];

        let stdout = self.run(&self.ffprobe_path, &args, "ffprobe").await?;
        let probe: serde_json::Value =
            serde_json::from_slice(&stdout).context("Failed to parse ffprobe output")?;

        let stream = probe["streams"]
            .get(0)
            .ok_or_else(|| anyhow!("No video stream found"))?;

        let duration = probe["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| anyhow!("Could not parse duration"))?;
        let width = stream["width"]
            .as_u64()
            .ok_or_else(|| anyhow!("Could not parse width"))? as u32;
        let height = stream["height"]
            .as_u64()
            .ok_or_else(|| anyhow!("Could not parse height"))? as u32;
        let codec = stream["codec_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        tracing::info!(
            video_duration = duration,
            width = width,
            height = height,
            codec = %codec,
            "Video probe completed"
        );

        Ok(VideoMetadata {
            duration,
            width,
            height,
            codec,
        })
    }

    /// Extract a single JPEG frame at `offset_secs`.
    pub async fn extract_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        offset_secs: f64,
    ) -> Result<()> {
        let args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", offset_secs),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&self.ffmpeg_path, &args, "thumbnail extraction")
            .await?;
        Ok(())
    }

    /// Encode one HLS rendition into `{output_dir}/{label}/` with a
    /// VOD playlist and numbered segments.
    pub async fn transcode_hls_variant(
        &self,
        input: &Path,
        output_dir: &Path,
        spec: &ResolutionSpec,
    ) -> Result<HlsVariant> {
        let variant_dir = output_dir.join(spec.label);
        tokio::fs::create_dir_all(&variant_dir).await?;

        let playlist_path = variant_dir.join("index.m3u8");
        let segment_pattern = variant_dir.join("segment_%03d.ts");

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-profile:v".to_string(),
            "main".to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", spec.width, spec.height),
            "-b:v".to_string(),
            format!("{}k", spec.bitrate_kbps),
            "-maxrate".to_string(),
            format!("{}k", (spec.bitrate_kbps as f32 * 1.2) as u32),
            "-bufsize".to_string(),
            format!("{}k", spec.bitrate_kbps * 2),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            self.segment_duration.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            segment_pattern.to_string_lossy().to_string(),
            playlist_path.to_string_lossy().to_string(),
        ];

        let op = format!("{} transcode", spec.label);
        self.run(&self.ffmpeg_path, &args, &op).await?;

        Ok(HlsVariant {
            label: spec.label.to_string(),
            width: spec.width,
            height: spec.height,
            bitrate_kbps: spec.bitrate_kbps,
            playlist_path: format!("{}/index.m3u8", spec.label),
        })
    }

    /// Render the master playlist for the variants that completed.
    pub fn create_master_playlist(&self, variants: &[HlsVariant]) -> String {
        let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");
        for variant in variants {
            playlist.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n\n",
                variant.bitrate_kbps as u64 * 1000,
                variant.width,
                variant.height,
                variant.playlist_path
            ));
        }
        playlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> FFmpegService {
        FFmpegService::new(
            "ffmpeg".to_string(),
            "ffprobe".to_string(),
            6,
            Duration::from_secs(1800),
        )
    }

    #[test]
    fn test_master_playlist_format() {
        let variants = vec![
            HlsVariant {
                label: "720p".to_string(),
                width: 1280,
                height: 720,
                bitrate_kbps: 2500,
                playlist_path: "720p/index.m3u8".to_string(),
            },
            HlsVariant {
                label: "1080p".to_string(),
                width: 1920,
                height: 1080,
                bitrate_kbps: 5000,
                playlist_path: "1080p/index.m3u8".to_string(),
            },
        ];

        let playlist = service().create_master_playlist(&variants);
        assert!(playlist.starts_with("#EXTM3U\n#EXT-X-VERSION:3\n"));
        assert!(playlist.contains("BANDWIDTH=2500000,RESOLUTION=1280x720\n720p/index.m3u8"));
        assert!(playlist.contains("BANDWIDTH=5000000,RESOLUTION=1920x1080\n1080p/index.m3u8"));
    }

    #[test]
    fn test_master_playlist_empty() {
        let playlist = service().create_master_playlist(&[]);
        assert_eq!(playlist, "#EXTM3U\n#EXT-X-VERSION:3\n\n");
    }
}
