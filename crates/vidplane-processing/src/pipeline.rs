//! Per-video processing pipeline.
//!
//! Runs strictly sequentially for one video: thumbnail, probe, HLS
//! transcode per ladder rung, master playlist, ledger update. Partial
//! variant failure is tolerated; the video completes if at least one
//! rendition succeeded.

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use vidplane_core::models::{VariantStatus, Video, VideoStatus};
use vidplane_db::{UsageRepository, VideoRepository};
use vidplane_storage::{keys, Storage};

use crate::ffmpeg::{FFmpegService, HlsVariant};
use crate::resolutions::RESOLUTION_LADDER;

#[derive(Clone)]
pub struct VideoPipeline {
    videos: VideoRepository,
    usage: UsageRepository,
    storage: Arc<dyn Storage>,
    ffmpeg: FFmpegService,
    thumbnail_offset_secs: f64,
}

impl VideoPipeline {
    pub fn new(
        videos: VideoRepository,
        usage: UsageRepository,
        storage: Arc<dyn Storage>,
        ffmpeg: FFmpegService,
        thumbnail_offset_secs: f64,
    ) -> Self {
        Self {
            videos,
            usage,
            storage,
            ffmpeg,
            thumbnail_offset_secs,
        }
    }

    /// Process one uploaded video end to end. Never returns an error to the
    /// caller: any failure is persisted on the video row.
    pub async fn process(&self, video_id: Uuid) {
        let start = std::time::Instant::now();
        tracing::info!(video_id = %video_id, "Video processing started");

        if let Err(e) = self.process_inner(video_id).await {
            tracing::error!(video_id = %video_id, error = %e, "Video processing failed");
            let message: String = format!("{:#}", e).chars().take(500).collect();
            if let Err(db_err) = self.videos.mark_failed(video_id, &message).await {
                tracing::error!(video_id = %video_id, error = %db_err, "Failed to persist failure state");
            }
            return;
        }

        tracing::info!(
            video_id = %video_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Video processing completed"
        );
    }

    async fn process_inner(&self, video_id: Uuid) -> Result<()> {
        let video = self.videos.get(video_id).await?;

        let workdir = tempfile::tempdir().context("Failed to create working directory")?;
        let input = workdir.path().join(&video.original_filename);
        self.fetch_original(&video, &input).await?;

        // Thumbnail
        self.videos
            .transition_status(video.id, VideoStatus::Thumbnailing)
            .await?;
        let thumb_key = self.generate_thumbnail(&video, workdir.path(), &input).await?;

        // Probe
        self.videos
            .transition_status(video.id, VideoStatus::Probing)
            .await?;
        let metadata = self.ffmpeg.probe(&input).await?;
        self.videos
            .update_streaming_info(
                video.id,
                Some(&thumb_key),
                Some(metadata.duration),
                Some(metadata.width as i32),
                Some(metadata.height as i32),
            )
            .await?;

        // Transcode
        self.videos
            .transition_status(video.id, VideoStatus::Transcoding)
            .await?;
        let (completed, variant_bytes) = self
            .transcode_variants(&video, workdir.path(), &input)
            .await?;

        if completed.is_empty() {
            self.videos
                .mark_failed(video.id, "All transcode variants failed")
                .await?;
            return Ok(());
        }

        // Master playlist over the variants that made it
        let playlist = self.ffmpeg.create_master_playlist(&completed);
        let master_key = keys::master_playlist_key(video.organization_id, video.id);
        self.storage
            .upload(&master_key, playlist.into_bytes())
            .await
            .context("Failed to store master playlist")?;
        self.videos
            .set_hls_master_playlist(video.id, &master_key)
            .await?;

        self.usage
            .record_transcoded_bytes(video.organization_id, variant_bytes)
            .await?;
        self.usage
            .record_processed_minutes(video.organization_id, metadata.duration)
            .await?;

        self.videos
            .transition_status(video.id, VideoStatus::Completed)
            .await?;
        Ok(())
    }

    /// Copy the original out of storage into the working directory.
    async fn fetch_original(&self, video: &Video, dest: &Path) -> Result<()> {
        let mut stream = self
            .storage
            .download_stream(&video.storage_key)
            .await
            .context("Failed to open original for download")?;

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read original chunk")?;
            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await?;
        }
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        Ok(())
    }

    async fn generate_thumbnail(
        &self,
        video: &Video,
        workdir: &Path,
        input: &Path,
    ) -> Result<String> {
        let thumb_path = workdir.join("thumbnail.jpg");
        self.ffmpeg
            .extract_thumbnail(input, &thumb_path, self.thumbnail_offset_secs)
            .await?;

        let thumb_key = keys::thumbnail_key(video.organization_id, video.id);
        let data = tokio::fs::read(&thumb_path).await?;
        self.storage
            .upload(&thumb_key, data)
            .await
            .context("Failed to store thumbnail")?;
        Ok(thumb_key)
    }

    /// Run every rung of the ladder, tolerating per-variant failure.
    /// Returns the completed variants and their total byte size.
    async fn transcode_variants(
        &self,
        video: &Video,
        workdir: &Path,
        input: &Path,
    ) -> Result<(Vec<HlsVariant>, i64)> {
        let out_dir = workdir.join("hls");
        let mut completed = Vec::new();
        let mut total_bytes: i64 = 0;

        for spec in RESOLUTION_LADDER {
            self.videos
                .upsert_variant(
                    video.id,
                    spec.label,
                    VariantStatus::Processing,
                    None,
                    None,
                    Some(spec.bitrate_kbps as i32),
                    None,
                )
                .await?;

            match self.ffmpeg.transcode_hls_variant(input, &out_dir, spec).await {
                Ok(variant) => {
                    let uploaded = self
                        .upload_variant_outputs(video, &out_dir, spec.label)
                        .await?;
                    let playlist_key =
                        keys::variant_playlist_key(video.organization_id, video.id, spec.label);

                    self.videos
                        .upsert_variant(
                            video.id,
                            spec.label,
                            VariantStatus::Completed,
                            Some(&playlist_key),
                            Some(uploaded),
                            Some(spec.bitrate_kbps as i32),
                            Some("h264"),
                        )
                        .await?;

                    total_bytes += uploaded;
                    completed.push(variant);
                }
                Err(e) => {
                    tracing::warn!(
                        video_id = %video.id,
                        resolution = spec.label,
                        error = %e,
                        "Variant transcode failed, continuing"
                    );
                    self.videos
                        .upsert_variant(
                            video.id,
                            spec.label,
                            VariantStatus::Failed,
                            None,
                            None,
                            Some(spec.bitrate_kbps as i32),
                            None,
                        )
                        .await?;
                }
            }
        }

        Ok((completed, total_bytes))
    }

    /// Upload a variant directory (playlist + segments) to storage,
    /// returning the total byte size.
    async fn upload_variant_outputs(
        &self,
        video: &Video,
        out_dir: &Path,
        label: &str,
    ) -> Result<i64> {
        let variant_dir = out_dir.join(label);
        let mut entries = tokio::fs::read_dir(&variant_dir)
            .await
            .context("Failed to read variant output directory")?;

        let mut total: i64 = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let data = tokio::fs::read(entry.path()).await?;
            total += data.len() as i64;

            let key = keys::segment_key(video.organization_id, video.id, label, &name);
            self.storage
                .upload(&key, data)
                .await
                .with_context(|| format!("Failed to store variant file {}", name))?;
        }

        if total == 0 {
            return Err(anyhow!("Variant {} produced no output files", label));
        }
        Ok(total)
    }
}
