//! Shared application state.

use sqlx::PgPool;
use std::sync::Arc;
use vidplane_core::Config;
use vidplane_db::{ApiKeyRepository, OrganizationRepository, UsageRepository, VideoRepository};
use vidplane_processing::{FFmpegService, VideoPipeline};
use vidplane_storage::Storage;

use crate::job_queue::TranscodeJobQueue;

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub organizations: OrganizationRepository,
    pub api_keys: ApiKeyRepository,
    pub usage: UsageRepository,
    pub videos: VideoRepository,
    pub job_queue: TranscodeJobQueue,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool, storage: Arc<dyn Storage>) -> Self {
        let organizations = OrganizationRepository::new(pool.clone());
        let api_keys = ApiKeyRepository::new(pool.clone());
        let usage = UsageRepository::new(pool.clone());
        let videos = VideoRepository::new(pool.clone());

        let ffmpeg = FFmpegService::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            config.hls_segment_duration,
            std::time::Duration::from_secs(config.transcode_timeout_secs),
        );
        let pipeline = VideoPipeline::new(
            videos.clone(),
            usage.clone(),
            storage.clone(),
            ffmpeg,
            config.thumbnail_offset_secs,
        );
        let job_queue = TranscodeJobQueue::new(
            pipeline,
            config.max_concurrent_transcodes,
            config.job_queue_size,
        );

        Self {
            config,
            pool,
            storage,
            organizations,
            api_keys,
            usage,
            videos,
            job_queue,
        }
    }
}
