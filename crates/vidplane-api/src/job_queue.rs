//! Bounded transcode job queue with a capped worker pool.
//!
//! Admission control happens at submit time: a full channel rejects the
//! job instead of queueing unboundedly, and the semaphore caps how many
//! ffmpeg runs execute at once.

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;
use vidplane_core::AppError;
use vidplane_processing::VideoPipeline;

#[derive(Debug, Clone)]
pub enum TranscodeJob {
    ProcessVideo { video_id: Uuid },
}

#[derive(Clone)]
pub struct TranscodeJobQueue {
    tx: mpsc::Sender<TranscodeJob>,
}

impl TranscodeJobQueue {
    pub fn new(pipeline: VideoPipeline, max_concurrent: usize, queue_size: usize) -> Self {
        let queue_size = queue_size.max(1);
        let (tx, rx) = mpsc::channel(queue_size);

        tokio::spawn(async move {
            Self::worker_pool(rx, pipeline, max_concurrent.max(1)).await;
        });

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            "Transcode job queue initialized"
        );

        Self { tx }
    }

    /// Enqueue without waiting. A full queue is a 503 to the caller; the
    /// video stays `pending` and can be retried.
    pub fn submit(&self, job: TranscodeJob) -> Result<(), AppError> {
        let TranscodeJob::ProcessVideo { video_id } = &job;
        tracing::info!(video_id = %video_id, "Enqueuing transcode job");

        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!("Transcode job queue is full, rejecting job");
                AppError::TranscodeBacklogFull(
                    "Transcoding backlog is full, try again later".to_string(),
                )
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Internal("Transcode job queue is closed".to_string())
            }
        })
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<TranscodeJob>,
        pipeline: VideoPipeline,
        max_concurrent: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(job) = rx.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let pipeline = pipeline.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let TranscodeJob::ProcessVideo { video_id } = job;
                pipeline.process(video_id).await;
            });
        }
    }
}
