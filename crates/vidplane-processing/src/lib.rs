//! Video processing: upload validation, ffmpeg/ffprobe subprocess
//! orchestration, and the per-video transcode pipeline.

pub mod ffmpeg;
pub mod pipeline;
pub mod resolutions;
pub mod validator;

pub use ffmpeg::{FFmpegService, HlsVariant, VideoMetadata};
pub use pipeline::VideoPipeline;
pub use resolutions::{ResolutionSpec, RESOLUTION_LADDER};
pub use validator::{validate_upload, ValidationError};
