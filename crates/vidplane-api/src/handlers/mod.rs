pub mod api_keys;
pub mod billing;
pub mod health;
pub mod organizations;
pub mod usage;
pub mod video_delete;
pub mod video_get;
pub mod video_stream;
pub mod video_upload;
