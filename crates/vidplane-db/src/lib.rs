//! Postgres repositories.
//!
//! Each repository is a thin `Clone` wrapper over a `PgPool`. Tenant scoping
//! is enforced at the query level: every read or write made on behalf of an
//! API caller filters by `organization_id`. Only the transcode pipeline,
//! which holds ids it created itself, uses the unscoped accessors.

pub mod api_key;
pub mod organization;
pub mod usage;
pub mod video;

pub use api_key::{ApiKey, ApiKeyRepository};
pub use organization::OrganizationRepository;
pub use usage::UsageRepository;
pub use video::VideoRepository;
