pub mod organization;
pub mod plan;
pub mod usage;
pub mod video;

pub use organization::{Organization, OrganizationStatus};
pub use plan::{PlanLimits, SubscriptionPlan, BYTES_PER_GB, UNLIMITED};
pub use usage::{month_key, QuotaDecision, UsageRecord, UsageSnapshot};
pub use video::{
    TranscodedVideo, VariantStatus, Video, VideoResponse, VideoStatus,
};
