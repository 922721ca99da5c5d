//! Usage snapshot for the current month.

use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;
use vidplane_core::models::UsageSnapshot;

use crate::auth::models::OrgContext;
use crate::error::HttpAppError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/usage/stats",
    responses((status = 200, description = "Current month usage and plan limits", body = UsageSnapshot)),
    security(("bearer_auth" = [])),
    tag = "usage"
)]
pub async fn usage_stats(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<OrgContext>,
) -> Result<Json<UsageSnapshot>, HttpAppError> {
    let snapshot = state.usage.snapshot(&ctx.organization).await?;
    Ok(Json(snapshot))
}
