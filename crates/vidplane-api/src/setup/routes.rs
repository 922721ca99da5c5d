//! Route configuration.

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use vidplane_core::Config;

use crate::auth::middleware::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router> {
    let cors = setup_cors(config)?;

    let auth_state = Arc::new(AuthState {
        jwt_secret: config.jwt_secret.clone(),
        api_keys: state.api_keys.clone(),
        organizations: state.organizations.clone(),
        usage: state.usage.clone(),
    });

    let protected = protected_routes(state.clone()).layer(axum::middleware::from_fn_with_state(
        auth_state,
        auth_middleware,
    ));

    let app = public_routes(state.clone())
        .merge(protected)
        // Multipart framing needs headroom beyond the raw file limit.
        .layer(RequestBodyLimitLayer::new(
            config.max_upload_size_bytes + 1024 * 1024,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn public_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/organizations",
            post(handlers::organizations::create_organization),
        )
        .route("/api/billing/webhook", post(handlers::billing::webhook))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
        .with_state(state)
}

fn protected_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/videos/upload",
            post(handlers::video_upload::upload_video),
        )
        .route("/api/videos", get(handlers::video_get::list_videos))
        .route(
            "/api/videos/{id}",
            get(handlers::video_get::get_video).delete(handlers::video_delete::delete_video),
        )
        .route(
            "/api/videos/{id}/stream",
            get(handlers::video_stream::stream_video),
        )
        .route(
            "/api/videos/{id}/stream/{variant}/index.m3u8",
            get(handlers::video_stream::variant_playlist),
        )
        .route(
            "/api/videos/{id}/stream/{variant}/{segment}",
            get(handlers::video_stream::variant_segment),
        )
        .route(
            "/api/videos/{id}/thumbnail",
            get(handlers::video_stream::thumbnail),
        )
        .route(
            "/api/videos/{id}/download",
            get(handlers::video_stream::download_video),
        )
        .route("/api/usage/stats", get(handlers::usage::usage_stats))
        // Billing-flavored alias for the same snapshot.
        .route("/api/billing/usage", get(handlers::usage::usage_stats))
        .route(
            "/api/billing/change-plan",
            post(handlers::billing::change_plan),
        )
        .route(
            "/api/keys",
            post(handlers::api_keys::create_key).get(handlers::api_keys::list_keys),
        )
        .route("/api/keys/{id}", delete(handlers::api_keys::revoke_key))
        .with_state(state)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
    };
    Ok(cors)
}
