use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::domain::LoadingTimeService;

pub const LOADING_TIME_PATH: &str = "/api/async/loading-time";
pub const SET_STATUS_PATH: &str = "/api/async/set-status";
pub const HEALTH_PATH: &str = "/health";
pub const HEALTHZ_PATH: &str = "/healthz";

#[must_use]
pub fn register_routes(router: Router, service: Arc<LoadingTimeService>) -> Router {
    router
        .route(LOADING_TIME_PATH, post(handlers::start_loading_time))
        .route(SET_STATUS_PATH, post(handlers::set_status))
        .route(HEALTH_PATH, get(handlers::health))
        .route(HEALTHZ_PATH, get(handlers::healthz))
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}
