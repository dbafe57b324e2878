use axum::{routing::get, Router};
use std::sync::Arc;

use crate::client::MetrikaClient;

use super::handlers::{get_report, health_check, list_reports, raw_request, AppState};

pub fn create_api_router(client: Arc<MetrikaClient>) -> Router {
    let state = Arc::new(AppState { client });

    Router::new()
        .route("/health", get(health_check))
        .route("/reports", get(list_reports))
        .route("/reports/{key}", get(get_report))
        .route("/raw", get(raw_request))
        .with_state(state)
}
