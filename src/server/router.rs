//! Router configuration and route composition.

use axum::extract::State;
use axum::http::Method;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::reports::REPORTS;
use crate::server::handlers;
use crate::server::state::AppState;

/// Creates the application router: one GET route per report.
pub fn create_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new();
    for report in REPORTS.iter() {
        router = router.route(
            report.path,
            get(move |State(state): State<AppState>| handlers::serve_report(state, report)),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}

/// Any origin may read the reports; browser and mobile clients call the API directly.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT])
        .allow_origin(tower_http::cors::Any)
}
