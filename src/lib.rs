// src/lib.rs

use axum::{routing::get, Router};
use services::dashboard_reader::DashboardReader;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub reader: DashboardReader,
}

pub mod services {
    pub mod coingecko;
    pub mod warehouse;
    pub mod dashboard_reader;
}

pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod shaper;

/// Dashboard routes: HTML pages plus their JSON summaries.
pub fn router(state: AppState) -> Router {
    use handlers::dashboard::{gold_dashboard, gold_summary_handler, silver_dashboard, silver_summary_handler};

    Router::new()
        .route("/", get(silver_dashboard))
        .route("/gold", get(gold_dashboard))
        .route("/api/silver", get(silver_summary_handler))
        .route("/api/gold", get(gold_summary_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
