use axum::{extract::State, http::StatusCode, response::Html, Json};

use crate::{
    dashboard::page::{
        gold_summary, render_error_page, render_gold_page, render_silver_page, silver_summary,
        GOLD_TITLE, SILVER_TITLE,
    },
    error::PipelineError,
    models::dashboard::{DashboardErrorResponse, GoldSummaryResponse, SilverSummaryResponse},
    AppState,
};

/// HTTP status for a failed dashboard request
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Persistence(_) | PipelineError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn html_error(title: &str, err: PipelineError) -> (StatusCode, Html<String>) {
    tracing::error!(kind = err.kind(), "{} failed: {}", title, err);
    (status_for(&err), Html(render_error_page(title, &err)))
}

fn json_error(err: PipelineError) -> (StatusCode, Json<DashboardErrorResponse>) {
    tracing::error!(kind = err.kind(), "Dashboard summary failed: {}", err);
    (
        status_for(&err),
        Json(DashboardErrorResponse {
            kind: err.kind().to_string(),
            error: err.to_string(),
        }),
    )
}

/// Handler for GET /
pub async fn silver_dashboard(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let rows = state
        .reader
        .load_silver()
        .await
        .map_err(|e| html_error(SILVER_TITLE, e))?;

    let tz = state.reader.timezone();
    render_silver_page(&rows, &tz)
        .map(Html)
        .map_err(|e| html_error(SILVER_TITLE, e))
}

/// Handler for GET /gold
pub async fn gold_dashboard(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let rows = state
        .reader
        .load_gold()
        .await
        .map_err(|e| html_error(GOLD_TITLE, e))?;

    render_gold_page(&rows)
        .map(Html)
        .map_err(|e| html_error(GOLD_TITLE, e))
}

/// Handler for GET /api/silver
pub async fn silver_summary_handler(
    State(state): State<AppState>,
) -> Result<Json<SilverSummaryResponse>, (StatusCode, Json<DashboardErrorResponse>)> {
    let rows = state.reader.load_silver().await.map_err(json_error)?;
    Ok(Json(silver_summary(&rows, &state.reader.timezone())))
}

/// Handler for GET /api/gold
pub async fn gold_summary_handler(
    State(state): State<AppState>,
) -> Result<Json<GoldSummaryResponse>, (StatusCode, Json<DashboardErrorResponse>)> {
    let rows = state.reader.load_gold().await.map_err(json_error)?;
    Ok(Json(gold_summary(&rows)))
}
