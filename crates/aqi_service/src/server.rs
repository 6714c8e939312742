use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aqi_core::category::legend;
use aqi_core::{
    report_from_prediction, AnalyticsReport, AssemblyError, CategoryView, DashboardReport,
    PredictionError,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::dashboard::DASHBOARD_HTML;
use crate::live::resolve_live_aqi;
use crate::state::{AppState, SharedState};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match &err {
            PredictionError::Assembly(AssemblyError::NoDataForCity { .. }) => {
                Self::not_found(err.to_string())
            }
            PredictionError::Assembly(_) => Self::bad_request(err.to_string()),
            PredictionError::Model(_) => Self::internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model_checksum: String,
    trees: usize,
    dataset_rows: usize,
    live_enabled: bool,
}

#[derive(Debug, Serialize)]
struct CitiesResponse {
    cities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    #[serde(default)]
    city: Option<String>,
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!(addr = %listener.local_addr()?, "dashboard listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("dashboard server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind dashboard listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind dashboard listener on {addr}"))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handle_dashboard))
        .route("/api/health", get(handle_health))
        .route("/api/cities", get(handle_cities))
        .route("/api/legend", get(handle_legend))
        .route("/api/predict", get(handle_predict))
        .route("/api/analytics", get(handle_analytics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        model_checksum: state.checksum.clone(),
        trees: state.bundle.model.num_trees(),
        dataset_rows: state.data.len(),
        live_enabled: state.config.api_key.is_some(),
    })
}

async fn handle_cities(State(state): State<SharedState>) -> Json<CitiesResponse> {
    Json(CitiesResponse {
        cities: state.selectable_cities(),
    })
}

async fn handle_legend() -> Json<Vec<CategoryView>> {
    Json(legend())
}

async fn handle_predict(
    State(state): State<SharedState>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<DashboardReport>, ApiError> {
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter `city` is required"))?;

    // Predict first so bad cities never cost a live lookup
    let prediction = state.bundle.predict(city, &state.data)?;

    let live = resolve_live_aqi(state.live.as_ref(), city).await;
    let report = report_from_prediction(
        &state.data,
        city,
        &prediction,
        live,
        state.config.trend_window,
    );
    debug!(
        city,
        predicted = report.predicted_aqi,
        live = ?report.live_aqi,
        "report built"
    );
    Ok(Json(report))
}

async fn handle_analytics(State(state): State<SharedState>) -> Json<AnalyticsReport> {
    Json(state.analytics.as_ref().clone())
}
