//! HTTP API for predictions, strategy discovery, health checks and
//! Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use forecast_lib::{
    ComponentStatus, DemandRequest, DemandResponse, ForecastError, HealthRegistry,
    HealthResponse, PredictionService, PriceRequest, PriceResponse, StrategyRegistry,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }

    /// Copy the service's per-component load state into the health registry
    pub async fn refresh_health(&self) {
        for (name, health) in self.service.component_health() {
            self.health_registry.update(&name, health).await;
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Failure of a request, rendered as `{error, code}`
#[derive(Debug)]
pub enum ApiError {
    Forecast(ForecastError),
    Body(JsonRejection),
    Task(tokio::task::JoinError),
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        ApiError::Forecast(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Body(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Task(e)
    }
}

/// HTTP status for a core error
pub fn status_for(error: &ForecastError) -> StatusCode {
    match error {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        ForecastError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Forecast(e) => (
                status_for(&e),
                ErrorBody {
                    error: e.to_string(),
                    code: e.kind(),
                },
            ),
            // keep axum's status: 400 for malformed JSON, 422 for wrong fields
            ApiError::Body(rejection) => (
                rejection.status(),
                ErrorBody {
                    error: rejection.body_text(),
                    code: "invalid_body",
                },
            ),
            ApiError::Task(e) => {
                error!(error = %e, "Prediction task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Prediction task failed".to_string(),
                        code: "internal",
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn predict_demand(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DemandRequest>, JsonRejection>,
) -> Result<Json<DemandResponse>, ApiError> {
    let Json(request) = payload?;
    let service = state.service.clone();
    let response = tokio::task::spawn_blocking(move || service.predict_demand(&request)).await??;
    Ok(Json(response))
}

async fn predict_price(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PriceRequest>, JsonRejection>,
) -> Result<Json<PriceResponse>, ApiError> {
    let Json(request) = payload?;
    let service = state.service.clone();
    let response = tokio::task::spawn_blocking(move || service.predict_price(&request)).await??;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ServiceHealth {
    status: ComponentStatus,
    demand_strategies: Vec<String>,
    price_strategies: Vec<String>,
}

/// Service-level health with the registered strategy names
async fn health(State(state): State<Arc<AppState>>) -> Json<ServiceHealth> {
    let components: HashMap<_, _> = state.service.component_health().into_iter().collect();
    Json(ServiceHealth {
        status: HealthResponse::compute_status(&components),
        demand_strategies: state.service.demand_registry().list_all(),
        price_strategies: state.service.price_registry().list_all(),
    })
}

#[derive(Debug, Serialize)]
struct StrategySummary {
    available: Vec<String>,
    default: Option<String>,
}

impl From<&StrategyRegistry> for StrategySummary {
    fn from(registry: &StrategyRegistry) -> Self {
        Self {
            available: registry.list_all(),
            default: registry.default_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct StrategiesResponse {
    demand: StrategySummary,
    price: StrategySummary,
}

async fn strategies(State(state): State<Arc<AppState>>) -> Json<StrategiesResponse> {
    Json(StrategiesResponse {
        demand: state.service.demand_registry().into(),
        price: state.service.price_registry().into(),
    })
}

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
    version: &'static str,
    health: &'static str,
    strategies: &'static str,
}

async fn root() -> Json<Banner> {
    Json(Banner {
        message: "Forecasting APIs",
        version: SERVICE_VERSION,
        health: "/health",
        strategies: "/strategies",
    })
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.refresh_health().await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // failed strategies are isolated
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/demand-forecast/predict", post(predict_demand))
        .route("/api/price-forecast/predict", post(predict_price))
        .route("/health", get(health))
        .route("/strategies", get(strategies))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind the listener on all interfaces
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API listener bound");
    Ok(listener)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);
    info!("Starting API server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
