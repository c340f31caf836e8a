//! HTTP API for the control service.
//!
//! Provides endpoints for:
//! - Tenant configuration intake
//! - Health and readiness checks

mod config;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::config::IntakeConfig;
use crate::dispatch::CallbackDispatcher;
use crate::types::{PipelineState, Stage};

pub use config::{
    AuthConfig, ConfigRequest, ConfigResponse, Descriptor, ErrorCode, SdkConfig, TenantInfo,
};

/// Shared application state for the control service.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Producer side of the callback queue.
    pub dispatcher: CallbackDispatcher,
    /// Known networks and SDK location.
    pub intake: IntakeConfig,
    /// Largest accepted intake body.
    pub max_body_bytes: usize,
    /// Provisioning outcome reported by `/ready`.
    pub pipeline: PipelineState,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Tenant intake
        .route(
            "/config",
            get(config::get_config).post(config::post_config),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let ready = state.pipeline.stage == Stage::ConfigRun;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            ready,
            stage: state.pipeline.stage.as_str(),
            contract_address: state.pipeline.contract_address.to_string(),
        }),
    )
}

/// Health response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Readiness response.
#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    stage: &'static str,
    contract_address: String,
}
