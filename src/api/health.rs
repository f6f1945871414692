// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::gateway::{GatewayError, RecordId};
use crate::state::AppState;

/// Id fetched by the readiness probe. A "not found" answer proves the
/// gateway is reachable.
const PROBE_RECORD_ID: &str = "health-probe";

const OK: &str = "ok";
const UNAVAILABLE: &str = "unavailable";

/// Readiness report for the vault and its collaborators.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// `ok` when the gateway answered, `degraded` otherwise.
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Storage gateway reachability.
    pub gateway: String,
    /// Gateway backend in use (`memory` or `http`).
    pub gateway_backend: String,
    /// Balance oracle in use (`evm` or `unconfigured`). Not probed: an
    /// unreachable oracle is handled by the balance failure mode.
    pub balance_oracle: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

async fn probe_gateway(state: &AppState) -> &'static str {
    let probe = RecordId::from(PROBE_RECORD_ID);
    match state.vault.gateway().get(&probe).await {
        Ok(_) | Err(GatewayError::NotFound(_)) => OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.backends.gateway, "Gateway probe failed");
            UNAVAILABLE
        }
    }
}

fn report(state: &AppState, gateway: &str) -> (StatusCode, Json<ReadyResponse>) {
    let ready = gateway == OK;
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { OK } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: OK.to_string(),
            gateway: gateway.to_string(),
            gateway_backend: state.backends.gateway.to_string(),
            balance_oracle: state.backends.oracle.to_string(),
        },
    };
    (code, Json(body))
}

/// Full health report. 503 when the gateway cannot be reached.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Gateway reachable", body = ReadyResponse),
        (status = 503, description = "Gateway unreachable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let gateway = probe_gateway(&state).await;
    report(&state, gateway)
}

/// Process liveness; never touches the gateway.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: OK.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve records", body = ReadyResponse),
        (status = 503, description = "Gateway unreachable", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let gateway = probe_gateway(&state).await;
    report(&state, gateway)
}
