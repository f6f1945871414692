// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    lifecycle::{LifecycleStep, LogicalState, RollbackOutcome},
    metadata::Tag,
    models::{
        AccessCheckRequest, AnnotationResponse, DeleteRecordRequest, DownloadRecordRequest,
        DownloadRecordResponse, RestoreRecordRequest, RevokeShareRequest, RollbackRecordRequest,
        UploadRecordRequest,
    },
    policy::{AccessControl, AccessPolicy, Decision},
    state::AppState,
    vault::UploadReceipt,
};

pub mod health;
pub mod lifecycle;
pub mod records;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/records", post(records::upload_record))
        .route("/records/{record_id}/download", post(records::download_record))
        .route("/records/{record_id}/access", post(records::check_access))
        .route("/records/{record_id}/policy", get(records::get_policy))
        .route("/records/{record_id}/state", get(records::get_state))
        .route("/records/{record_id}/delete", post(lifecycle::delete_record))
        .route("/records/{record_id}/restore", post(lifecycle::restore_record))
        .route("/records/{record_id}/revoke", post(lifecycle::revoke_share))
        .route(
            "/records/{record_id}/rollback",
            post(lifecycle::rollback_record),
        )
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        records::upload_record,
        records::download_record,
        records::check_access,
        records::get_policy,
        records::get_state,
        lifecycle::delete_record,
        lifecycle::restore_record,
        lifecycle::revoke_share,
        lifecycle::rollback_record,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            AccessControl,
            AccessPolicy,
            Decision,
            Tag,
            UploadRecordRequest,
            UploadReceipt,
            DownloadRecordRequest,
            DownloadRecordResponse,
            AccessCheckRequest,
            LogicalState,
            DeleteRecordRequest,
            RestoreRecordRequest,
            RevokeShareRequest,
            RollbackRecordRequest,
            RollbackOutcome,
            LifecycleStep,
            AnnotationResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Records", description = "Protected upload, download and access checks"),
        (name = "Lifecycle", description = "Delete, restore, share revocation and rollback"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use base64ct::{Base64, Encoding};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn openapi_lists_record_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["paths"]["/v1/records"].is_object());
        assert!(doc["paths"]["/v1/records/{record_id}/download"].is_object());
    }

    #[tokio::test]
    async fn upload_download_delete_over_http() {
        let app = router(AppState::default());

        let (status, receipt) = send(
            &app,
            "POST",
            "/v1/records",
            serde_json::json!({
                "payload": Base64::encode_string(b"over the wire"),
                "password": "pw",
                "policy": { "access_control": "private", "allowed_users": ["alice"] }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = receipt["id"].as_str().unwrap().to_string();

        let (status, denied) = send(
            &app,
            "POST",
            &format!("/v1/records/{id}/download"),
            serde_json::json!({ "password": "pw", "caller": "bob" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(denied["error_code"], "access_denied");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/records/{id}/download"),
            serde_json::json!({ "password": "pw", "caller": "alice" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let payload = Base64::decode_vec(body["payload"].as_str().unwrap()).unwrap();
        assert_eq!(payload, b"over the wire");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/records/{id}/delete"),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, gone) = send(
            &app,
            "POST",
            &format!("/v1/records/{id}/download"),
            serde_json::json!({ "password": "pw", "caller": "alice" }),
        )
        .await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(gone["error_code"], "record_deleted");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = router(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
