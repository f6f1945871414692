// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::ApiError,
    gateway::RecordId,
    lifecycle::LogicalState,
    models::{
        AccessCheckRequest, DownloadRecordRequest, DownloadRecordResponse, UploadRecordRequest,
    },
    policy::{AccessPolicy, Decision},
    state::AppState,
    vault::{DownloadRequest, UploadReceipt},
};

#[utoipa::path(
    post,
    path = "/v1/records",
    request_body = UploadRecordRequest,
    tag = "Records",
    responses(
        (status = 201, body = UploadReceipt),
        (status = 400, description = "Invalid payload, password, policy or tags")
    )
)]
pub async fn upload_record(
    State(state): State<AppState>,
    Json(request): Json<UploadRecordRequest>,
) -> Result<(StatusCode, Json<UploadReceipt>), ApiError> {
    let upload = request.into_upload().map_err(ApiError::bad_request)?;
    let receipt = state.vault.upload_protected(upload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/download",
    params(("record_id" = String, Path, description = "Original record id")),
    request_body = DownloadRecordRequest,
    tag = "Records",
    responses(
        (status = 200, body = DownloadRecordResponse),
        (status = 403, description = "Denied by policy or share revocation"),
        (status = 404, description = "Record not found"),
        (status = 410, description = "Record deleted"),
        (status = 422, description = "Decryption failed")
    )
)]
pub async fn download_record(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<DownloadRecordRequest>,
) -> Result<Json<DownloadRecordResponse>, ApiError> {
    let downloaded = state
        .vault
        .download_protected(
            &RecordId::from(record_id),
            DownloadRequest {
                password: request.password,
                caller: request.caller,
                now_ms: Utc::now().timestamp_millis(),
            },
        )
        .await?;
    Ok(Json(downloaded.into()))
}

#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/access",
    params(("record_id" = String, Path, description = "Original record id")),
    request_body = AccessCheckRequest,
    tag = "Records",
    responses((status = 200, body = Decision))
)]
pub async fn check_access(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AccessCheckRequest>,
) -> Result<Json<Decision>, ApiError> {
    let now_ms = request.at.unwrap_or_else(|| Utc::now().timestamp_millis());
    let decision = state
        .vault
        .check_access(&RecordId::from(record_id), request.caller.as_deref(), now_ms)
        .await?;
    Ok(Json(decision))
}

#[utoipa::path(
    get,
    path = "/v1/records/{record_id}/policy",
    params(("record_id" = String, Path, description = "Original record id")),
    tag = "Records",
    responses((status = 200, body = Option<AccessPolicy>))
)]
pub async fn get_policy(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Option<AccessPolicy>>, ApiError> {
    let policy = state.vault.record_policy(&RecordId::from(record_id)).await?;
    Ok(Json(policy))
}

#[utoipa::path(
    get,
    path = "/v1/records/{record_id}/state",
    params(("record_id" = String, Path, description = "Original record id")),
    tag = "Records",
    responses((status = 200, body = LogicalState))
)]
pub async fn get_state(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LogicalState>, ApiError> {
    let logical = state.vault.state(&RecordId::from(record_id)).await?;
    Ok(Json(logical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::policy::AccessControl;
    use base64ct::{Base64, Encoding};

    fn upload_body(payload: &[u8], password: Option<&str>) -> UploadRecordRequest {
        UploadRecordRequest {
            payload: Base64::encode_string(payload),
            password: password.map(str::to_string),
            policy: None,
            owner: None,
            tags: Metadata::new().with("Content-Type", "text/plain"),
        }
    }

    async fn upload(state: &AppState, request: UploadRecordRequest) -> UploadReceipt {
        let (status, Json(receipt)) = upload_record(State(state.clone()), Json(request))
            .await
            .expect("upload succeeds");
        assert_eq!(status, StatusCode::CREATED);
        receipt
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let state = AppState::default();
        let receipt = upload(&state, upload_body(b"quarterly numbers", Some("pw"))).await;
        assert!(receipt.encrypted);

        let Json(downloaded) = download_record(
            Path(receipt.id.to_string()),
            State(state.clone()),
            Json(DownloadRecordRequest {
                password: Some("pw".into()),
                caller: None,
            }),
        )
        .await
        .expect("download succeeds");

        assert_eq!(downloaded.id, receipt.id);
        assert_eq!(
            Base64::decode_vec(&downloaded.payload).unwrap(),
            b"quarterly numbers"
        );
        assert_eq!(downloaded.tags.get("Content-Type"), Some("text/plain"));
    }

    #[tokio::test]
    async fn wrong_password_is_unprocessable() {
        let state = AppState::default();
        let receipt = upload(&state, upload_body(b"x", Some("pw"))).await;

        let err = download_record(
            Path(receipt.id.to_string()),
            State(state),
            Json(DownloadRecordRequest {
                password: Some("nope".into()),
                caller: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code, "decryption_failed");
    }

    #[tokio::test]
    async fn policy_denial_is_forbidden() {
        let state = AppState::default();
        let mut request = upload_body(b"x", None);
        request.policy = Some(AccessPolicy::new(AccessControl::Private).allowing(["alice"]));
        let receipt = upload(&state, request).await;

        let err = download_record(
            Path(receipt.id.to_string()),
            State(state.clone()),
            Json(DownloadRecordRequest {
                password: None,
                caller: Some("mallory".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(decision) = check_access(
            Path(receipt.id.to_string()),
            State(state.clone()),
            Json(AccessCheckRequest {
                caller: Some("alice".into()),
                at: None,
            }),
        )
        .await
        .unwrap();
        assert!(decision.allow);

        let Json(policy) = get_policy(Path(receipt.id.to_string()), State(state))
            .await
            .unwrap();
        assert_eq!(
            policy.unwrap().allowed_users.into_iter().collect::<Vec<_>>(),
            vec!["alice".to_string()]
        );
    }

    #[tokio::test]
    async fn bad_base64_is_bad_request() {
        let state = AppState::default();
        let mut request = upload_body(b"x", None);
        request.payload = "%%%".into();

        let err = upload_record(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let state = AppState::default();
        let err = get_policy(Path("missing".into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fresh_record_state_is_pristine() {
        let state = AppState::default();
        let receipt = upload(&state, upload_body(b"x", None)).await;

        let Json(logical) = get_state(Path(receipt.id.to_string()), State(state))
            .await
            .unwrap();
        assert!(!logical.deleted);
        assert_eq!(logical.current_version, receipt.id);
    }
}
