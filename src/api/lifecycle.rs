// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    gateway::RecordId,
    lifecycle::RollbackOutcome,
    models::{
        AnnotationResponse, DeleteRecordRequest, RestoreRecordRequest, RevokeShareRequest,
        RollbackRecordRequest,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/delete",
    params(("record_id" = String, Path, description = "Original record id")),
    request_body = DeleteRecordRequest,
    tag = "Lifecycle",
    responses((status = 201, body = AnnotationResponse))
)]
pub async fn delete_record(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<DeleteRecordRequest>,
) -> Result<(StatusCode, Json<AnnotationResponse>), ApiError> {
    let annotation_id = state
        .vault
        .lifecycle()
        .mark_deleted(
            &RecordId::from(record_id),
            request.permanent,
            request.actor.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(AnnotationResponse { annotation_id })))
}

#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/restore",
    params(("record_id" = String, Path, description = "Original record id")),
    request_body = RestoreRecordRequest,
    tag = "Lifecycle",
    responses(
        (status = 201, body = AnnotationResponse),
        (status = 409, description = "Record is permanently deleted")
    )
)]
pub async fn restore_record(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RestoreRecordRequest>,
) -> Result<(StatusCode, Json<AnnotationResponse>), ApiError> {
    let annotation_id = state
        .vault
        .lifecycle()
        .restore(&RecordId::from(record_id), request.actor.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(AnnotationResponse { annotation_id })))
}

#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/revoke",
    params(("record_id" = String, Path, description = "Original record id")),
    request_body = RevokeShareRequest,
    tag = "Lifecycle",
    responses(
        (status = 201, body = AnnotationResponse),
        (status = 400, description = "Neither a user nor revoke_all was given")
    )
)]
pub async fn revoke_share(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RevokeShareRequest>,
) -> Result<(StatusCode, Json<AnnotationResponse>), ApiError> {
    let annotation_id = state
        .vault
        .lifecycle()
        .revoke_share(
            &RecordId::from(record_id),
            request.user.as_deref(),
            request.revoke_all,
            request.actor.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(AnnotationResponse { annotation_id })))
}

#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/rollback",
    params(("record_id" = String, Path, description = "Original record id")),
    request_body = RollbackRecordRequest,
    tag = "Lifecycle",
    responses(
        (status = 201, body = RollbackOutcome),
        (status = 400, description = "Target is not a version of this record"),
        (status = 502, description = "Backup written but rollback failed")
    )
)]
pub async fn rollback_record(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RollbackRecordRequest>,
) -> Result<(StatusCode, Json<RollbackOutcome>), ApiError> {
    let outcome = state
        .vault
        .lifecycle()
        .rollback(
            &RecordId::from(record_id),
            &request.target,
            request.create_backup,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
