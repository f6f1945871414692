// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for a remote storage gateway.
//!
//! ## Wire API
//!
//! | Method | Path | Body / Query | Response |
//! |--------|------|--------------|----------|
//! | `POST` | `/records` | `{payload, metadata}` | `{id}` |
//! | `GET` | `/records/{id}` | | `{id, payload, metadata}` |
//! | `GET` | `/records` | `?original-transaction={id}` | `[{id, payload, metadata}]` |
//!
//! Payloads are standard base64. Metadata is a `[{name, value}]` list.

use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GatewayError, RecordId, StorageGateway, StoredRecord};
use crate::metadata::{keys, Metadata};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct PutRecordBody<'a> {
    payload: String,
    metadata: &'a Metadata,
}

#[derive(Deserialize)]
struct PutRecordResponse {
    id: String,
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
    id: String,
    payload: String,
    metadata: Metadata,
}

impl WireRecord {
    #[cfg(test)]
    fn from_record(record: &StoredRecord) -> Self {
        Self {
            id: record.id.to_string(),
            payload: Base64::encode_string(&record.payload),
            metadata: record.metadata.clone(),
        }
    }

    fn into_record(self) -> Result<StoredRecord, GatewayError> {
        let payload = Base64::decode_vec(&self.payload).map_err(|e| {
            GatewayError::InvalidResponse(format!("record {} payload is not base64: {e}", self.id))
        })?;
        Ok(StoredRecord {
            id: RecordId::new(self.id),
            payload,
            metadata: self.metadata,
        })
    }
}

/// Gateway reached over HTTP.
pub struct HttpGateway {
    base_url: Url,
    http: Client,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Request(format!("invalid gateway URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Request(format!(
                "gateway URL {base_url} cannot carry a path"
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/records`, or `{base}/records/{id}` with `id` escaped as a
    /// single path segment.
    fn records_url(&self, id: Option<&RecordId>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                GatewayError::Request(format!("gateway URL {} cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty().push("records");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }
}

/// A `put` the gateway accepted but whose id could not be read. The record
/// exists, so this is never reported as a plain failure.
fn landed_without_id(detail: String) -> GatewayError {
    tracing::warn!(error = %detail, "Gateway accepted a write but its id is unknown");
    GatewayError::UnknownOutcome(format!("POST /records {detail}"))
}

/// Classify a transport error on a read. Reads are idempotent, so a timeout
/// is just unavailability.
fn read_error(what: &str, e: reqwest::Error) -> GatewayError {
    if e.is_timeout() || e.is_connect() {
        GatewayError::Unavailable(format!("{what}: {e}"))
    } else {
        GatewayError::Request(format!("{what}: {e}"))
    }
}

async fn error_body(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("returned {status}: {body}")
}

#[async_trait]
impl StorageGateway for HttpGateway {
    async fn put(&self, payload: Vec<u8>, metadata: Metadata) -> Result<RecordId, GatewayError> {
        let body = PutRecordBody {
            payload: Base64::encode_string(&payload),
            metadata: &metadata,
        };

        let response = self
            .http
            .post(self.records_url(None)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GatewayError::Unavailable(format!("POST /records: {e}"))
                } else {
                    // The request may have reached the gateway.
                    tracing::warn!(error = %e, "Gateway write outcome unknown");
                    GatewayError::UnknownOutcome(format!("POST /records: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::Request(format!(
                "POST /records {}",
                error_body(response).await
            )));
        }

        let created: PutRecordResponse = response
            .json()
            .await
            .map_err(|e| landed_without_id(format!("response unreadable: {e}")))?;
        if created.id.trim().is_empty() {
            return Err(landed_without_id("returned an empty id".to_string()));
        }

        tracing::debug!(record_id = %created.id, "Stored record via gateway");
        Ok(RecordId::new(created.id))
    }

    async fn get(&self, id: &RecordId) -> Result<StoredRecord, GatewayError> {
        let what = format!("GET /records/{id}");
        let response = self
            .http
            .get(self.records_url(Some(id))?)
            .send()
            .await
            .map_err(|e| read_error(&what, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(GatewayError::NotFound(id.clone())),
            status if !status.is_success() => {
                return Err(GatewayError::Request(format!(
                    "{what} {}",
                    error_body(response).await
                )))
            }
            _ => {}
        }

        let wire: WireRecord = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("{what} invalid JSON: {e}")))?;
        wire.into_record()
    }

    async fn annotations_for(
        &self,
        original: &RecordId,
    ) -> Result<Vec<StoredRecord>, GatewayError> {
        let what = format!("GET /records?original-transaction={original}");
        let response = self
            .http
            .get(self.records_url(None)?)
            .query(&[("original-transaction", original.as_str())])
            .send()
            .await
            .map_err(|e| read_error(&what, e))?;

        if !response.status().is_success() {
            return Err(GatewayError::Request(format!(
                "{what} {}",
                error_body(response).await
            )));
        }

        let wire: Vec<WireRecord> = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("{what} invalid JSON: {e}")))?;

        let records = wire
            .into_iter()
            .map(WireRecord::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        // A gateway that ignores the filter would otherwise leak unrelated
        // records into the fold.
        Ok(records
            .into_iter()
            .filter(|r| r.metadata.get(keys::ORIGINAL_TRANSACTION) == Some(original.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode as AxumStatus,
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Deserialize)]
    struct PutBody {
        payload: String,
        metadata: Metadata,
    }

    async fn put_record(
        State(backend): State<Arc<InMemoryGateway>>,
        Json(body): Json<PutBody>,
    ) -> Json<serde_json::Value> {
        let payload = Base64::decode_vec(&body.payload).unwrap();
        let id = backend.put(payload, body.metadata).await.unwrap();
        Json(serde_json::json!({ "id": id }))
    }

    async fn get_record(
        State(backend): State<Arc<InMemoryGateway>>,
        Path(id): Path<String>,
    ) -> Result<Json<WireRecord>, AxumStatus> {
        backend
            .get(&RecordId::new(id))
            .await
            .map(|r| Json(WireRecord::from_record(&r)))
            .map_err(|_| AxumStatus::NOT_FOUND)
    }

    async fn list_records(
        State(backend): State<Arc<InMemoryGateway>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Vec<WireRecord>> {
        let original = RecordId::new(query["original-transaction"].clone());
        let records = backend.annotations_for(&original).await.unwrap();
        Json(records.iter().map(WireRecord::from_record).collect())
    }

    async fn spawn_gateway_server() -> String {
        let backend = Arc::new(InMemoryGateway::new());
        let app = Router::new()
            .route("/records", post(put_record).get(list_records))
            .route("/records/{id}", get(get_record))
            .with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(HttpGateway::new("not a url", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn record_ids_are_escaped_as_one_segment() {
        let gateway = HttpGateway::new("http://localhost:9000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            gateway.records_url(None).unwrap().as_str(),
            "http://localhost:9000/records"
        );
        let url = gateway
            .records_url(Some(&RecordId::from("a/b?c#d")))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/records/a%2Fb%3Fc%23d");

        let nested = HttpGateway::new("http://localhost:9000/gw", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            nested.records_url(None).unwrap().as_str(),
            "http://localhost:9000/gw/records"
        );
    }

    #[tokio::test]
    async fn round_trips_through_remote_gateway() {
        let base = spawn_gateway_server().await;
        let gateway = HttpGateway::new(&base, DEFAULT_TIMEOUT).unwrap();

        let id = gateway
            .put(vec![0, 1, 2, 255], Metadata::new().with("Content-Type", "bin"))
            .await
            .unwrap();
        let record = gateway.get(&id).await.unwrap();
        assert_eq!(record.payload, vec![0, 1, 2, 255]);
        assert_eq!(record.metadata.get("Content-Type"), Some("bin"));

        let annotation = gateway
            .put(
                Vec::new(),
                Metadata::new().with(keys::ORIGINAL_TRANSACTION, id.as_str()),
            )
            .await
            .unwrap();
        let annotations = gateway.annotations_for(&id).await.unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].id, annotation);
    }

    #[tokio::test]
    async fn missing_remote_record_is_not_found() {
        let base = spawn_gateway_server().await;
        let gateway = HttpGateway::new(&base, DEFAULT_TIMEOUT).unwrap();
        let err = gateway.get(&RecordId::from("missing")).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        // Unescaped, this id would reach the listing endpoint instead.
        let err = gateway
            .get(&RecordId::from("x?original-transaction=y"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn slow_put_is_unknown_outcome() {
        let app = Router::new().route(
            "/records",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "id": "late" }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let gateway =
            HttpGateway::new(&format!("http://{addr}"), Duration::from_millis(200)).unwrap();
        let err = gateway.put(Vec::new(), Metadata::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownOutcome(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = HttpGateway::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
        let err = gateway.put(Vec::new(), Metadata::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn stalled_body_after_accepted_put_is_unknown_outcome() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"id\":",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let gateway =
            HttpGateway::new(&format!("http://{addr}"), Duration::from_millis(300)).unwrap();
        let err = gateway.put(Vec::new(), Metadata::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownOutcome(_)));
    }

    #[tokio::test]
    async fn garbled_put_response_is_unknown_outcome() {
        let app = Router::new().route("/records", post(|| async { "created" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let gateway = HttpGateway::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
        let err = gateway.put(Vec::new(), Metadata::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownOutcome(_)));
    }
}
