//! REST API over the document service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/status` | Liveness check with the current UTC time |
//! | `POST`   | `/documents` | Multipart upload (`file`, optional `metadata` JSON) |
//! | `GET`    | `/documents` | Paged listing, newest first |
//! | `GET`    | `/documents/{id}` | One document |
//! | `DELETE` | `/documents/{id}` | Delete a document with its chunks and blob |
//! | `POST`   | `/documents/{id}/process` | Run the chunking pipeline |
//! | `GET`    | `/documents/{id}/chunks` | Chunks in position order |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document doc_1a2b3c4d5e6f" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `payload_too_large`
//! (413, upload over `[server].max_upload_bytes`), `misconfigured` (500),
//! `storage_error` (500), `internal` (500).

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use doc_ingest_core::models::{ChunkList, Document, DocumentMetadata};
use doc_ingest_core::Error;

use crate::app;
use crate::config::Config;
use crate::service::{DeleteOutcome, DocumentService};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

#[derive(Clone)]
struct AppState {
    service: DocumentService,
}

/// Open the catalog and blob store described by `config` and serve the API
/// on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = app::open_service(config).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    serve(listener, service, config.server.max_upload_bytes).await
}

/// Serve the API on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    service: DocumentService,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    axum::serve(listener, router(service, max_upload_bytes)).await?;
    Ok(())
}

/// Build the router with tracing and permissive CORS layers. Upload bodies
/// larger than `max_upload_bytes` are answered with 413.
pub fn router(service: DocumentService, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(handle_status))
        .route(
            "/documents",
            post(handle_upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .get(handle_list),
        )
        .route("/documents/{id}", get(handle_get).delete(handle_delete))
        .route("/documents/{id}/process", post(handle_process))
        .route("/documents/{id}/chunks", get(handle_chunks))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::Misconfigured(_) | Error::Storage(_) | Error::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", err);
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Multipart failures are client errors; an oversized body keeps its 413.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "payload_too_large".to_string(),
            message: format!("{}: {}", context, err.body_text()),
        };
    }
    bad_request(format!("{}: {}", context, err.body_text()))
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    timestamp: String,
}

async fn handle_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    })
}

// ============ POST /documents ============

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut metadata: Option<DocumentMetadata> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("invalid multipart body", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("failed to read file", e))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("failed to read metadata", e))?;
                if !text.trim().is_empty() {
                    let parsed: DocumentMetadata = serde_json::from_str(&text)
                        .map_err(|e| bad_request(format!("Invalid metadata JSON: {}", e)))?;
                    metadata = Some(parsed);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| bad_request("missing 'file' field"))?;
    let document = state.service.upload(&filename, &bytes, metadata).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<Document>,
    total: u64,
    limit: u32,
    offset: u32,
}

async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse>, AppError> {
    let limit = paging_param(&params, "limit", DEFAULT_LIMIT, 1, MAX_LIMIT)?;
    let offset = paging_param(&params, "offset", 0, 0, u32::MAX)?;

    let page = state.service.list(limit, offset).await?;
    Ok(Json(ListResponse {
        documents: page.documents,
        total: page.total,
        limit,
        offset,
    }))
}

/// Parse an optional integer query parameter within `[min, max]`.
fn paging_param(
    params: &HashMap<String, String>,
    name: &str,
    default: u32,
    min: u32,
    max: u32,
) -> Result<u32, AppError> {
    let Some(raw) = params.get(name) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| {
            bad_request(format!(
                "{} must be an integer between {} and {}, got '{}'",
                name, min, max, raw
            ))
        })
}

// ============ GET / DELETE /documents/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    match state.service.get(&id).await? {
        Some(document) => Ok(Json(document)),
        None => Err(not_found("Document not found")),
    }
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    match state.service.delete(&id).await? {
        DeleteOutcome::Deleted(report) if report.document_removed => Ok(StatusCode::NO_CONTENT),
        _ => Err(not_found("Document not found")),
    }
}

// ============ POST /documents/{id}/process ============

#[derive(Serialize)]
struct ProcessResponse {
    status: String,
    message: String,
    chunk_count: u64,
}

async fn handle_process(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ProcessResponse>), AppError> {
    let outcome = state.service.process(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            status: "processing".to_string(),
            message: format!(
                "document {} processed into {} chunks",
                outcome.document_id, outcome.chunk_count
            ),
            chunk_count: outcome.chunk_count,
        }),
    ))
}

// ============ GET /documents/{id}/chunks ============

async fn handle_chunks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChunkList>, AppError> {
    Ok(Json(state.service.get_chunks(&id).await?))
}
