// HTTP server - exposes the upload/anonymize/download/cleanup pipeline

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine;
use crate::error::ApiError;
use crate::store::SessionStore;
use crate::table::{delimiter_name, Document};

/// Uploads larger than this are rejected by the body limit layer.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
}

pub fn router(store: Arc<SessionStore>) -> Router {
    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/anonymize", post(anonymize))
        .route("/download/:file_id", get(download))
        .route("/cleanup/:file_id", post(cleanup))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_http_server(store: Arc<SessionStore>, port: u16) {
    let app = router(store);

    let addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server to port {}: {}", port, e);
            return;
        }
    };
    tracing::info!("Listening on http://{}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}

#[derive(Serialize)]
struct UploadResponse {
    file_id: String,
    columns: Vec<String>,
    row_count: usize,
    delimiter: &'static str,
    encoding: &'static str,
}

#[derive(Deserialize)]
struct AnonymizeRequest {
    file_id: String,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    secret_key: String,
}

#[derive(Serialize)]
struct AnonymizeResponse {
    anonymized_columns: Vec<String>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /upload - parse a multipart CSV upload into a new session
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::InvalidRequest(format!("Invalid multipart payload: {}", e))
    })? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field.bytes().await.map_err(|e| {
                ApiError::InvalidRequest(format!("Could not read upload: {}", e))
            })?;
            file = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) =
        file.ok_or_else(|| ApiError::InvalidRequest("No file provided".to_string()))?;
    if filename.is_empty() {
        return Err(ApiError::InvalidRequest("No file selected".to_string()));
    }
    if !filename.to_lowercase().ends_with(".csv") {
        return Err(ApiError::InvalidRequest(
            "Only CSV files are allowed".to_string(),
        ));
    }
    if data.is_empty() {
        return Err(ApiError::InvalidRequest("File is empty".to_string()));
    }

    // Parse fully before creating the session, so an aborted or malformed
    // upload never leaves a half-built entry in the store
    let parsed = Document::parse(&data)?;
    let columns = parsed.document.columns.clone();
    let row_count = parsed.document.row_count();
    let file_id = state
        .store
        .create(parsed.document, sanitize_filename(&filename));

    tracing::info!(file_id, row_count, columns = columns.len(), "upload accepted");

    Ok(Json(UploadResponse {
        file_id,
        columns,
        row_count,
        delimiter: delimiter_name(parsed.delimiter),
        encoding: parsed.encoding,
    }))
}

/// POST /anonymize - apply the keyed transform to the selected columns
async fn anonymize(
    State(state): State<AppState>,
    Json(req): Json<AnonymizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let anonymized_columns =
        engine::anonymize(&state.store, &req.file_id, &req.columns, &req.secret_key).await?;
    Ok(Json(AnonymizeResponse { anonymized_columns }))
}

/// GET /download/:file_id - render the session's current document.
/// Permitted before or after anonymization, and repeatable.
async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.get(&file_id).ok_or(ApiError::NotFound)?;
    let guard = session.read().await;
    let body = guard.document.render()?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_filename(&guard.original_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// POST /cleanup/:file_id - drop the session. Idempotent: cleaning up an
/// unknown or already-removed id still succeeds.
async fn cleanup(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> impl IntoResponse {
    let existed = state.store.remove(&file_id);
    tracing::debug!(file_id, existed, "cleanup");
    Json(serde_json::json!({ "success": true }))
}

/// Reduce a client-supplied filename to a safe basename for storage.
fn sanitize_filename(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = basename
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload.csv".to_string()
    } else {
        cleaned
    }
}

/// Derive the download filename: strip a trailing `.csv` if present and
/// append `-anonymized.csv`.
fn download_filename(original_name: &str) -> String {
    let base = if original_name.to_lowercase().ends_with(".csv") {
        &original_name[..original_name.len() - 4]
    } else {
        original_name
    };
    format!("{}-anonymized.csv", base)
}
