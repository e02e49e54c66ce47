//! Routes for public retrieval and upload intake.

use crate::ApiError;
use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use larder_error::{ServerError, ServerErrorKind};
use larder_storage::{FileStorage, ServerSettings, UploadedFile, Uploads};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared state for every route.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<FileStorage>,
    settings: Arc<ServerSettings>,
}

impl AppState {
    /// Create state over an engine and the adapter settings.
    pub fn new(storage: Arc<FileStorage>, settings: ServerSettings) -> Self {
        Self {
            storage,
            settings: Arc::new(settings),
        }
    }

    /// The storage engine.
    pub fn storage(&self) -> &Arc<FileStorage> {
        &self.storage
    }

    /// Adapter settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }
}

/// Build the router.
///
/// - `GET {public_path}/*name`: serve a cached file, rebuilding a missing entry
/// - `POST {tmp_path}`: stage a multipart upload
/// - `GET /health`
pub fn create_router(state: AppState) -> Router {
    let config = state.storage.config();
    let public_route = format!("{}/*name", config.public_path());
    let upload_route = config.tmp_path().clone();

    tracing::debug!(public_route = %public_route, upload_route = %upload_route, "Building router");

    Router::new()
        .route("/health", get(health_check))
        .route(&public_route, get(retrieve))
        .route(&upload_route, post(upload))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "backend": state.storage.backend().name() })),
    )
}

/// Query flags of the retrieval endpoint.
#[derive(Debug, Default, Deserialize)]
struct RetrieveParams {
    d: Option<String>,
    download: Option<String>,
}

impl RetrieveParams {
    fn wants_download(&self) -> bool {
        [&self.d, &self.download]
            .into_iter()
            .any(|flag| flag.as_deref() == Some("1"))
    }
}

/// Serve a public file.
///
/// An existing cache entry is served as is; on a miss the entry is rebuilt
/// from the backend.
#[tracing::instrument(skip(state, params))]
async fn retrieve(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RetrieveParams>,
) -> Result<Response, ApiError> {
    let reference = format!("{}{}", state.storage.public_root(), name);

    let contents = match state.storage.read_cached(&reference).await? {
        Some(contents) => contents,
        None => state.storage.cache(&reference).await?,
    };

    let filename = name.rsplit('/').next().unwrap_or(name.as_str());
    let response = if params.wants_download() {
        download_response(filename, contents)
    } else {
        inline_response(filename, contents)
    };

    Ok(response)
}

fn inline_response(filename: &str, contents: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    let mut response = Response::new(Body::from(contents));

    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

fn download_response(filename: &str, contents: Vec<u8>) -> Response {
    let length = contents.len();
    let mut response = Response::new(Body::from(contents));
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        HeaderName::from_static("content-description"),
        HeaderValue::from_static("File Transfer"),
    );
    headers.insert(
        HeaderName::from_static("content-transfer-encoding"),
        HeaderValue::from_static("binary"),
    );
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("must-revalidate, post-check=0, pre-check=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("public"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "'"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    } else {
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment"),
        );
    }

    response
}

/// Stage an upload.
///
/// Every file part of the body becomes an [`UploadedFile`]; the one under the
/// configured field is staged.
#[tracing::instrument(skip_all)]
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut uploads = Uploads::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Multipart(e.to_string())))
        .map_err(larder_error::LarderError::from)?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let contents = field
            .bytes()
            .await
            .map_err(|e| ServerError::new(ServerErrorKind::Multipart(e.to_string())))
            .map_err(larder_error::LarderError::from)?;

        uploads.insert(UploadedFile::new(
            field_name,
            filename,
            content_type,
            contents.to_vec(),
        ));
    }

    let settings = state.settings();
    let allowed: Vec<&str> = settings.allowed_types().iter().map(String::as_str).collect();
    let allowed = (!allowed.is_empty()).then_some(allowed.as_slice());

    let name = state
        .storage
        .prepare(&uploads, settings.upload_field(), allowed)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "name": name }))))
}
