//! Document upload and retrieval over the blob store

use std::sync::atomic::{AtomicI64, Ordering};

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    errors::{timestamp_now, AppError},
    AppState,
};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const UPLOAD_PREFIX: &str = "uploads";

/// Allocates `uploads/<ms>-<filename>` keys. The millisecond component never
/// lags wall-clock time and strictly increases per instance, so two uploads
/// handled here cannot share a key.
#[derive(Debug, Default)]
pub struct DocumentKeys {
    last_millis: AtomicI64,
}

impl DocumentKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, filename: &str) -> String {
        let millis = self.next_millis(Utc::now().timestamp_millis());
        format!("{UPLOAD_PREFIX}/{millis}-{filename}")
    }

    fn next_millis(&self, now: i64) -> i64 {
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub document_id: String,
    pub filename: String,
    pub size: u64,
    pub timestamp: String,
}

struct FilePart {
    filename: String,
    content_type: String,
    data: bytes::Bytes,
}

pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|err| {
        debug!(error = %err, "upload body is not a multipart form");
        AppError::Validation("No file provided")
    })?;

    let file = read_file_part(&mut multipart)
        .await?
        .ok_or(AppError::Validation("No file provided"))?;

    let key = state.document_keys.allocate(&file.filename);
    let size = file.data.len() as u64;
    state
        .blob_store
        .put(&key, file.data, &file.content_type)
        .await
        .map_err(|err| AppError::storage("Upload", err))?;

    state.metrics.record_upload();
    info!(document_id = %key, size, "document uploaded");

    Ok(Json(UploadResponse {
        status: "success",
        message: "Document uploaded successfully",
        document_id: key,
        filename: file.filename,
        size,
        timestamp: timestamp_now(),
    }))
}

async fn read_file_part(multipart: &mut Multipart) -> Result<Option<FilePart>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        debug!(error = %err, "failed to read multipart field");
        AppError::Validation("No file provided")
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let data = field.bytes().await.map_err(|err| {
            debug!(error = %err, "failed to read uploaded file");
            AppError::Validation("No file provided")
        })?;

        return Ok(Some(FilePart {
            filename,
            content_type,
            data,
        }));
    }

    Ok(None)
}

pub async fn retrieve_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Response, AppError> {
    if document_id.trim().is_empty() {
        return Err(AppError::Validation("Document ID required"));
    }

    let object = state
        .blob_store
        .get(&document_id)
        .await
        .map_err(|err| AppError::storage("Retrieval", err))?
        .ok_or(AppError::NotFound("Document not found"))?;

    state.metrics.record_retrieval();
    let content_type = object
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, object.size.to_string()),
        ],
        Body::from(object.body),
    )
        .into_response())
}

pub async fn missing_document_id() -> AppError {
    AppError::Validation("Document ID required")
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
