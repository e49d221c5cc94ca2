use std::net::SocketAddr;
use std::path::Path;

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::error::DownloadServiceError;
use crate::handlers::client_ip;
use crate::state::AppState;
use crate::usecase::link::{FetchDownloadInput, FetchDownloadUseCase};

/// Files at or above this size are streamed in chunks instead of being
/// read into memory whole.
const STREAM_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

/// Chunk size for the streaming path.
const STREAM_CHUNK_BYTES: usize = 8192;

// ── GET /download/file ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FetchFileQuery {
    /// Download marker flag; must be "1".
    pub dl: String,
    pub token: String,
    pub expires: i64,
    pub sig: String,
}

pub async fn fetch_file(
    State(state): State<AppState>,
    connect: ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<FetchFileQuery>,
) -> Result<Response, DownloadServiceError> {
    if query.dl != "1" {
        return Err(DownloadServiceError::InvalidRequest);
    }

    let usecase = FetchDownloadUseCase {
        codes: state.code_repo(),
        signer: state.signer.clone(),
    };
    // Verification completes (and releases its store connection) before any
    // byte of the file is read.
    usecase
        .execute(
            FetchDownloadInput {
                token: query.token,
                expires: query.expires,
                signature: query.sig,
                requester_ip: client_ip(&headers, &connect),
            },
            Utc::now(),
        )
        .await?;

    serve_protected_file(&state.file_path, &state.file_name).await
}

/// Stream the configured file. The path comes from configuration alone,
/// never from the request.
async fn serve_protected_file(
    path: &Path,
    file_name: &str,
) -> Result<Response, DownloadServiceError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DownloadServiceError::FileMissing);
        }
        Err(err) => {
            return Err(DownloadServiceError::Internal(
                anyhow::Error::new(err).context("stat protected file"),
            ));
        }
    };
    if !metadata.is_file() {
        return Err(DownloadServiceError::FileMissing);
    }
    let len = metadata.len();

    let body = if len < STREAM_THRESHOLD_BYTES {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| anyhow::Error::new(err).context("read protected file"))?;
        Body::from(bytes)
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| anyhow::Error::new(err).context("open protected file"))?;
        Body::from_stream(ReaderStream::with_capacity(file, STREAM_CHUNK_BYTES))
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header(header::ACCEPT_RANGES, "bytes")
        .body(body)
        .map_err(|err| anyhow::Error::new(err).context("build file response").into())
}
