use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Download service error variants.
///
/// Redemption refusals (invalid / already used / max attempts) are not
/// errors; they are outcomes the form endpoint turns into redirect
/// indicators. This enum covers the capability-fetch and admin failures
/// that surface as HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum DownloadServiceError {
    #[error("download link expired")]
    LinkExpired,
    #[error("access denied")]
    AccessDenied,
    #[error("file unavailable, please contact support")]
    FileMissing,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid request")]
    InvalidRequest,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl DownloadServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LinkExpired => "LINK_EXPIRED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::FileMissing => "FILE_MISSING",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for DownloadServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::LinkExpired | Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::FileMissing => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status for all
        // requests. 4xx are expected client errors; logging them here would be noise.
        // Internal errors need the anyhow chain logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
