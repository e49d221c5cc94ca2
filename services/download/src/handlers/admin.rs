use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::types::CodeStats;
use crate::error::DownloadServiceError;
use crate::state::AppState;
use crate::usecase::admin::{
    ClearCodesUseCase, GenerateCodesInput, GenerateCodesUseCase, ListUnusedCodesUseCase,
    StatsUseCase,
};

/// Every /admin route requires the configured operator token as a bearer
/// credential. Compared in constant time.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), DownloadServiceError> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(DownloadServiceError::Unauthorized)?;

    if !constant_time_eq(provided.as_bytes(), state.admin_token.as_bytes()) {
        return Err(DownloadServiceError::Unauthorized);
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

// ── POST /admin/codes ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateCodesRequest {
    pub count: u32,
}

#[derive(Serialize)]
pub struct GenerateCodesResponse {
    pub generated: u64,
}

pub async fn generate_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateCodesRequest>,
) -> Result<(StatusCode, Json<GenerateCodesResponse>), DownloadServiceError> {
    require_admin(&state, &headers)?;

    let usecase = GenerateCodesUseCase {
        codes: state.code_repo(),
    };
    let generated = usecase
        .execute(GenerateCodesInput { count: body.count }, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateCodesResponse { generated }),
    ))
}

// ── GET /admin/stats ──────────────────────────────────────────────────────────

pub async fn get_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CodeStats>, DownloadServiceError> {
    require_admin(&state, &headers)?;

    let usecase = StatsUseCase {
        codes: state.code_repo(),
    };
    Ok(Json(usecase.execute().await?))
}

// ── GET /admin/codes/unused ───────────────────────────────────────────────────

/// CSV export of unused codes for offline distribution.
pub async fn export_unused_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, DownloadServiceError> {
    require_admin(&state, &headers)?;

    let usecase = ListUnusedCodesUseCase {
        codes: state.code_repo(),
    };
    let codes = usecase.execute().await?;

    let filename = format!("codes-{}.csv", Utc::now().format("%Y-%m-%d"));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(unused_codes_csv(&codes).into())
        .map_err(|err| anyhow::Error::new(err).context("build csv response").into())
}

fn unused_codes_csv(codes: &[String]) -> String {
    let mut csv = String::from("Download Code\n");
    for code in codes {
        csv.push_str(code);
        csv.push('\n');
    }
    csv
}

// ── DELETE /admin/codes ───────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ClearCodesResponse {
    pub deleted: u64,
}

pub async fn clear_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClearCodesResponse>, DownloadServiceError> {
    require_admin(&state, &headers)?;

    let usecase = ClearCodesUseCase {
        codes: state.code_repo(),
    };
    let deleted = usecase.execute().await?;
    Ok(Json(ClearCodesResponse { deleted }))
}
