use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Form, State},
    http::HeaderMap,
    response::Redirect,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DownloadServiceError;
use crate::handlers::client_ip;
use crate::state::AppState;
use crate::usecase::link::IssuedLink;
use crate::usecase::redeem::{RedeemCodeInput, RedeemCodeUseCase, Redeemed};

// ── GET /download/form-token ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct FormTokenResponse {
    pub form_token: String,
}

/// Anti-forgery token for the code-entry form. The form page fetches one
/// and posts it back with the code.
pub async fn get_form_token(State(state): State<AppState>) -> Json<FormTokenResponse> {
    Json(FormTokenResponse {
        form_token: state.signer.issue_form_token(Utc::now()),
    })
}

// ── POST /download ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitCodeRequest {
    pub download_code: String,
    pub form_token: String,
}

pub async fn submit_code(
    State(state): State<AppState>,
    connect: ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(body): Form<SubmitCodeRequest>,
) -> Result<Redirect, DownloadServiceError> {
    let now = Utc::now();

    // A bad or stale form token redirects like a bad code; it carries no
    // information worth distinguishing for the submitter.
    if !state.signer.verify_form_token(&body.form_token, now) {
        return Ok(error_redirect(&state.form_url, "invalid"));
    }

    let usecase = RedeemCodeUseCase {
        codes: state.code_repo(),
        signer: state.signer.clone(),
        link_ttl: state.link_ttl,
    };

    let redeemed = usecase
        .execute(
            RedeemCodeInput {
                code: body.download_code,
                requester_ip: client_ip(&headers, &connect),
            },
            now,
        )
        .await?;

    match redeemed {
        Redeemed::Granted(link) => Ok(Redirect::to(&capability_url(
            &state.public_base_url,
            &link,
        ))),
        Redeemed::Refused(reason) => Ok(error_redirect(&state.form_url, reason.indicator())),
    }
}

fn capability_url(base_url: &str, link: &IssuedLink) -> String {
    format!(
        "{}/download/file?dl=1&token={}&expires={}&sig={}",
        base_url.trim_end_matches('/'),
        link.token,
        link.expires,
        link.signature
    )
}

fn error_redirect(form_url: &str, indicator: &str) -> Redirect {
    let separator = if form_url.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{form_url}{separator}msg={indicator}"))
}
