use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use codedrop_core::health::{healthz, readyz};
use codedrop_core::middleware::request_id_layer;

use crate::handlers::{
    admin::{clear_codes, export_unused_codes, generate_codes, get_stats},
    download::fetch_file,
    redeem::{get_form_token, submit_code},
};
use crate::state::AppState;

// No timeout layer anywhere on this router: /download/file may stream for
// as long as the transfer takes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Redemption
        .route("/download/form-token", get(get_form_token))
        .route("/download", post(submit_code))
        // Capability fetch
        .route("/download/file", get(fetch_file))
        // Admin
        .route("/admin/codes", post(generate_codes))
        .route("/admin/codes", delete(clear_codes))
        .route("/admin/codes/unused", get(export_unused_codes))
        .route("/admin/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
