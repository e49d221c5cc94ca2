use std::path::PathBuf;

use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::infra::db::DbCodeRepository;
use crate::usecase::link::LinkSigner;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub signer: LinkSigner,
    pub link_ttl: Duration,
    pub form_url: String,
    pub public_base_url: String,
    pub admin_token: String,
    pub file_path: PathBuf,
    pub file_name: String,
}

impl AppState {
    pub fn code_repo(&self) -> DbCodeRepository {
        DbCodeRepository {
            db: self.db.clone(),
        }
    }
}
