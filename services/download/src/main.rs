use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::Duration;
use sea_orm::Database;
use tracing::info;

use codedrop_core::tracing::init_tracing;
use codedrop_download::config::DownloadConfig;
use codedrop_download::infra::secret::SecretKey;
use codedrop_download::router::build_router;
use codedrop_download::state::AppState;
use codedrop_download::usecase::link::LinkSigner;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = DownloadConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let secret = SecretKey::load_or_generate(Path::new(&config.secret_key_file))
        .expect("failed to load secret key");

    let state = AppState {
        db,
        signer: LinkSigner::new(secret.as_bytes()),
        link_ttl: Duration::seconds(config.link_ttl_secs),
        form_url: config.form_url,
        public_base_url: config.public_base_url,
        admin_token: config.admin_token,
        file_path: PathBuf::from(config.protected_file_path),
        file_name: config.download_file_name,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.download_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("download service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
