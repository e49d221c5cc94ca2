/// Download service configuration loaded from environment variables.
#[derive(Debug)]
pub struct DownloadConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Path to the persisted HMAC secret key file. Created on first start.
    pub secret_key_file: String,
    /// Absolute path of the one protected file this service delivers.
    pub protected_file_path: String,
    /// Filename announced in the attachment disposition (default "download.zip").
    pub download_file_name: String,
    /// URL of the public code-entry form; failed redemptions redirect here
    /// with a `msg` indicator appended.
    pub form_url: String,
    /// Public base URL of this service, used to build capability URLs.
    pub public_base_url: String,
    /// Static bearer token required on every /admin route.
    pub admin_token: String,
    /// Capability link time-to-live in seconds (default 1). Env var: `LINK_TTL_SECS`.
    pub link_ttl_secs: i64,
    /// TCP port to listen on (default 3117). Env var: `DOWNLOAD_PORT`.
    pub download_port: u16,
}

impl DownloadConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            secret_key_file: std::env::var("SECRET_KEY_FILE").expect("SECRET_KEY_FILE"),
            protected_file_path: std::env::var("PROTECTED_FILE_PATH")
                .expect("PROTECTED_FILE_PATH"),
            download_file_name: std::env::var("DOWNLOAD_FILE_NAME")
                .unwrap_or_else(|_| "download.zip".to_owned()),
            form_url: std::env::var("FORM_URL").expect("FORM_URL"),
            public_base_url: std::env::var("PUBLIC_BASE_URL").expect("PUBLIC_BASE_URL"),
            admin_token: std::env::var("ADMIN_TOKEN").expect("ADMIN_TOKEN"),
            link_ttl_secs: std::env::var("LINK_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            download_port: std::env::var("DOWNLOAD_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3117),
        }
    }
}
