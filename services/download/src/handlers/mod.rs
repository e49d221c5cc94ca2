pub mod admin;
pub mod download;
pub mod redeem;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;

/// Client address as seen by the redemption and delivery endpoints.
/// Prefers the first `x-forwarded-for` hop (reverse-proxy deployments),
/// falling back to the socket peer address.
pub(crate) fn client_ip(headers: &HeaderMap, connect: &ConnectInfo<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| connect.0.ip().to_string())
}
