//! Request extractors.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::{TypedHeader, headers::UserAgent};
use keyward_common::AppError;
use keyward_db::entities::user;

/// Stored when no address can be determined.
pub const UNKNOWN_ADDRESS: &str = "unknown";

const MAX_ADDRESS_LEN: usize = 45;
const MAX_DEVICE_LEN: usize = 255;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Address the request came from.
///
/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
/// IPv4-mapped IPv6 addresses are reported in IPv4 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(resolve_client_ip(&parts.headers, peer)))
    }
}

fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(normalize_address)
    };

    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|ip| normalize_address(&ip.to_string())))
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

fn normalize_address(raw: &str) -> String {
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .map_or_else(|| v6.to_string(), |v4| v4.to_string()),
        Ok(ip) => ip.to_string(),
        Err(_) => raw.chars().take(MAX_ADDRESS_LEN).collect(),
    }
}

/// Best-effort device description from `User-Agent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo(pub Option<String>);

impl<S> FromRequestParts<S> for DeviceInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let agent = TypedHeader::<UserAgent>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(agent)| agent.as_str().trim().chars().take(MAX_DEVICE_LEN).collect::<String>())
            .filter(|agent| !agent.is_empty());

        Ok(Self(agent))
    }
}
