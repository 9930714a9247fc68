use super::error::ApiError;
use super::state::AppState;
use crate::application::auth::AuthService;
use crate::domain::audit::RequestContext;
use crate::domain::user::{Role, User};
use crate::error::PosError;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The caller's address: the first `X-Forwarded-For` hop behind a trusted
/// proxy, otherwise the socket peer.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> IpAddr {
    if trust_proxy
        && let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    {
        return ip;
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authenticated(parts: &Parts, state: &AppState) -> Result<User, ApiError> {
    let token = bearer_token(parts)
        .ok_or_else(|| PosError::Unauthorized("Not authorized, no token".into()))?;
    Ok(state.auth.authenticate(token).await?)
}

/// Any signed-in, active account.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticated(parts, state).await?))
    }
}

/// Signed in as staff or owner.
pub struct StaffOrOwner(pub User);

impl FromRequestParts<AppState> for StaffOrOwner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts, state).await?;
        AuthService::authorize(&user, &[Role::Staff, Role::Owner])?;
        Ok(Self(user))
    }
}

/// Signed in as the owner.
pub struct Owner(pub User);

impl FromRequestParts<AppState> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts, state).await?;
        AuthService::authorize(&user, &[Role::Owner])?;
        Ok(Self(user))
    }
}

/// Where a request came from, for audit records and replay checks.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip: IpAddr,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn context(&self, user: Option<&User>) -> RequestContext {
        RequestContext {
            user_id: user.map(|u| u.id),
            ip_address: Some(self.ip.to_string()),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl FromRequestParts<AppState> for RequestMeta {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self {
            ip: client_ip(&parts.headers, &parts.extensions, state.settings.trust_proxy),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        })
    }
}
