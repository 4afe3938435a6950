//! Resolving the caller of a request.
//!
//! A bearer token is preferred. Without one, the `x-user-info` header set by the gateway is
//! accepted when the service is configured to trust it.

use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{bearer_token, UserInfo, X_USER_INFO};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use healthcure_core::{Claims, CoreError, CoreResult, Identity};

/// The authenticated caller. Rejects with 401 when no identity can be established.
pub struct Caller(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Caller(resolve(&parts.headers, state)?))
    }
}

/// Claims of a verified bearer token.
pub struct BearerClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for BearerClaims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from(&parts.headers)?.ok_or(CoreError::Unauthenticated("no token provided"))?;
        Ok(BearerClaims(state.accounts.verify_token(token)?))
    }
}

fn token_from(headers: &HeaderMap) -> CoreResult<Option<&str>> {
    match headers.get(AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(bearer_token)
            .map(Some)
            .ok_or(CoreError::Unauthenticated("malformed authorization header")),
    }
}

fn resolve(headers: &HeaderMap, state: &AppState) -> CoreResult<Identity> {
    if let Some(token) = token_from(headers)? {
        return state.accounts.verify_token(token)?.identity();
    }
    if state.cfg.trust_forwarded_identity() {
        if let Some(value) = headers.get(X_USER_INFO) {
            let raw = value
                .to_str()
                .map_err(|_| CoreError::Unauthenticated("invalid identity header"))?;
            return UserInfo::decode(raw).map(Identity::from);
        }
    }
    Err(CoreError::Unauthenticated("no token provided"))
}
