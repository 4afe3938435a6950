//! Forwarding of API calls to the owning service.

use crate::routes::upstream_for;
use crate::{GatewayError, GatewayState};
use api_shared::{bearer_token, UserInfo, X_USER_INFO};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;

/// Largest request body forwarded upstream.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
    header::CONTENT_LENGTH,
];

/// Copy of `headers` without hop-by-hop headers.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP {
        out.remove(name);
    }
    out.remove("keep-alive");
    out
}

/// The caller's identity as an `x-user-info` value, when the bearer token verifies.
fn identity_header(state: &GatewayState, headers: &HeaderMap) -> Option<HeaderValue> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(bearer_token)?;
    let identity = match state.tokens.verify(token).and_then(|claims| claims.identity()) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!("forwarding without identity: {}", e);
            return None;
        }
    };
    let raw = UserInfo::from(&identity).encode().ok()?;
    HeaderValue::from_str(&raw).ok()
}

pub async fn forward(
    State(state): State<GatewayState>,
    req: Request,
) -> Result<Response, GatewayError> {
    let path = req.uri().path().to_string();
    let upstream = upstream_for(&path).ok_or_else(|| GatewayError::NoRoute(path.clone()))?;
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or(path);
    let url = format!("{}{}", state.cfg.base_url(upstream), target);

    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(GatewayError::Body)?;

    let mut headers = end_to_end(&parts.headers);
    headers.remove(X_USER_INFO);
    if let Some(info) = identity_header(&state, &parts.headers) {
        headers.insert(X_USER_INFO, info);
    }

    tracing::debug!("{} {} -> {}", parts.method, target, upstream);
    let res = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|source| GatewayError::Unavailable { upstream, source })?;

    let status = res.status();
    let mut headers = end_to_end(res.headers());
    // the gateway's own CORS layer answers for the whole API
    let cors: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("access-control-"))
        .cloned()
        .collect();
    for name in cors {
        headers.remove(name);
    }
    let bytes = res
        .bytes()
        .await
        .map_err(|source| GatewayError::Unavailable { upstream, source })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
