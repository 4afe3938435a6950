//! # API REST
//!
//! REST API implementation for HealthCure.
//!
//! Handles:
//! - The auth service router (`/api/auth`)
//! - The clinic service router (`/api/patients`, `/api/doctors`, `/api/visits`,
//!   `/api/notifications`, `/api/stats`)
//! - Caller resolution from bearer tokens or the gateway's identity header
//! - OpenAPI/Swagger documentation, CORS and request tracing
//!
//! Uses `api-shared` for the response envelope and wire helpers.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod clinic;
pub mod doctors;
pub mod error;
pub mod extract;
pub mod notifications;
pub mod patients;
pub mod state;
pub mod visits;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use healthcure_core::config::{data_dir_from_env_value, flag_from_env_value, token_ttl_from_env_value};
use healthcure_core::CoreConfig;

/// Builds the core configuration from the process environment.
///
/// # Errors
/// Returns an error if `JWT_SECRET` is missing or a value cannot be parsed.
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    let jwt_secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    let cfg = CoreConfig::new(
        data_dir_from_env_value(std::env::var("HEALTHCURE_DATA_DIR").ok()),
        jwt_secret,
        token_ttl_from_env_value(std::env::var("JWT_EXPIRES_IN").ok())?,
        flag_from_env_value(std::env::var("HEALTHCURE_TRUST_GATEWAY_IDENTITY").ok(), false)?,
    )?;
    Ok(cfg)
}

/// Serves `app` on `addr` until the process is stopped.
pub async fn serve(name: &str, addr: &str, app: axum::Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ {} listening on {}", name, addr);
    axum::serve(listener, app).await?;
    Ok(())
}
