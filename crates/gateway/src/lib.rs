//! # HealthCure Gateway
//!
//! Single entry point in front of the auth and clinic services.
//!
//! Handles:
//! - Routing by path prefix (`/api/auth` to auth; patients, doctors, visits, notifications and
//!   stats to clinic)
//! - Replacing any client-supplied `x-user-info` with the identity of a verified bearer token
//! - Mapping unreachable services to `502` and unknown paths to `404`, both as JSON

#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use routes::Upstream;

use api_shared::{HealthRes, HealthService};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use healthcure_core::{CoreConfig, TokenService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "gateway";

#[derive(Clone)]
pub struct GatewayState {
    pub cfg: Arc<GatewayConfig>,
    pub client: reqwest::Client,
    pub tokens: TokenService,
}

impl GatewayState {
    pub fn new(cfg: GatewayConfig, core: Arc<CoreConfig>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            client: reqwest::Client::new(),
            tokens: TokenService::new(core),
        }
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(proxy::forward)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health(SERVICE_NAME))
}
