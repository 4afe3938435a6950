//! Standalone gateway binary.
//!
//! Expects the auth and clinic services to be running at `AUTH_SERVICE_URL` and
//! `CLINIC_SERVICE_URL`.

use healthcure_core::config::token_ttl_from_env_value;
use healthcure_core::CoreConfig;
use healthcure_gateway::{router, GatewayConfig, GatewayState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// # Environment Variables
/// - `JWT_SECRET`: must match the auth service's secret
/// - `HEALTHCURE_GATEWAY_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `AUTH_SERVICE_URL`, `CLINIC_SERVICE_URL`: service base URLs
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthcure_gateway=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let jwt_secret =
        std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    let core = CoreConfig::new(
        None,
        jwt_secret,
        token_ttl_from_env_value(std::env::var("JWT_EXPIRES_IN").ok())?,
        false,
    )?;
    let cfg = GatewayConfig::new(
        std::env::var("AUTH_SERVICE_URL").ok(),
        std::env::var("CLINIC_SERVICE_URL").ok(),
    )?;
    let addr =
        std::env::var("HEALTHCURE_GATEWAY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let app = router(GatewayState::new(cfg, Arc::new(core)));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("++ gateway listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
