use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, auth, clinic, config_from_env, serve};
use healthcure_core::config::flag_from_env_value;
use healthcure_gateway::{GatewayConfig, GatewayState};

/// Main entry point for HealthCure
///
/// Starts the auth service, the clinic service and the gateway concurrently. The two services
/// share one process and therefore one set of stores; the gateway reaches them over HTTP
/// like any other deployment.
///
/// # Environment Variables
/// - `JWT_SECRET`: token signing secret (required)
/// - `HEALTHCURE_DATA_DIR`: store directory; unset means in-memory
/// - `JWT_EXPIRES_IN`: token lifetime such as "24h" or "7d" (default: "24h")
/// - `HEALTHCURE_TRUST_GATEWAY_IDENTITY`: accept `x-user-info` from the gateway (default: false)
/// - `HEALTHCURE_AUTH_ADDR`: auth service address (default: "0.0.0.0:3001")
/// - `HEALTHCURE_CLINIC_ADDR`: clinic service address (default: "0.0.0.0:3002")
/// - `HEALTHCURE_GATEWAY_ADDR`: gateway address (default: "0.0.0.0:3000")
/// - `AUTH_SERVICE_URL`, `CLINIC_SERVICE_URL`: where the gateway finds the services
/// - `HEALTHCURE_SEED_DOCTORS`: seed the default doctor roster (default: false)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthcure_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("healthcure_core=info".parse()?)
                .add_directive("healthcure_gateway=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let auth_addr = std::env::var("HEALTHCURE_AUTH_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let clinic_addr =
        std::env::var("HEALTHCURE_CLINIC_ADDR").unwrap_or_else(|_| "0.0.0.0:3002".into());
    let gateway_addr =
        std::env::var("HEALTHCURE_GATEWAY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let core = Arc::new(config_from_env()?);
    let state = AppState::open(core.clone())?;
    if flag_from_env_value(std::env::var("HEALTHCURE_SEED_DOCTORS").ok(), false)? {
        state.doctors.seed_defaults()?;
    }

    let gateway = GatewayState::new(
        GatewayConfig::new(
            std::env::var("AUTH_SERVICE_URL").ok(),
            std::env::var("CLINIC_SERVICE_URL").ok(),
        )?,
        core,
    );

    tokio::try_join!(
        serve("auth service", &auth_addr, auth::router(state.clone())),
        serve("clinic service", &clinic_addr, clinic::router(state)),
        serve("gateway", &gateway_addr, healthcure_gateway::router(gateway)),
    )?;

    Ok(())
}
