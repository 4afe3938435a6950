//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the auth and clinic services without the gateway.
//!
//! ## Intended use
//! Useful for development when clients talk to the services directly. The workspace's main
//! `healthcure-run` binary also starts the gateway.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{auth, clinic, config_from_env, serve, AppState};

/// Main entry point for the REST API server.
///
/// # Environment Variables
/// - `HEALTHCURE_AUTH_ADDR`: auth service address (default: "0.0.0.0:3001")
/// - `HEALTHCURE_CLINIC_ADDR`: clinic service address (default: "0.0.0.0:3002")
/// - `HEALTHCURE_SEED_DOCTORS`: seed the default doctor roster when none exist
/// - plus the core variables read by [`config_from_env`]
///
/// # Errors
/// Returns an error if configuration is invalid, a store cannot be opened, or a server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("healthcure_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let auth_addr = std::env::var("HEALTHCURE_AUTH_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let clinic_addr =
        std::env::var("HEALTHCURE_CLINIC_ADDR").unwrap_or_else(|_| "0.0.0.0:3002".into());

    let state = AppState::open(Arc::new(config_from_env()?))?;
    if healthcure_core::config::flag_from_env_value(std::env::var("HEALTHCURE_SEED_DOCTORS").ok(), false)? {
        state.doctors.seed_defaults()?;
    }

    tokio::try_join!(
        serve("auth service", &auth_addr, auth::router(state.clone())),
        serve("clinic service", &clinic_addr, clinic::router(state)),
    )?;

    Ok(())
}
