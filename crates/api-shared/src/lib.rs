//! # API Shared
//!
//! Wire-level definitions shared by the HealthCure REST services and the gateway.
//!
//! Contains:
//! - The JSON response envelope (`envelope` module)
//! - `HealthService` for the `/health` endpoints
//! - Caller identity helpers: bearer parsing and the `x-user-info` header codec
//! - Small request bodies that carry no domain logic

pub mod auth;
pub mod bodies;
pub mod envelope;
pub mod health;

pub use auth::{bearer_token, UserInfo, X_USER_INFO};
pub use envelope::{Envelope, ErrorBody};
pub use health::{HealthRes, HealthService};
