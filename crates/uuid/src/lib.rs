//! Record identifiers and sharded document paths.
//!
//! Every HealthCure document (user, patient, doctor, visit, notification) is keyed by a
//! [`RecordId`]: a v4 UUID held in a *canonical* text form of **32 lowercase hexadecimal
//! characters** (no hyphens).
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Identifiers arriving from outside (path segments, request bodies, headers) are validated with
//! [`RecordId::parse`]; non-canonical values are rejected rather than silently normalised.
//!
//! ## Sharded document layout
//! For a canonical id `u`, a document in collection directory `dir` is stored at:
//! `dir/<u[0..2]>/<u[2..4]>/<u>.json`
//!
//! This keeps directory fan-out bounded as collections grow.

mod record_id;

pub use record_id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
