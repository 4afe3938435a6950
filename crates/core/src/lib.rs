//! # HealthCure Core
//!
//! Core business logic for the HealthCure clinic back end.
//!
//! This crate contains the document model and every workflow the services expose:
//! - Accounts, password hashing and session tokens (auth service)
//! - Patients, doctors, visits and notifications (clinic service)
//! - Matching and binding of accounts to patient records, including the registration flow
//! - The role/resource/action policy table
//!
//! Documents live in [`store::Collection`]s, kept in memory and optionally persisted as sharded
//! JSON files under the configured data directory.
//!
//! **No API concerns**: HTTP routing, identity headers and proxying belong in `api-rest`,
//! `api-shared` and `gateway`.

pub mod accounts;
pub mod binding;
pub mod clinic;
pub mod config;
pub mod constants;
pub mod doctors;
pub mod error;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod passwords;
pub mod patients;
pub mod policy;
pub mod registration;
pub mod store;
pub mod tokens;
pub mod visits;

pub use accounts::{AccountService, EmailCheck, RegisterUser, Session, UserDirectory, UserUpdate};
pub use binding::{BindingService, Claim, MatchType, PatientMatch, UserMatch};
pub use clinic::{ClinicStats, ClinicStore};
pub use config::CoreConfig;
pub use doctors::{DoctorService, DoctorUpdate, NewDoctor};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use identity::Identity;
pub use notifications::{NotificationPage, NotificationService};
pub use patients::{
    CreatedPatient, LinkStatus, NewPatient, PatientEntry, PatientService, PatientUpdate,
    SelfPatient,
};
pub use registration::{LinkOutcome, PatientLink, Registered, RegistrationFlow};
pub use tokens::{Claims, TokenService};
pub use visits::{NewVisit, VisitService, VisitUpdate};
