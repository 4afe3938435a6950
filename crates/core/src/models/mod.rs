//! Document types held by the auth and clinic stores.
//!
//! Field names serialise in camelCase, matching the JSON the REST layer exchanges with clients.

pub mod doctor;
pub mod notification;
pub mod patient;
pub mod user;
pub mod visit;

pub use doctor::{Doctor, PublicDoctor};
pub use notification::{Notification, NotificationData, NotificationKind};
pub use patient::{BindRequest, BindStatus, BloodType, Gender, Patient, PatientStatus, PatientSummary};
pub use user::{Role, User, UserView};
pub use visit::{Visit, VisitStatus};
