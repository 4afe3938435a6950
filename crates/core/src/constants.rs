//! Constants used throughout the HealthCure core crate.

/// Directory name for the auth service's collections.
pub const AUTH_DIR_NAME: &str = "auth";

/// Directory name for the clinic service's collections.
pub const CLINIC_DIR_NAME: &str = "clinic";

/// Extension of stored document files.
pub const DOCUMENT_EXTENSION: &str = "json";

/// Token lifetime in hours when `JWT_EXPIRES_IN` is not set.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Number of notifications returned by a listing.
pub const NOTIFICATION_PAGE_SIZE: usize = 20;

/// Placeholder stored for clinical text fields that were not filled in.
pub const UNSET_FIELD: &str = "-";

/// Default schedule for a newly created doctor.
pub const DEFAULT_DOCTOR_SCHEDULE: &str = "Mon - Fri, 08:00 - 16:00";

/// Frontend route that notifications point the user at.
pub const PROFILE_ACTION_URL: &str = "/profile";
