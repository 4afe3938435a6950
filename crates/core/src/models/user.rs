use crate::store::Document;
use chrono::{DateTime, Utc};
use healthcure_types::{EmailAddress, NonEmptyText, PhoneNumber};
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(crate::CoreError::invalid(format!("unknown role: '{}'", other))),
        }
    }
}

/// A stored account. Never serialised to clients directly, see [`UserView`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub email: EmailAddress,
    pub phone: Option<PhoneNumber>,
    pub name: NonEmptyText,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub patient_id: Option<RecordId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<RecordId>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

/// Client-facing projection of a [`User`] without credentials.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    #[schema(value_type = Option<String>)]
    pub phone: Option<PhoneNumber>,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    pub role: Role,
    pub is_verified: bool,
    #[schema(value_type = Option<String>)]
    pub patient_id: Option<RecordId>,
    pub verified_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub verified_by: Option<RecordId>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            name: user.name.clone(),
            role: user.role,
            is_verified: user.is_verified,
            patient_id: user.patient_id,
            verified_at: user.verified_at,
            verified_by: user.verified_by,
            rejection_reason: user.rejection_reason.clone(),
            created_at: user.created_at,
        }
    }
}
