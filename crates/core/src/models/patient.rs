use crate::constants::UNSET_FIELD;
use crate::store::Document;
use chrono::{DateTime, NaiveDate, Utc};
use healthcure_types::{EmailAddress, NonEmptyText, PhoneNumber};
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BloodType {
    A,
    B,
    AB,
    O,
    #[default]
    #[serde(rename = "-")]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
    Recovered,
    Deceased,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BindStatus {
    Pending,
    Approved,
    Rejected,
}

/// Pending handshake raised when an admin-entered patient matches an existing account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BindRequest {
    #[schema(value_type = String)]
    pub user_id: RecordId,
    pub user_name: String,
    #[schema(value_type = String)]
    pub user_email: EmailAddress,
    pub requested_at: DateTime<Utc>,
    pub status: BindStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    /// Canonical national form, unique across patients.
    #[schema(value_type = String)]
    pub phone: PhoneNumber,
    #[schema(value_type = Option<String>)]
    pub email: Option<EmailAddress>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: String,
    pub blood_type: BloodType,
    pub allergies: String,
    pub medical_history: String,
    pub diagnosis: String,
    pub status: PatientStatus,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    /// Linked account. At most one patient carries a given user id.
    #[schema(value_type = Option<String>)]
    pub user_id: Option<RecordId>,
    pub bind_request: Option<BindRequest>,
    #[schema(value_type = Option<String>)]
    pub created_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Patient {
    const COLLECTION: &'static str = "patients";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Patient {
    /// A record with only identifying fields set and every clinical field unset.
    pub(crate) fn minimal(
        name: NonEmptyText,
        phone: PhoneNumber,
        email: Option<EmailAddress>,
        user_id: Option<RecordId>,
        created_by: Option<RecordId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            name,
            phone,
            email,
            date_of_birth: None,
            gender: None,
            address: UNSET_FIELD.to_string(),
            blood_type: BloodType::Unknown,
            allergies: UNSET_FIELD.to_string(),
            medical_history: UNSET_FIELD.to_string(),
            diagnosis: UNSET_FIELD.to_string(),
            status: PatientStatus::Active,
            doctor_id: None,
            user_id,
            bind_request: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_linked_to(&self, user_id: &RecordId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    pub fn has_pending_request_for(&self, user_id: &RecordId) -> bool {
        self.bind_request
            .as_ref()
            .is_some_and(|req| &req.user_id == user_id && req.status == BindStatus::Pending)
    }

    /// Fields that must be filled in before a visit can be recorded.
    pub fn missing_visit_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date_of_birth.is_none() {
            missing.push("dateOfBirth");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }
        if is_unset(&self.address) {
            missing.push("address");
        }
        if self.blood_type == BloodType::Unknown {
            missing.push("bloodType");
        }
        missing
    }

    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            patient_id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            gender: self.gender,
            date_of_birth: self.date_of_birth,
        }
    }
}

/// Identifying subset of a patient, returned by match checks.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub phone: PhoneNumber,
    #[schema(value_type = Option<String>)]
    pub email: Option<EmailAddress>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
}

pub(crate) fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == UNSET_FIELD
}

/// Trimmed text, or the unset placeholder.
pub(crate) fn text_or_unset(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNSET_FIELD.to_string())
}
