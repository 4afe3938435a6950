use crate::store::Document;
use chrono::{DateTime, Utc};
use healthcure_types::NonEmptyText;
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[schema(value_type = String)]
    pub id: RecordId,
    /// Staff registration number, unique across doctors.
    #[schema(value_type = String)]
    pub nip: NonEmptyText,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub specialization: NonEmptyText,
    pub phone: String,
    pub email: String,
    pub schedule: String,
    pub room: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Doctor {
    const COLLECTION: &'static str = "doctors";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Doctor {
    pub fn public(&self) -> PublicDoctor {
        PublicDoctor {
            id: self.id,
            name: self.name.clone(),
            specialization: self.specialization.clone(),
            schedule: self.schedule.clone(),
            room: self.room.clone(),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        self.name.contains_ignore_case(query)
            || self.specialization.contains_ignore_case(query)
            || self.nip.contains_ignore_case(query)
    }
}

/// What unauthenticated visitors may see of a doctor.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicDoctor {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub specialization: NonEmptyText,
    pub schedule: String,
    pub room: String,
}
