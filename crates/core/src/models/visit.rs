use crate::store::Document;
use chrono::{DateTime, Utc};
use healthcure_types::NonEmptyText;
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    #[default]
    Ongoing,
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    pub visit_date: DateTime<Utc>,
    #[schema(value_type = String)]
    pub complaint: NonEmptyText,
    pub diagnosis: String,
    pub treatment: String,
    pub prescription: String,
    pub notes: String,
    pub status: VisitStatus,
    #[schema(value_type = String)]
    pub created_by: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Visit {
    const COLLECTION: &'static str = "visits";

    fn id(&self) -> RecordId {
        self.id
    }
}
