use crate::store::Document;
use chrono::{DateTime, Utc};
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LinkRequest,
    AccountLinked,
    VisitCreated,
    VisitCompleted,
    VisitUpdated,
}

/// Structured payload carried with a notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub patient_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub visit_id: Option<RecordId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub user_id: RecordId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub data: NotificationData,
    pub action_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Notification {
    /// An unread link request concerning `patient_id`.
    pub fn is_open_link_request(&self, patient_id: &RecordId) -> bool {
        self.kind == NotificationKind::LinkRequest
            && !self.is_read
            && self.data.patient_id.as_ref() == Some(patient_id)
    }
}
