//! Request bodies and queries for endpoints whose input is a handful of fields.

use healthcure_uuid::RecordId;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ContactReq {
    pub email: String,
    pub phone: String,
}

/// Either contact field may be missing.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct OptionalContactReq {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdReq {
    #[schema(value_type = String)]
    pub user_id: RecordId,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectUserReq {
    #[schema(value_type = String)]
    pub user_id: RecordId,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientIdReq {
    #[schema(value_type = String)]
    pub patient_id: RecordId,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkReq {
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = String)]
    pub user_id: RecordId,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Text to search for.
    pub q: Option<String>,
}
