//! Caller identity on the wire.
//!
//! Clients authenticate with `Authorization: Bearer <jwt>`. The gateway verifies the token once
//! and forwards the result downstream in the [`X_USER_INFO`] header as
//! `{"userId", "role", "patientId"?}`.

use healthcure_core::models::Role;
use healthcure_core::{CoreError, CoreResult, Identity};
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Header carrying the gateway-resolved identity.
pub const X_USER_INFO: &str = "x-user-info";

/// Extracts the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: RecordId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<RecordId>,
}

impl UserInfo {
    pub fn encode(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    pub fn decode(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw).map_err(|_| CoreError::Unauthenticated("invalid identity header"))
    }
}

impl From<&Identity> for UserInfo {
    fn from(who: &Identity) -> Self {
        Self {
            user_id: who.user_id,
            role: who.role,
            patient_id: who.patient_id,
        }
    }
}

impl From<UserInfo> for Identity {
    fn from(info: UserInfo) -> Self {
        Identity::new(info.user_id, info.role, info.patient_id)
    }
}
