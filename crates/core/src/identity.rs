use crate::models::Role;
use healthcure_uuid::RecordId;

/// The authenticated caller of a request.
///
/// Built from verified token claims or from the identity header forwarded by the gateway.
/// `patient_id` is informational only; ownership checks resolve the caller's patient from the
/// clinic store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: RecordId,
    pub role: Role,
    pub patient_id: Option<RecordId>,
}

impl Identity {
    pub fn new(user_id: RecordId, role: Role, patient_id: Option<RecordId>) -> Self {
        Self {
            user_id,
            role,
            patient_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the caller is an admin or `user_id` themselves.
    pub fn is_admin_or(&self, user_id: &RecordId) -> bool {
        self.is_admin() || &self.user_id == user_id
    }
}
