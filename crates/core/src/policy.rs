//! Role based access policy.
//!
//! Every (role, resource, action) triple the services check is listed in [`POLICY`]. A triple
//! that is not listed is denied. `Scope::Own` grants are narrowed by the calling service to the
//! caller's own user record or linked patient.

use crate::identity::Identity;
use crate::models::Role;
use crate::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    User,
    Patient,
    Doctor,
    Visit,
    Notification,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    Verify,
    Link,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    All,
    Own,
}

use Action::*;
use Resource::{Doctor, Notification, Patient, User, Visit};
use Scope::{All, Own};

const POLICY: &[(Role, Resource, Action, Scope)] = &[
    // admin
    (Role::Admin, User, List, All),
    (Role::Admin, User, Read, All),
    (Role::Admin, User, Update, All),
    (Role::Admin, User, Delete, All),
    (Role::Admin, User, Verify, All),
    (Role::Admin, Patient, List, All),
    (Role::Admin, Patient, Read, All),
    (Role::Admin, Patient, Create, All),
    (Role::Admin, Patient, Update, All),
    (Role::Admin, Patient, Delete, All),
    (Role::Admin, Patient, Link, All),
    (Role::Admin, Doctor, List, All),
    (Role::Admin, Doctor, Read, All),
    (Role::Admin, Doctor, Create, All),
    (Role::Admin, Doctor, Update, All),
    (Role::Admin, Doctor, Delete, All),
    (Role::Admin, Visit, List, All),
    (Role::Admin, Visit, Read, All),
    (Role::Admin, Visit, Create, All),
    (Role::Admin, Visit, Update, All),
    (Role::Admin, Visit, Delete, All),
    (Role::Admin, Notification, List, Own),
    (Role::Admin, Notification, Read, Own),
    (Role::Admin, Notification, Update, Own),
    // user
    (Role::User, User, Read, Own),
    (Role::User, User, Update, Own),
    (Role::User, Patient, List, Own),
    (Role::User, Patient, Read, Own),
    (Role::User, Patient, Create, Own),
    (Role::User, Patient, Update, Own),
    (Role::User, Patient, Link, Own),
    (Role::User, Doctor, List, All),
    (Role::User, Doctor, Read, All),
    (Role::User, Visit, List, Own),
    (Role::User, Visit, Read, Own),
    (Role::User, Notification, List, Own),
    (Role::User, Notification, Read, Own),
    (Role::User, Notification, Update, Own),
];

/// Looks up the scope granted to `role`, or `None` when denied.
pub fn scope_for(role: Role, resource: Resource, action: Action) -> Option<Scope> {
    POLICY
        .iter()
        .find(|(r, res, act, _)| *r == role && *res == resource && *act == action)
        .map(|(_, _, _, scope)| *scope)
}

/// Like [`scope_for`] but turns a denial into [`CoreError::Forbidden`].
pub fn authorize(who: &Identity, resource: Resource, action: Action) -> CoreResult<Scope> {
    scope_for(who.role, resource, action).ok_or(CoreError::Forbidden("insufficient permissions"))
}

/// Requires an `All` grant.
pub fn authorize_all(who: &Identity, resource: Resource, action: Action) -> CoreResult<()> {
    match authorize(who, resource, action)? {
        Scope::All => Ok(()),
        Scope::Own => Err(CoreError::Forbidden("insufficient permissions")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthcure_uuid::RecordId;

    fn caller(role: Role) -> Identity {
        Identity::new(RecordId::new(), role, None)
    }

    #[test]
    fn test_admin_has_full_access_to_clinic_records() {
        for resource in [Patient, Doctor, Visit] {
            for action in [List, Read, Create, Update, Delete] {
                assert_eq!(scope_for(Role::Admin, resource, action), Some(All));
            }
        }
    }

    #[test]
    fn test_users_cannot_write_doctors() {
        let user = caller(Role::User);
        for action in [Create, Update, Delete] {
            let err = authorize(&user, Doctor, action).unwrap_err();
            assert!(matches!(err, CoreError::Forbidden(_)));
        }
        assert_eq!(authorize(&user, Doctor, List).unwrap(), All);
    }

    #[test]
    fn test_users_are_limited_to_their_own_patient() {
        assert_eq!(scope_for(Role::User, Patient, Update), Some(Own));
        assert_eq!(scope_for(Role::User, Patient, Delete), None);
        assert!(authorize_all(&caller(Role::User), Patient, List).is_err());
    }

    #[test]
    fn test_unlisted_triples_are_denied() {
        assert_eq!(scope_for(Role::User, User, Verify), None);
        assert_eq!(scope_for(Role::User, Visit, Create), None);
        assert_eq!(scope_for(Role::Admin, Notification, Delete), None);
    }

    #[test]
    fn test_notifications_are_always_own() {
        assert_eq!(scope_for(Role::Admin, Notification, List), Some(Own));
        assert_eq!(scope_for(Role::User, Notification, Update), Some(Own));
    }
}
