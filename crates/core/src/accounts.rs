//! User accounts: registration, login, verification and the user directory used by the clinic.

use crate::config::CoreConfig;
use crate::identity::Identity;
use crate::models::{Role, User, UserView};
use crate::passwords::{hash_password, verify_password};
use crate::policy::{authorize, authorize_all, Action, Resource, Scope};
use crate::store::Collection;
use crate::tokens::{Claims, TokenService};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use healthcure_types::{EmailAddress, NonEmptyText, PhoneNumber};
use healthcure_uuid::RecordId;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

const BAD_CREDENTIALS: &str = "invalid email or password";
const DEFAULT_REJECTION_REASON: &str = "Data does not match";

/// Lookup and link maintenance over user accounts, as needed by the clinic workflows.
pub trait UserDirectory: Send + Sync {
    /// First account matching `email`, otherwise the first matching `phone`.
    fn find_by_contact(
        &self,
        email: Option<&EmailAddress>,
        phone: Option<&PhoneNumber>,
    ) -> CoreResult<Option<User>>;

    fn get_user(&self, id: &RecordId) -> CoreResult<Option<User>>;

    /// Sets or clears the account's patient link.
    ///
    /// Fails with a conflict when another account already holds `patient_id`.
    fn set_patient_link(&self, user_id: &RecordId, patient_id: Option<RecordId>)
        -> CoreResult<User>;
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub name: String,
}

/// Partial update of an account. Absent fields are left alone.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    /// `null` clears the link, a value sets it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub patient_id: Option<Option<RecordId>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Session {
    pub user: UserView,
    pub token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailCheck {
    Available,
    EmailExists,
}

pub struct AccountService {
    users: Collection<User>,
    tokens: TokenService,
}

impl AccountService {
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let users = Collection::open_or_memory(cfg.auth_dir().as_deref())?;
        Ok(Self {
            users,
            tokens: TokenService::new(cfg),
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Pre-registration check of whether `email` is still free. Both values must be valid.
    pub fn check_email_phone(&self, email: &str, phone: &str) -> CoreResult<EmailCheck> {
        let email = EmailAddress::parse(email)?;
        PhoneNumber::parse(phone)?;
        if self.users.find_one(|u| u.email == email)?.is_some() {
            return Ok(EmailCheck::EmailExists);
        }
        Ok(EmailCheck::Available)
    }

    /// Creates an unverified account with role `user`. A phone number is required.
    ///
    /// The account has no patient link yet; [`RegistrationFlow`](crate::registration::RegistrationFlow)
    /// claims or creates one.
    ///
    /// # Returns
    /// The stored account, with its password hashed.
    ///
    /// # Errors
    /// - `InvalidInput` if the email, phone or name is invalid, or the password is too short
    /// - `Conflict` if the email is already registered
    pub fn register(&self, input: RegisterUser) -> CoreResult<User> {
        let phone = input
            .phone
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| CoreError::invalid("phone is required"))?;
        let phone = PhoneNumber::parse(phone)?;
        self.create(
            &input.email,
            &input.name,
            &input.password,
            Some(phone),
            Role::User,
        )
    }

    /// Creates a verified administrator account.
    pub fn create_admin(
        &self,
        email: &str,
        name: &str,
        password: &str,
        phone: Option<&str>,
    ) -> CoreResult<User> {
        let phone = phone
            .filter(|p| !p.trim().is_empty())
            .map(PhoneNumber::parse)
            .transpose()?;
        let user = self.create(email, name, password, phone, Role::Admin)?;
        tracing::info!("created admin account {}", user.id);
        Ok(user)
    }

    fn create(
        &self,
        email: &str,
        name: &str,
        password: &str,
        phone: Option<PhoneNumber>,
        role: Role,
    ) -> CoreResult<User> {
        let email = EmailAddress::parse(email)?;
        let name = NonEmptyText::new(name)?;
        let password_hash = hash_password(password)?;
        let now = Utc::now();

        let user = User {
            id: RecordId::new(),
            email,
            phone,
            name,
            password_hash,
            role,
            is_verified: role == Role::Admin,
            patient_id: None,
            verified_at: (role == Role::Admin).then_some(now),
            verified_by: None,
            rejection_reason: None,
            created_at: now,
        };

        self.users.write(|txn| {
            if txn.find_one(|u| u.email == user.email).is_some() {
                return Err(CoreError::conflict("email is already registered"));
            }
            txn.put(user.clone());
            Ok(user)
        })
    }

    /// Checks credentials and issues a session token.
    ///
    /// # Errors
    /// Returns `Unauthenticated` with the same message for an unknown email and a wrong
    /// password.
    pub fn login(&self, email: &str, password: &str) -> CoreResult<Session> {
        let Ok(email) = EmailAddress::parse(email) else {
            return Err(CoreError::Unauthenticated(BAD_CREDENTIALS));
        };
        let user = self
            .users
            .find_one(|u| u.email == email)?
            .ok_or(CoreError::Unauthenticated(BAD_CREDENTIALS))?;

        if !verify_password(&user.password_hash, password)? {
            tracing::debug!("password mismatch for {}", user.id);
            return Err(CoreError::Unauthenticated(BAD_CREDENTIALS));
        }

        self.session(&user)
    }

    pub fn session(&self, user: &User) -> CoreResult<Session> {
        Ok(Session {
            user: user.view(),
            token: self.tokens.issue(user)?,
        })
    }

    pub fn verify_token(&self, token: &str) -> CoreResult<Claims> {
        self.tokens.verify(token)
    }

    pub fn me(&self, who: &Identity) -> CoreResult<UserView> {
        self.get(&who.user_id).map(|u| u.view())
    }

    pub fn get(&self, id: &RecordId) -> CoreResult<User> {
        self.users.get(id)?.ok_or(CoreError::NotFound("user"))
    }

    /// Every account, newest first.
    pub fn users(&self) -> CoreResult<Vec<UserView>> {
        let mut users = self.users.find(|_| true)?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users.iter().map(User::view).collect())
    }

    pub fn list_users(&self, who: &Identity) -> CoreResult<Vec<UserView>> {
        authorize_all(who, Resource::User, Action::List)?;
        self.users()
    }

    pub fn unverified_users(&self, who: &Identity) -> CoreResult<Vec<UserView>> {
        authorize_all(who, Resource::User, Action::List)?;
        self.cohort(false)
    }

    pub fn verified_users(&self, who: &Identity) -> CoreResult<Vec<UserView>> {
        authorize_all(who, Resource::User, Action::List)?;
        self.cohort(true)
    }

    fn cohort(&self, verified: bool) -> CoreResult<Vec<UserView>> {
        let mut users = self
            .users
            .find(|u| u.role == Role::User && u.is_verified == verified)?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users.iter().map(User::view).collect())
    }

    /// Admin verification. Records who verified the account and when.
    ///
    /// # Errors
    /// - `Forbidden` for non-admin callers
    /// - `NotFound` if the account does not exist
    /// - `Conflict` if the account is already verified
    pub fn verify_user(&self, who: &Identity, user_id: &RecordId) -> CoreResult<UserView> {
        authorize_all(who, Resource::User, Action::Verify)?;
        let user = self.users.update(user_id, "user", |u| {
            if u.is_verified {
                return Err(CoreError::conflict("user is already verified"));
            }
            u.is_verified = true;
            u.verified_at = Some(Utc::now());
            u.verified_by = Some(who.user_id);
            u.rejection_reason = None;
            Ok(())
        })?;
        tracing::info!("user {} verified by {}", user.id, who.user_id);
        Ok(user.view())
    }

    pub fn reject_user(
        &self,
        who: &Identity,
        user_id: &RecordId,
        reason: Option<String>,
    ) -> CoreResult<UserView> {
        authorize_all(who, Resource::User, Action::Verify)?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

        let user = self.users.update(user_id, "user", |u| {
            u.is_verified = false;
            u.verified_at = None;
            u.verified_by = None;
            u.rejection_reason = Some(reason);
            Ok(())
        })?;
        tracing::info!("user {} rejected by {}", user.id, who.user_id);
        Ok(user.view())
    }

    /// Verification without an acting admin, used when registration binds to a known patient.
    pub(crate) fn mark_verified(&self, user_id: &RecordId) -> CoreResult<User> {
        self.users.update(user_id, "user", |u| {
            if !u.is_verified {
                u.is_verified = true;
                u.verified_at = Some(Utc::now());
            }
            Ok(())
        })
    }

    /// Admin or self update of the account fields.
    ///
    /// The patient link is not changed here since it has a patient side as well; see
    /// [`RegistrationFlow::update_user`](crate::registration::RegistrationFlow::update_user).
    ///
    /// # Errors
    /// - `Forbidden` if a user edits another account, or a non-admin sets `role`/`patientId`
    /// - `InvalidInput` if `patientId` is present in an admin update
    /// - `Conflict` if the new email or phone belongs to another account
    pub fn update_user(
        &self,
        who: &Identity,
        user_id: &RecordId,
        update: UserUpdate,
    ) -> CoreResult<UserView> {
        if authorize(who, Resource::User, Action::Update)? == Scope::Own && &who.user_id != user_id
        {
            return Err(CoreError::Forbidden("cannot modify another account"));
        }
        if !who.is_admin() && (update.role.is_some() || update.patient_id.is_some()) {
            return Err(CoreError::Forbidden(
                "only admins can change role or patient link",
            ));
        }
        if update.patient_id.is_some() {
            return Err(CoreError::invalid(
                "patient links are changed through the link workflow",
            ));
        }

        let name = update.name.as_deref().map(NonEmptyText::new).transpose()?;
        let email = update.email.as_deref().map(EmailAddress::parse).transpose()?;
        let phone = update.phone.as_deref().map(PhoneNumber::parse).transpose()?;

        self.users
            .write(|txn| {
                let mut user = txn
                    .get(user_id)
                    .cloned()
                    .ok_or(CoreError::NotFound("user"))?;

                if let Some(email) = &email {
                    if txn.find_one(|u| &u.email == email && &u.id != user_id).is_some() {
                        return Err(CoreError::conflict("email is already registered"));
                    }
                }
                if let Some(phone) = &phone {
                    if txn
                        .find_one(|u| u.phone.as_ref() == Some(phone) && &u.id != user_id)
                        .is_some()
                    {
                        return Err(CoreError::conflict("phone is already registered"));
                    }
                }

                if let Some(name) = name {
                    user.name = name;
                }
                if let Some(email) = email {
                    user.email = email;
                }
                if let Some(phone) = phone {
                    user.phone = Some(phone);
                }
                if let Some(role) = update.role {
                    user.role = role;
                }

                txn.put(user.clone());
                Ok(user)
            })
            .map(|u| u.view())
    }

    pub fn delete_user(&self, who: &Identity, user_id: &RecordId) -> CoreResult<User> {
        authorize_all(who, Resource::User, Action::Delete)?;
        let user = self
            .users
            .remove(user_id)?
            .ok_or(CoreError::NotFound("user"))?;
        tracing::info!("user {} deleted by {}", user.id, who.user_id);
        Ok(user)
    }

    /// Unconditional removal, used to undo a half-finished registration.
    pub(crate) fn remove_user(&self, user_id: &RecordId) -> CoreResult<()> {
        self.users.remove(user_id).map(|_| ())
    }
}

impl UserDirectory for AccountService {
    fn find_by_contact(
        &self,
        email: Option<&EmailAddress>,
        phone: Option<&PhoneNumber>,
    ) -> CoreResult<Option<User>> {
        if let Some(email) = email {
            if let Some(user) = self.users.find_one(|u| &u.email == email)? {
                return Ok(Some(user));
            }
        }
        match phone {
            Some(phone) => self.users.find_one(|u| u.phone.as_ref() == Some(phone)),
            None => Ok(None),
        }
    }

    fn get_user(&self, id: &RecordId) -> CoreResult<Option<User>> {
        self.users.get(id)
    }

    fn set_patient_link(
        &self,
        user_id: &RecordId,
        patient_id: Option<RecordId>,
    ) -> CoreResult<User> {
        self.users.write(|txn| {
            let mut user = txn
                .get(user_id)
                .cloned()
                .ok_or(CoreError::NotFound("user"))?;
            if let Some(pid) = &patient_id {
                if txn
                    .find_one(|u| u.patient_id.as_ref() == Some(pid) && &u.id != user_id)
                    .is_some()
                {
                    return Err(CoreError::conflict(
                        "patient is already linked to another account",
                    ));
                }
            }
            user.patient_id = patient_id;
            txn.put(user.clone());
            Ok(user)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn test_config() -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(None, "test-secret".into(), Duration::hours(1), true).unwrap())
    }

    pub(crate) fn registration(email: &str, phone: &str) -> RegisterUser {
        RegisterUser {
            email: email.into(),
            phone: Some(phone.into()),
            password: "rahasia123".into(),
            name: "Budi Santoso".into(),
        }
    }

    fn admin(accounts: &AccountService) -> Identity {
        let user = accounts
            .create_admin("admin@healthcure.id", "Admin", "admin123", None)
            .unwrap();
        Identity::new(user.id, Role::Admin, None)
    }

    #[test]
    fn test_register_normalises_contact_details() {
        let accounts = AccountService::open(test_config()).unwrap();
        let user = accounts
            .register(registration(" Budi@Example.COM ", "+62 812-3456-7890"))
            .unwrap();

        assert_eq!(user.email.as_str(), "budi@example.com");
        assert_eq!(user.phone.as_ref().unwrap().as_str(), "081234567890");
        assert_eq!(user.role, Role::User);
        assert!(!user.is_verified);
    }

    #[test]
    fn test_register_requires_phone_and_unique_email() {
        let accounts = AccountService::open(test_config()).unwrap();
        let mut input = registration("budi@example.com", "081234567890");
        input.phone = None;
        assert!(matches!(
            accounts.register(input).unwrap_err(),
            CoreError::InvalidInput(_)
        ));

        accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();
        let err = accounts
            .register(registration("BUDI@example.com", "089999999999"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_login_failures_look_the_same() {
        let accounts = AccountService::open(test_config()).unwrap();
        accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();

        let session = accounts.login("budi@example.com", "rahasia123").unwrap();
        assert!(!session.token.is_empty());

        let unknown = accounts.login("nobody@example.com", "rahasia123").unwrap_err();
        let wrong = accounts.login("budi@example.com", "nope-nope").unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, CoreError::Unauthenticated(_)));
    }

    #[test]
    fn test_check_email_phone() {
        let accounts = AccountService::open(test_config()).unwrap();
        accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();

        assert_eq!(
            accounts
                .check_email_phone("budi@example.com", "081234567890")
                .unwrap(),
            EmailCheck::EmailExists
        );
        assert_eq!(
            accounts
                .check_email_phone("siti@example.com", "081200000000")
                .unwrap(),
            EmailCheck::Available
        );
        assert!(accounts.check_email_phone("siti@example.com", "").is_err());
    }

    #[test]
    fn test_verify_twice_conflicts() {
        let accounts = AccountService::open(test_config()).unwrap();
        let admin = admin(&accounts);
        let user = accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();

        let verified = accounts.verify_user(&admin, &user.id).unwrap();
        assert!(verified.is_verified);
        assert_eq!(verified.verified_by, Some(admin.user_id));

        let err = accounts.verify_user(&admin, &user.id).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_reject_stores_reason_and_cohorts_split() {
        let accounts = AccountService::open(test_config()).unwrap();
        let admin = admin(&accounts);
        let a = accounts
            .register(registration("a@example.com", "081100000001"))
            .unwrap();
        let b = accounts
            .register(registration("b@example.com", "081100000002"))
            .unwrap();

        accounts.verify_user(&admin, &a.id).unwrap();
        let rejected = accounts.reject_user(&admin, &b.id, None).unwrap();
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some(DEFAULT_REJECTION_REASON)
        );

        let verified = accounts.verified_users(&admin).unwrap();
        let unverified = accounts.unverified_users(&admin).unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, a.id);
        assert_eq!(unverified.len(), 1);
        assert_eq!(unverified[0].id, b.id);
    }

    #[test]
    fn test_users_cannot_verify_or_list() {
        let accounts = AccountService::open(test_config()).unwrap();
        let user = accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();
        let who = Identity::new(user.id, Role::User, None);

        assert!(matches!(
            accounts.verify_user(&who, &user.id).unwrap_err(),
            CoreError::Forbidden(_)
        ));
        assert!(matches!(
            accounts.list_users(&who).unwrap_err(),
            CoreError::Forbidden(_)
        ));
    }

    #[test]
    fn test_self_update_cannot_touch_role() {
        let accounts = AccountService::open(test_config()).unwrap();
        let user = accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();
        let other = accounts
            .register(registration("siti@example.com", "081200000000"))
            .unwrap();
        let who = Identity::new(user.id, Role::User, None);

        let renamed = accounts
            .update_user(
                &who,
                &user.id,
                UserUpdate {
                    name: Some("Budi S.".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name.as_str(), "Budi S.");

        let promote = UserUpdate {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert!(accounts.update_user(&who, &user.id, promote).is_err());

        let err = accounts
            .update_user(&who, &other.id, UserUpdate::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn test_update_rechecks_email_uniqueness() {
        let accounts = AccountService::open(test_config()).unwrap();
        let admin = admin(&accounts);
        let user = accounts
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();
        accounts
            .register(registration("siti@example.com", "081200000000"))
            .unwrap();

        let err = accounts
            .update_user(
                &admin,
                &user.id,
                UserUpdate {
                    email: Some("SITI@example.com".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_patient_link_is_exclusive() {
        let accounts = AccountService::open(test_config()).unwrap();
        let a = accounts
            .register(registration("a@example.com", "081100000001"))
            .unwrap();
        let b = accounts
            .register(registration("b@example.com", "081100000002"))
            .unwrap();
        let patient_id = RecordId::new();

        accounts.set_patient_link(&a.id, Some(patient_id)).unwrap();
        let err = accounts.set_patient_link(&b.id, Some(patient_id)).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        accounts.set_patient_link(&a.id, None).unwrap();
        accounts.set_patient_link(&b.id, Some(patient_id)).unwrap();
    }

    #[test]
    fn test_find_by_contact_prefers_email() {
        let accounts = AccountService::open(test_config()).unwrap();
        let by_email = accounts
            .register(registration("a@example.com", "081100000001"))
            .unwrap();
        accounts
            .register(registration("b@example.com", "081100000002"))
            .unwrap();

        let email = EmailAddress::parse("a@example.com").unwrap();
        let phone = PhoneNumber::parse("081100000002").unwrap();
        let found = accounts
            .find_by_contact(Some(&email), Some(&phone))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, by_email.id);

        let found = accounts.find_by_contact(None, Some(&phone)).unwrap().unwrap();
        assert_eq!(found.email.as_str(), "b@example.com");
    }

    #[test]
    fn test_accounts_persist_under_auth_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let cfg = Arc::new(
            CoreConfig::new(
                Some(temp.path().to_path_buf()),
                "test-secret".into(),
                Duration::hours(1),
                true,
            )
            .unwrap(),
        );

        let id = {
            let accounts = AccountService::open(cfg.clone()).unwrap();
            accounts
                .register(registration("budi@example.com", "081234567890"))
                .unwrap()
                .id
        };

        let reopened = AccountService::open(cfg).unwrap();
        assert_eq!(reopened.get(&id).unwrap().email.as_str(), "budi@example.com");
        assert!(temp.path().join("auth").join("users").is_dir());
    }
}
