//! Self-registration across the account and clinic stores.
//!
//! Steps, in order:
//! 1. create the account;
//! 2. claim or create the patient record by phone;
//! 3. if step 2 fails, delete the account again and report the error;
//! 4. verify the account when it took over an existing record;
//! 5. issue a session for the (re-read) account.

use crate::accounts::{AccountService, RegisterUser, Session, UserUpdate};
use crate::binding::{BindingService, Claim};
use crate::identity::Identity;
use crate::models::UserView;
use crate::{CoreError, CoreResult};
use healthcure_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LinkOutcome {
    /// An existing patient record now belongs to the account.
    Bound,
    /// A fresh patient record was created for the account.
    Created,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientLink {
    pub status: LinkOutcome,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Registered {
    #[serde(flatten)]
    pub session: Session,
    pub patient: PatientLink,
}

#[derive(Clone)]
pub struct RegistrationFlow {
    accounts: Arc<AccountService>,
    binding: BindingService,
}

impl RegistrationFlow {
    pub fn new(accounts: Arc<AccountService>, binding: BindingService) -> Self {
        Self { accounts, binding }
    }

    pub fn register(&self, input: RegisterUser) -> CoreResult<Registered> {
        let user = self.accounts.register(input)?;

        let claim = match self.binding.claim_by_phone(&user) {
            Ok(claim) => claim,
            Err(e) => {
                tracing::warn!("registration of {} failed at patient step: {}", user.id, e);
                if let Err(undo) = self.accounts.remove_user(&user.id) {
                    tracing::error!("failed to remove account {}: {}", user.id, undo);
                }
                return Err(e);
            }
        };

        let link = match &claim {
            Claim::Bound(patient) => {
                self.accounts.mark_verified(&user.id)?;
                PatientLink {
                    status: LinkOutcome::Bound,
                    patient_id: patient.id,
                }
            }
            Claim::Created(patient) => PatientLink {
                status: LinkOutcome::Created,
                patient_id: patient.id,
            },
        };

        let user = self.accounts.get(&user.id)?;
        Ok(Registered {
            session: self.accounts.session(&user)?,
            patient: link,
        })
    }

    /// Updates an account. A `patientId` change is applied to the patient record as well.
    ///
    /// The link is changed first, so a link conflict leaves the account fields untouched.
    ///
    /// # Returns
    /// The updated account.
    ///
    /// # Errors
    /// - `Forbidden` if a non-admin sets `role` or `patientId`, or edits another account
    /// - `Conflict` if the patient is linked to a different account, or email/phone are taken
    /// - `NotFound` if the account or patient does not exist
    pub fn update_user(
        &self,
        who: &Identity,
        user_id: &RecordId,
        mut update: UserUpdate,
    ) -> CoreResult<UserView> {
        if let Some(link) = update.patient_id.take() {
            if !who.is_admin() {
                return Err(CoreError::Forbidden(
                    "only admins can change role or patient link",
                ));
            }
            self.accounts.get(user_id)?;
            self.binding.set_account_link(who, user_id, link)?;
        }
        self.accounts.update_user(who, user_id, update)
    }

    /// Deletes an account and frees the patient record it was linked to.
    pub fn unregister(&self, who: &Identity, user_id: &RecordId) -> CoreResult<()> {
        let user = self.accounts.delete_user(who, user_id)?;
        match self.binding.release_user(&user.id) {
            Ok(_) => Ok(()),
            Err(CoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::{registration, test_config};
    use crate::accounts::{UserDirectory, UserUpdate};
    use crate::clinic::ClinicStore;
    use crate::models::{BloodType, Role};
    use crate::patients::{NewPatient, PatientService};

    struct World {
        accounts: Arc<AccountService>,
        store: Arc<ClinicStore>,
        binding: BindingService,
        flow: RegistrationFlow,
    }

    fn world() -> World {
        let accounts = Arc::new(AccountService::open(test_config()).unwrap());
        let store = Arc::new(ClinicStore::in_memory());
        let directory: Arc<dyn UserDirectory> = accounts.clone();
        let binding = BindingService::new(store.clone(), directory);
        let flow = RegistrationFlow::new(accounts.clone(), binding.clone());
        World {
            accounts,
            store,
            binding,
            flow,
        }
    }

    fn admin_patient(w: &World, phone: &str) -> RecordId {
        let admin = Identity::new(RecordId::new(), Role::Admin, None);
        let patients = PatientService::new(w.store.clone(), w.binding.clone());
        patients
            .create(
                &admin,
                NewPatient {
                    name: "Budi".into(),
                    phone: phone.into(),
                    email: None,
                    date_of_birth: None,
                    gender: None,
                    address: Some("Jl. Melati 3".into()),
                    blood_type: Some(BloodType::B),
                    allergies: None,
                    medical_history: Some("Asthma".into()),
                    diagnosis: None,
                    status: None,
                    doctor_id: None,
                },
            )
            .unwrap()
            .patient
            .id
    }

    #[test]
    fn test_registration_creates_patient_when_nothing_matches() {
        let w = world();
        let out = w
            .flow
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();

        assert_eq!(out.patient.status, LinkOutcome::Created);
        assert_eq!(out.session.user.patient_id, Some(out.patient.patient_id));
        assert!(!out.session.user.is_verified);
        assert_eq!(w.store.patients.count(|_| true).unwrap(), 1);
    }

    #[test]
    fn test_registration_binds_existing_patient_and_keeps_clinical_fields() {
        let w = world();
        let patient_id = admin_patient(&w, "081234567890");

        let out = w
            .flow
            .register(registration("budi@example.com", "+62 812 3456 7890"))
            .unwrap();

        assert_eq!(out.patient.status, LinkOutcome::Bound);
        assert_eq!(out.patient.patient_id, patient_id);
        assert!(out.session.user.is_verified);

        let patient = w.store.patients.get(&patient_id).unwrap().unwrap();
        assert_eq!(patient.user_id, Some(out.session.user.id));
        assert_eq!(patient.address, "Jl. Melati 3");
        assert_eq!(patient.medical_history, "Asthma");
        assert_eq!(patient.email.unwrap().as_str(), "budi@example.com");
    }

    #[test]
    fn test_second_registration_with_same_phone_is_compensated() {
        let w = world();
        let patient_id = admin_patient(&w, "081234567890");

        let first = w
            .flow
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();
        let err = w
            .flow
            .register(registration("other@example.com", "6281234567890"))
            .unwrap_err();

        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(w.store.patients.count(|_| true).unwrap(), 1);
        assert_eq!(
            w.store.patients.get(&patient_id).unwrap().unwrap().user_id,
            Some(first.session.user.id)
        );
        // the second account was rolled back
        assert_eq!(w.accounts.users().unwrap().len(), 1);
        assert!(w.accounts.login("other@example.com", "rahasia123").is_err());
    }

    fn link_to(patient_id: Option<RecordId>) -> UserUpdate {
        UserUpdate {
            patient_id: Some(patient_id),
            ..Default::default()
        }
    }

    #[test]
    fn test_admin_link_change_updates_both_sides() {
        let w = world();
        let admin = Identity::new(RecordId::new(), Role::Admin, None);
        let patient_id = admin_patient(&w, "081234567890");
        let a = w.accounts.register(registration("a@example.com", "081100000001")).unwrap();
        let b = w.accounts.register(registration("b@example.com", "081100000002")).unwrap();

        let view = w.flow.update_user(&admin, &a.id, link_to(Some(patient_id))).unwrap();
        assert_eq!(view.patient_id, Some(patient_id));
        assert_eq!(w.store.patients.get(&patient_id).unwrap().unwrap().user_id, Some(a.id));

        // the patient is held by a, so b cannot take it yet
        let err = w.flow.update_user(&admin, &b.id, link_to(Some(patient_id))).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(w.accounts.get(&b.id).unwrap().patient_id.is_none());

        w.flow.update_user(&admin, &a.id, link_to(None)).unwrap();
        assert!(w.accounts.get(&a.id).unwrap().patient_id.is_none());
        assert!(w.store.patients.get(&patient_id).unwrap().unwrap().user_id.is_none());

        w.flow.update_user(&admin, &b.id, link_to(Some(patient_id))).unwrap();
        assert_eq!(w.accounts.get(&b.id).unwrap().patient_id, Some(patient_id));
        assert_eq!(w.store.patients.get(&patient_id).unwrap().unwrap().user_id, Some(b.id));
    }

    #[test]
    fn test_link_change_needs_admin_and_the_flow() {
        let w = world();
        let admin = Identity::new(RecordId::new(), Role::Admin, None);
        let patient_id = admin_patient(&w, "081234567890");
        let a = w.accounts.register(registration("a@example.com", "081100000001")).unwrap();
        let self_caller = Identity::new(a.id, Role::User, None);

        let err = w
            .flow
            .update_user(&self_caller, &a.id, link_to(Some(patient_id)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        // account-only updates refuse link changes
        let err = w
            .accounts
            .update_user(&admin, &a.id, link_to(Some(patient_id)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert!(w.store.patients.get(&patient_id).unwrap().unwrap().user_id.is_none());
    }

    #[test]
    fn test_unregister_frees_patient() {
        let w = world();
        let out = w
            .flow
            .register(registration("budi@example.com", "081234567890"))
            .unwrap();
        let admin = Identity::new(RecordId::new(), Role::Admin, None);

        w.flow.unregister(&admin, &out.session.user.id).unwrap();

        let patient = w
            .store
            .patients
            .get(&out.patient.patient_id)
            .unwrap()
            .unwrap();
        assert!(patient.user_id.is_none());
    }
}
