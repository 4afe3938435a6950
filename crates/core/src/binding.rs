//! Linking user accounts to patient records.
//!
//! Two paths lead to a link:
//! - self-registration claims an unlinked patient with the same phone number straight away
//!   ([`BindingService::claim_by_phone`]);
//! - an admin-created patient that matches an existing account raises a link request which the
//!   account holder approves or rejects ([`BindingService::request_link`]).
//!
//! The patient side (`Patient::user_id`) and the account side (`User::patient_id`) live in
//! different stores. Every workflow here runs under the clinic workflow lock, writes the patient
//! first and then mirrors the link into the [`UserDirectory`], restoring the patient if that
//! second step fails.

use crate::accounts::UserDirectory;
use crate::clinic::ClinicStore;
use crate::identity::Identity;
use crate::models::{
    BindRequest, BindStatus, NotificationData, NotificationKind, Patient, PatientSummary, User,
};
use crate::notifications::{self, Outgoing};
use crate::policy::{authorize, authorize_all, Action, Resource};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use healthcure_types::{EmailAddress, PhoneNumber};
use healthcure_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Phone,
    Email,
    Both,
}

#[derive(Clone, Debug)]
pub enum PatientMatch {
    MatchFound {
        match_type: MatchType,
        patient: PatientSummary,
    },
    AlreadyLinked,
    NoMatch,
}

/// An account without a patient profile that matches an admin's new patient.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMatch {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Result of [`BindingService::claim_by_phone`].
#[derive(Clone, Debug)]
pub enum Claim {
    /// An existing admin-entered record was taken over.
    Bound(Patient),
    /// No record matched, so a minimal one was created.
    Created(Patient),
}

impl Claim {
    pub fn patient(&self) -> &Patient {
        match self {
            Claim::Bound(p) | Claim::Created(p) => p,
        }
    }
}

#[derive(Clone)]
pub struct BindingService {
    store: Arc<ClinicStore>,
    directory: Arc<dyn UserDirectory>,
}

impl BindingService {
    pub fn new(store: Arc<ClinicStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Looks for a patient record a prospective account could take over.
    ///
    /// An unlinked phone match wins over an unlinked email match.
    ///
    /// # Returns
    /// `MatchFound` with the match type and a summary, `AlreadyLinked` when the matching record
    /// belongs to another account, otherwise `NoMatch`.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the email or phone cannot be parsed.
    pub fn check_patient_match(&self, email: &str, phone: &str) -> CoreResult<PatientMatch> {
        let email = EmailAddress::parse(email)?;
        let phone = PhoneNumber::parse(phone)?;

        let by_phone = self.store.patients.find_one(|p| p.phone == phone)?;
        let by_email = self
            .store
            .patients
            .find_one(|p| p.email.as_ref() == Some(&email))?;

        match (&by_phone, &by_email) {
            (Some(p), _) if !p.is_linked() => {
                let both = by_email.as_ref().is_some_and(|e| e.id == p.id);
                Ok(PatientMatch::MatchFound {
                    match_type: if both { MatchType::Both } else { MatchType::Phone },
                    patient: p.summary(),
                })
            }
            (_, Some(e)) if !e.is_linked() => Ok(PatientMatch::MatchFound {
                match_type: MatchType::Email,
                patient: e.summary(),
            }),
            (None, None) => Ok(PatientMatch::NoMatch),
            _ => Ok(PatientMatch::AlreadyLinked),
        }
    }

    /// Finds an account without a patient profile by email, then by phone.
    pub fn check_user_match(
        &self,
        who: &Identity,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> CoreResult<Option<UserMatch>> {
        authorize_all(who, Resource::Patient, Action::Create)?;
        let email = parse_optional(email, |v| EmailAddress::parse(v))?;
        let phone = parse_optional(phone, |v| PhoneNumber::parse(v))?;
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }

        let user = self
            .directory
            .find_by_contact(email.as_ref(), phone.as_ref())?;
        Ok(user.filter(|u| u.patient_id.is_none()).map(|u| UserMatch {
            id: u.id,
            name: u.name.to_string(),
            email: u.email.to_string(),
            phone: u.phone.map(|p| p.to_string()),
        }))
    }

    /// Gives a freshly registered account its patient record.
    ///
    /// An unlinked patient with the account's phone absorbs the account, keeping the clinical
    /// fields an admin entered and only filling in a missing email. A patient with that phone
    /// linked to someone else is a conflict, as is an account that already has a patient.
    pub fn claim_by_phone(&self, user: &User) -> CoreResult<Claim> {
        let phone = user
            .phone
            .clone()
            .ok_or_else(|| CoreError::invalid("phone is required"))?;
        let _guard = self.store.lock_workflow()?;

        if self.store.patient_of(&user.id)?.is_some() {
            return Err(CoreError::conflict("account already has a patient profile"));
        }

        let now = Utc::now();
        let mut before = None;
        let claim = self.store.patients.write(|txn| {
            match txn.find_one(|p| p.phone == phone).cloned() {
                Some(existing) if existing.is_linked() => Err(CoreError::conflict("already_linked")),
                Some(mut patient) => {
                    before = Some(patient.clone());
                    patient.user_id = Some(user.id);
                    if patient.email.is_none() {
                        patient.email = Some(user.email.clone());
                    }
                    if let Some(req) = patient.bind_request.as_mut() {
                        if req.user_id == user.id && req.status == BindStatus::Pending {
                            req.status = BindStatus::Approved;
                        }
                    }
                    patient.updated_at = now;
                    txn.put(patient.clone());
                    Ok(Claim::Bound(patient))
                }
                None => {
                    let patient = Patient::minimal(
                        user.name.clone(),
                        phone.clone(),
                        Some(user.email.clone()),
                        Some(user.id),
                        Some(user.id),
                    );
                    txn.put(patient.clone());
                    Ok(Claim::Created(patient))
                }
            }
        })?;

        let patient = claim.patient();
        if let Err(e) = self.directory.set_patient_link(&user.id, Some(patient.id)) {
            tracing::warn!("undoing claim of patient {} after failed account link: {}", patient.id, e);
            match before {
                Some(before) => {
                    self.store.patients.insert(before)?;
                }
                None => {
                    self.store.patients.remove(&patient.id)?;
                }
            }
            return Err(e);
        }

        match &claim {
            Claim::Bound(p) => tracing::info!("account {} auto-bound to patient {}", user.id, p.id),
            Claim::Created(p) => tracing::info!("created patient {} for account {}", p.id, user.id),
        }
        Ok(claim)
    }

    /// Explicitly binds an unlinked patient to `user_id`. Admins or the account itself only.
    pub fn auto_bind(
        &self,
        who: &Identity,
        patient_id: &RecordId,
        user_id: &RecordId,
    ) -> CoreResult<Patient> {
        authorize(who, Resource::Patient, Action::Link)?;
        if !who.is_admin_or(user_id) {
            return Err(CoreError::Forbidden("cannot bind another account"));
        }

        let _guard = self.store.lock_workflow()?;
        let user = self
            .directory
            .get_user(user_id)?
            .ok_or(CoreError::NotFound("user"))?;
        if self.store.patient_of(user_id)?.is_some() {
            return Err(CoreError::conflict("account already has a patient profile"));
        }

        let before = self.store.patient(patient_id)?;
        let patient = self.store.patients.update(patient_id, "patient", |p| {
            if p.is_linked() {
                return Err(CoreError::conflict("already_linked"));
            }
            p.user_id = Some(user.id);
            if p.email.is_none() {
                p.email = Some(user.email.clone());
            }
            p.updated_at = Utc::now();
            Ok(())
        })?;
        self.mirror_link(&before, &user.id, Some(patient.id))?;

        tracing::info!("account {} bound to patient {}", user.id, patient.id);
        Ok(patient)
    }

    /// Raises a link request for an admin-created patient that matches an account without a
    /// patient. Returns the account that was notified.
    pub(crate) fn request_link(&self, patient: &Patient) -> CoreResult<Option<User>> {
        let _guard = self.store.lock_workflow()?;
        let Some(user) = self
            .directory
            .find_by_contact(patient.email.as_ref(), Some(&patient.phone))?
            .filter(|u| u.patient_id.is_none())
        else {
            return Ok(None);
        };

        self.store.patients.update(&patient.id, "patient", |p| {
            p.bind_request = Some(BindRequest {
                user_id: user.id,
                user_name: user.name.to_string(),
                user_email: user.email.clone(),
                requested_at: Utc::now(),
                status: BindStatus::Pending,
            });
            Ok(())
        })?;

        notifications::send(
            &self.store,
            user.id,
            Outgoing {
                kind: NotificationKind::LinkRequest,
                title: "Link patient record".into(),
                message: format!(
                    "An admin created a patient record for \"{}\" that matches your account. Open it to link it.",
                    patient.name
                ),
                data: NotificationData {
                    patient_id: Some(patient.id),
                    patient_name: Some(patient.name.to_string()),
                    patient_phone: Some(patient.phone.to_string()),
                    patient_email: patient.email.as_ref().map(ToString::to_string),
                    visit_id: None,
                },
            },
        )?;

        tracing::info!("link request for patient {} sent to {}", patient.id, user.id);
        Ok(Some(user))
    }

    /// Patients with a pending link request addressed to the caller.
    pub fn my_bind_requests(&self, who: &Identity) -> CoreResult<Vec<Patient>> {
        authorize(who, Resource::Patient, Action::Read)?;
        self.store
            .patients
            .find(|p| p.has_pending_request_for(&who.user_id))
    }

    /// Accepts a link request addressed to the caller.
    ///
    /// A bind request recorded on the patient decides: it must still be pending. Without one,
    /// a link request notification for this patient is required.
    ///
    /// # Returns
    /// The patient, now linked to the caller.
    ///
    /// # Errors
    /// - `InvalidInput` if there is no request, or it was already approved or rejected
    /// - `Conflict` if the patient is linked or the caller already has a patient profile
    pub fn approve_bind_request(&self, who: &Identity, patient_id: &RecordId) -> CoreResult<Patient> {
        authorize(who, Resource::Patient, Action::Link)?;
        let _guard = self.store.lock_workflow()?;

        let before = self.store.patient(patient_id)?;
        match before
            .bind_request
            .as_ref()
            .filter(|req| req.user_id == who.user_id)
        {
            Some(req) if req.status != BindStatus::Pending => {
                return Err(CoreError::invalid("bind request is no longer pending"));
            }
            Some(_) => {}
            None => {
                let notified = self
                    .store
                    .notifications
                    .find_one(|n| {
                        n.user_id == who.user_id
                            && n.kind == NotificationKind::LinkRequest
                            && n.data.patient_id.as_ref() == Some(patient_id)
                    })?
                    .is_some();
                if !notified {
                    return Err(CoreError::invalid("no bind request for this account"));
                }
            }
        }
        if before.is_linked() {
            return Err(CoreError::conflict("already_linked"));
        }
        if self.store.patient_of(&who.user_id)?.is_some() {
            return Err(CoreError::conflict("account already has a patient profile"));
        }

        let patient = self.store.patients.update(patient_id, "patient", |p| {
            p.user_id = Some(who.user_id);
            if let Some(req) = p.bind_request.as_mut().filter(|req| req.user_id == who.user_id) {
                req.status = BindStatus::Approved;
            }
            p.updated_at = Utc::now();
            Ok(())
        })?;
        self.mirror_link(&before, &who.user_id, Some(patient.id))?;

        notifications::close_link_requests(&self.store, &who.user_id, &patient.id)?;
        notifications::send(
            &self.store,
            who.user_id,
            Outgoing {
                kind: NotificationKind::AccountLinked,
                title: "Account linked".into(),
                message: format!(
                    "The patient record \"{}\" is now linked to your account. You can now see your visit history.",
                    patient.name
                ),
                data: NotificationData {
                    patient_id: Some(patient.id),
                    ..Default::default()
                },
            },
        )?;

        tracing::info!("account {} approved link to patient {}", who.user_id, patient.id);
        Ok(patient)
    }

    /// Declines a pending link request. The patient stays unlinked.
    pub fn reject_bind_request(&self, who: &Identity, patient_id: &RecordId) -> CoreResult<Patient> {
        authorize(who, Resource::Patient, Action::Link)?;
        let _guard = self.store.lock_workflow()?;

        let patient = self.store.patients.update(patient_id, "patient", |p| {
            let req = p
                .bind_request
                .as_mut()
                .filter(|req| req.user_id == who.user_id && req.status == BindStatus::Pending)
                .ok_or_else(|| CoreError::invalid("no bind request for this account"))?;
            req.status = BindStatus::Rejected;
            p.updated_at = Utc::now();
            Ok(())
        })?;
        notifications::close_link_requests(&self.store, &who.user_id, &patient.id)?;

        tracing::info!("account {} rejected link to patient {}", who.user_id, patient.id);
        Ok(patient)
    }

    /// Admin link. Moves the account's link to this patient.
    ///
    /// Any other patient held by the account is released, and a pending request from the
    /// account on this patient is marked approved.
    ///
    /// # Errors
    /// - `Forbidden` for non-admin callers
    /// - `NotFound` if the account or patient does not exist
    /// - `Conflict` if the patient is linked to a different account
    pub fn link_user_to_patient(
        &self,
        who: &Identity,
        user_id: &RecordId,
        patient_id: &RecordId,
    ) -> CoreResult<Patient> {
        authorize_all(who, Resource::Patient, Action::Link)?;
        let _guard = self.store.lock_workflow()?;

        let user = self
            .directory
            .get_user(user_id)?
            .ok_or(CoreError::NotFound("user"))?;
        let before = self.store.patient(patient_id)?;
        if before.user_id.is_some_and(|linked| linked != user.id) {
            return Err(CoreError::conflict("patient is linked to another account"));
        }

        let now = Utc::now();
        let patient = self.store.patients.write(|txn| {
            for previous in txn.find(|p| p.is_linked_to(&user.id) && &p.id != patient_id) {
                let mut previous = previous.clone();
                previous.user_id = None;
                previous.updated_at = now;
                txn.put(previous);
            }

            let mut patient = txn
                .get(patient_id)
                .cloned()
                .ok_or(CoreError::NotFound("patient"))?;
            patient.user_id = Some(user.id);
            if let Some(req) = patient.bind_request.as_mut() {
                if req.user_id == user.id && req.status == BindStatus::Pending {
                    req.status = BindStatus::Approved;
                }
            }
            patient.updated_at = now;
            txn.put(patient.clone());
            Ok(patient)
        })?;
        self.mirror_link(&before, &user.id, Some(patient.id))?;
        notifications::close_link_requests(&self.store, &user.id, &patient.id)?;

        tracing::info!("admin {} linked account {} to patient {}", who.user_id, user.id, patient.id);
        Ok(patient)
    }

    /// Admin unlink. Returns the patient and the account it was linked to.
    pub fn unlink_patient(
        &self,
        who: &Identity,
        patient_id: &RecordId,
    ) -> CoreResult<(Patient, RecordId)> {
        authorize_all(who, Resource::Patient, Action::Link)?;
        let _guard = self.store.lock_workflow()?;

        let mut previous = None;
        let patient = self.store.patients.update(patient_id, "patient", |p| {
            previous = p.user_id.take();
            if previous.is_none() {
                return Err(CoreError::invalid("patient is not linked to any account"));
            }
            p.updated_at = Utc::now();
            Ok(())
        })?;
        let previous = previous.ok_or(CoreError::invalid("patient is not linked to any account"))?;

        self.clear_account_link(&previous)?;
        tracing::info!("admin {} unlinked patient {} from {}", who.user_id, patient.id, previous);
        Ok((patient, previous))
    }

    /// Admin change of an account's patient link, applied on both sides.
    ///
    /// `Some` links the account to that patient as [`Self::link_user_to_patient`] does. `None`
    /// unlinks whatever patient the account holds, or clears a dangling account-side link.
    pub fn set_account_link(
        &self,
        who: &Identity,
        user_id: &RecordId,
        patient_id: Option<RecordId>,
    ) -> CoreResult<()> {
        authorize_all(who, Resource::Patient, Action::Link)?;
        if let Some(patient_id) = patient_id {
            return self.link_user_to_patient(who, user_id, &patient_id).map(|_| ());
        }
        match self.store.patient_of(user_id)? {
            Some(patient) => self.unlink_patient(who, &patient.id).map(|_| ()),
            None => {
                self.directory.set_patient_link(user_id, None)?;
                Ok(())
            }
        }
    }

    pub fn unlinked_patients(&self, who: &Identity) -> CoreResult<Vec<Patient>> {
        authorize_all(who, Resource::Patient, Action::List)?;
        let mut patients = self.store.patients.find(|p| !p.is_linked())?;
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(patients)
    }

    /// Frees whatever patient is linked to a deleted account.
    pub fn release_user(&self, user_id: &RecordId) -> CoreResult<Option<Patient>> {
        let _guard = self.store.lock_workflow()?;
        let Some(patient) = self.store.patient_of(user_id)? else {
            return Ok(None);
        };
        let patient = self.store.patients.update(&patient.id, "patient", |p| {
            p.user_id = None;
            p.updated_at = Utc::now();
            Ok(())
        })?;
        tracing::info!("released patient {} from deleted account {}", patient.id, user_id);
        Ok(Some(patient))
    }

    /// Mirrors the link of a record that was created already linked, dropping the record if the
    /// account side refuses it.
    pub(crate) fn mirror_new(&self, patient: &Patient) -> CoreResult<()> {
        let Some(user_id) = patient.user_id else {
            return Ok(());
        };
        if let Err(e) = self.directory.set_patient_link(&user_id, Some(patient.id)) {
            tracing::warn!("dropping patient {} after failed account link: {}", patient.id, e);
            self.store.patients.remove(&patient.id)?;
            return Err(e);
        }
        Ok(())
    }

    /// Clears the account side of a link that was removed on the patient side.
    pub(crate) fn clear_account_link(&self, user_id: &RecordId) -> CoreResult<()> {
        match self.directory.set_patient_link(user_id, None) {
            Ok(_) | Err(CoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Records the link on the account side, restoring `before` if that fails.
    fn mirror_link(
        &self,
        before: &Patient,
        user_id: &RecordId,
        patient_id: Option<RecordId>,
    ) -> CoreResult<()> {
        if let Err(e) = self.directory.set_patient_link(user_id, patient_id) {
            tracing::warn!("restoring patient {} after failed account link: {}", before.id, e);
            self.store.patients.insert(before.clone())?;
            return Err(e);
        }
        Ok(())
    }
}

fn parse_optional<T, E>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Result<T, E>,
) -> CoreResult<Option<T>>
where
    CoreError: From<E>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(Some(parse(v)?)),
        None => Ok(None),
    }
}
