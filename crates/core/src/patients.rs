use crate::binding::BindingService;
use crate::clinic::ClinicStore;
use crate::identity::Identity;
use crate::models::{
    patient::text_or_unset, BindStatus, BloodType, Gender, Patient, PatientStatus, UserView,
};
use crate::policy::{authorize, authorize_all, Action, Resource, Scope};
use crate::{CoreError, CoreResult};
use chrono::{NaiveDate, Utc};
use healthcure_types::{EmailAddress, NonEmptyText, PhoneNumber};
use healthcure_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Admin input for a new patient record.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub blood_type: Option<BloodType>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub diagnosis: Option<String>,
    pub status: Option<PatientStatus>,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
}

/// Partial update of a patient. Owners may only change phone, address and allergies; other
/// fields they send are ignored.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub blood_type: Option<BloodType>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub diagnosis: Option<String>,
    pub status: Option<PatientStatus>,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
}

impl PatientUpdate {
    fn owner_subset(self) -> Self {
        Self {
            phone: self.phone,
            address: self.address,
            allergies: self.allergies,
            ..Default::default()
        }
    }
}

/// A user's own minimal patient record.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelfPatient {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Linked,
    Pending,
    NotLinked,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientEntry {
    #[serde(flatten)]
    pub patient: Patient,
    /// Only filled in for admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_status: Option<LinkStatus>,
}

#[derive(Clone, Debug)]
pub struct CreatedPatient {
    pub patient: Patient,
    /// Account that received a link request, if the new record matched one.
    pub notified: Option<UserView>,
}

#[derive(Clone)]
pub struct PatientService {
    store: Arc<ClinicStore>,
    binding: BindingService,
}

impl PatientService {
    pub fn new(store: Arc<ClinicStore>, binding: BindingService) -> Self {
        Self { store, binding }
    }

    /// Admins see every patient with its link status; users see only their own record.
    pub fn list(&self, who: &Identity) -> CoreResult<Vec<PatientEntry>> {
        match authorize(who, Resource::Patient, Action::List)? {
            Scope::All => {
                let mut patients = self.store.patients.find(|_| true)?;
                patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                patients
                    .into_iter()
                    .map(|patient| {
                        let link_status = Some(self.link_status(&patient)?);
                        Ok::<_, CoreError>(PatientEntry {
                            patient,
                            link_status,
                        })
                    })
                    .collect()
            }
            Scope::Own => Ok(self
                .store
                .patient_of(&who.user_id)?
                .into_iter()
                .map(|patient| PatientEntry {
                    patient,
                    link_status: None,
                })
                .collect()),
        }
    }

    fn link_status(&self, patient: &Patient) -> CoreResult<LinkStatus> {
        if patient.is_linked() {
            return Ok(LinkStatus::Linked);
        }
        let requested = patient
            .bind_request
            .as_ref()
            .is_some_and(|req| req.status == BindStatus::Pending);
        let notified = self
            .store
            .notifications
            .find_one(|n| n.is_open_link_request(&patient.id))?
            .is_some();
        Ok(if requested || notified {
            LinkStatus::Pending
        } else {
            LinkStatus::NotLinked
        })
    }

    pub fn get(&self, who: &Identity, id: &RecordId) -> CoreResult<Patient> {
        let scope = authorize(who, Resource::Patient, Action::Read)?;
        let patient = self.store.patient(id)?;
        if scope == Scope::Own && !patient.is_linked_to(&who.user_id) {
            return Err(CoreError::Forbidden("no access to this patient"));
        }
        Ok(patient)
    }

    pub fn my_data(&self, who: &Identity) -> CoreResult<Patient> {
        authorize(who, Resource::Patient, Action::Read)?;
        self.store
            .patient_of(&who.user_id)?
            .ok_or(CoreError::NotFound("linked patient record"))
    }

    /// Admin creation. A record matching an account without a patient raises a link request
    /// instead of linking.
    ///
    /// # Returns
    /// The new patient and, when a link request went out, the account it was sent to.
    ///
    /// # Errors
    /// - `Forbidden` for non-admin callers
    /// - `InvalidInput` if the name, phone or email is invalid
    /// - `Conflict` if another patient already has this phone
    pub fn create(&self, who: &Identity, input: NewPatient) -> CoreResult<CreatedPatient> {
        authorize_all(who, Resource::Patient, Action::Create)?;

        let name = NonEmptyText::new(&input.name)?;
        let phone = PhoneNumber::parse(&input.phone)?;
        let email = optional_email(input.email.as_deref())?;
        if let Some(doctor_id) = &input.doctor_id {
            self.ensure_doctor(doctor_id)?;
        }

        let mut patient = Patient::minimal(name, phone, email, None, Some(who.user_id));
        patient.date_of_birth = input.date_of_birth;
        patient.gender = input.gender;
        patient.address = text_or_unset(input.address);
        patient.blood_type = input.blood_type.unwrap_or_default();
        patient.allergies = text_or_unset(input.allergies);
        patient.medical_history = text_or_unset(input.medical_history);
        patient.diagnosis = text_or_unset(input.diagnosis);
        patient.status = input.status.unwrap_or_default();
        patient.doctor_id = input.doctor_id;

        let patient = self.store.patients.write(|txn| {
            if txn.find_one(|p| p.phone == patient.phone).is_some() {
                return Err(CoreError::conflict("phone is already registered"));
            }
            txn.put(patient.clone());
            Ok(patient)
        })?;
        tracing::info!("patient {} created by {}", patient.id, who.user_id);

        let notified = self.binding.request_link(&patient)?;
        let patient = match notified {
            Some(_) => self.store.patient(&patient.id)?,
            None => patient,
        };

        Ok(CreatedPatient {
            patient,
            notified: notified.as_ref().map(|u| u.view()),
        })
    }

    /// Creates a minimal record linked to the caller.
    pub fn create_from_user(&self, who: &Identity, input: SelfPatient) -> CoreResult<Patient> {
        authorize(who, Resource::Patient, Action::Create)?;
        let name = NonEmptyText::new(&input.name)?;
        let phone = PhoneNumber::parse(&input.phone)?;
        let email = optional_email(input.email.as_deref())?;

        let _guard = self.store.lock_workflow()?;
        if self.store.patient_of(&who.user_id)?.is_some() {
            return Err(CoreError::conflict("account already has a patient profile"));
        }

        let patient = Patient::minimal(
            name,
            phone,
            email,
            Some(who.user_id),
            Some(who.user_id),
        );
        let patient = self.store.patients.write(|txn| {
            let taken = txn
                .find_one(|p| {
                    p.phone == patient.phone
                        || (patient.email.is_some() && p.email == patient.email)
                })
                .is_some();
            if taken {
                return Err(CoreError::conflict(
                    "a patient with this email or phone already exists",
                ));
            }
            txn.put(patient.clone());
            Ok(patient)
        })?;
        self.binding.mirror_new(&patient)?;

        tracing::info!("patient {} created for account {}", patient.id, who.user_id);
        Ok(patient)
    }

    pub fn update(
        &self,
        who: &Identity,
        id: &RecordId,
        update: PatientUpdate,
    ) -> CoreResult<Patient> {
        let update = match authorize(who, Resource::Patient, Action::Update)? {
            Scope::All => update,
            Scope::Own => {
                if !self.store.patient(id)?.is_linked_to(&who.user_id) {
                    return Err(CoreError::Forbidden("no access to this patient"));
                }
                update.owner_subset()
            }
        };

        let name = update.name.as_deref().map(NonEmptyText::new).transpose()?;
        let phone = update.phone.as_deref().map(PhoneNumber::parse).transpose()?;
        let email = match update.email.as_deref() {
            Some(raw) => Some(optional_email(Some(raw))?),
            None => None,
        };
        if let Some(doctor_id) = &update.doctor_id {
            self.ensure_doctor(doctor_id)?;
        }

        self.store.patients.write(|txn| {
            let mut patient = txn
                .get(id)
                .cloned()
                .ok_or(CoreError::NotFound("patient"))?;

            if let Some(phone) = &phone {
                if txn.find_one(|p| &p.phone == phone && &p.id != id).is_some() {
                    return Err(CoreError::conflict("phone is already registered"));
                }
            }

            if let Some(name) = name {
                patient.name = name;
            }
            if let Some(phone) = phone {
                patient.phone = phone;
            }
            if let Some(email) = email {
                patient.email = email;
            }
            if let Some(dob) = update.date_of_birth {
                patient.date_of_birth = Some(dob);
            }
            if let Some(gender) = update.gender {
                patient.gender = Some(gender);
            }
            if update.address.is_some() {
                patient.address = text_or_unset(update.address);
            }
            if let Some(blood_type) = update.blood_type {
                patient.blood_type = blood_type;
            }
            if update.allergies.is_some() {
                patient.allergies = text_or_unset(update.allergies);
            }
            if update.medical_history.is_some() {
                patient.medical_history = text_or_unset(update.medical_history);
            }
            if update.diagnosis.is_some() {
                patient.diagnosis = text_or_unset(update.diagnosis);
            }
            if let Some(status) = update.status {
                patient.status = status;
            }
            if update.doctor_id.is_some() {
                patient.doctor_id = update.doctor_id;
            }
            patient.updated_at = Utc::now();

            txn.put(patient.clone());
            Ok(patient)
        })
    }

    /// Removes the record and clears the link held by its account.
    pub fn delete(&self, who: &Identity, id: &RecordId) -> CoreResult<Patient> {
        authorize_all(who, Resource::Patient, Action::Delete)?;
        let _guard = self.store.lock_workflow()?;
        let patient = self
            .store
            .patients
            .remove(id)?
            .ok_or(CoreError::NotFound("patient"))?;
        if let Some(user_id) = &patient.user_id {
            self.binding.clear_account_link(user_id)?;
        }
        tracing::info!("patient {} deleted by {}", patient.id, who.user_id);
        Ok(patient)
    }

    /// Case-insensitive search over name, email and phone.
    pub fn search(&self, who: &Identity, query: &str) -> CoreResult<Vec<Patient>> {
        let scope = authorize(who, Resource::Patient, Action::List)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::invalid("search query is required"));
        }

        let needle = query.to_lowercase();
        let mut found = self.store.patients.find(|p| {
            (scope == Scope::All || p.is_linked_to(&who.user_id))
                && (p.name.contains_ignore_case(&needle)
                    || p
                        .email
                        .as_ref()
                        .is_some_and(|e| e.as_str().contains(&needle))
                    || p.phone.as_str().contains(&needle)
                    || p.phone.contains_digits(&needle))
        })?;
        found.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(found)
    }

    fn ensure_doctor(&self, doctor_id: &RecordId) -> CoreResult<()> {
        self.store
            .doctors
            .get(doctor_id)?
            .map(|_| ())
            .ok_or(CoreError::NotFound("doctor"))
    }
}

/// Blank means no email.
fn optional_email(raw: Option<&str>) -> CoreResult<Option<EmailAddress>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(Some(EmailAddress::parse(v)?)),
        None => Ok(None),
    }
}
