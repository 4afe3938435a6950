use crate::clinic::ClinicStore;
use crate::identity::Identity;
use crate::models::{
    patient::text_or_unset, NotificationData, NotificationKind, Patient, Visit, VisitStatus,
};
use crate::notifications::{self, Outgoing};
use crate::policy::{authorize, authorize_all, Action, Resource};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use healthcure_types::NonEmptyText;
use healthcure_uuid::RecordId;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    pub visit_date: Option<DateTime<Utc>>,
    pub complaint: String,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub status: Option<VisitStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitUpdate {
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    pub visit_date: Option<DateTime<Utc>>,
    pub complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub status: Option<VisitStatus>,
}

#[derive(Clone)]
pub struct VisitService {
    store: Arc<ClinicStore>,
}

impl VisitService {
    pub fn new(store: Arc<ClinicStore>) -> Self {
        Self { store }
    }

    /// All visits, latest visit date first.
    pub fn list(&self, who: &Identity) -> CoreResult<Vec<Visit>> {
        authorize_all(who, Resource::Visit, Action::List)?;
        self.sorted(|_| true)
    }

    pub fn by_patient(&self, who: &Identity, patient_id: &RecordId) -> CoreResult<Vec<Visit>> {
        authorize_all(who, Resource::Visit, Action::List)?;
        self.sorted(|v| &v.patient_id == patient_id)
    }

    /// Visits of the caller's linked patient; empty when the caller has none.
    pub fn my_visits(&self, who: &Identity) -> CoreResult<Vec<Visit>> {
        authorize(who, Resource::Visit, Action::List)?;
        match self.store.patient_of(&who.user_id)? {
            Some(patient) => self.sorted(|v| v.patient_id == patient.id),
            None => Ok(Vec::new()),
        }
    }

    fn sorted(&self, pred: impl Fn(&Visit) -> bool) -> CoreResult<Vec<Visit>> {
        let mut visits = self.store.visits.find(pred)?;
        visits.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        Ok(visits)
    }

    /// Records a visit for a patient whose demographics are complete, and notifies the
    /// linked account.
    ///
    /// # Errors
    /// - `Forbidden` for non-admin callers
    /// - `NotFound` if the patient or the referenced doctor does not exist
    /// - `IncompletePatient` listing the missing date of birth, gender, address or blood type
    pub fn create(&self, who: &Identity, input: NewVisit) -> CoreResult<Visit> {
        authorize_all(who, Resource::Visit, Action::Create)?;
        let complaint = NonEmptyText::new(&input.complaint)?;

        let patient = self.store.patient(&input.patient_id)?;
        let missing_fields = patient.missing_visit_fields();
        if !missing_fields.is_empty() {
            return Err(CoreError::IncompletePatient {
                patient_id: patient.id,
                missing_fields,
            });
        }
        if let Some(doctor_id) = &input.doctor_id {
            self.ensure_doctor(doctor_id)?;
        }

        let now = Utc::now();
        let visit = self.store.visits.insert(Visit {
            id: RecordId::new(),
            patient_id: patient.id,
            doctor_id: input.doctor_id,
            visit_date: input.visit_date.unwrap_or(now),
            complaint,
            diagnosis: text_or_unset(input.diagnosis),
            treatment: text_or_unset(input.treatment),
            prescription: text_or_unset(input.prescription),
            notes: input.notes.map(|n| n.trim().to_string()).unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            created_by: who.user_id,
            created_at: now,
            updated_at: now,
        })?;
        tracing::info!("visit {} recorded for patient {}", visit.id, patient.id);

        self.notify(
            &patient,
            &visit,
            NotificationKind::VisitCreated,
            "New visit",
            format!(
                "A visit was recorded for you on {}. Complaint: {}",
                visit.visit_date.format("%d/%m/%Y"),
                visit.complaint
            ),
        )?;
        Ok(visit)
    }

    /// Admin update. A status change is reported to the linked account.
    pub fn update(&self, who: &Identity, id: &RecordId, update: VisitUpdate) -> CoreResult<Visit> {
        authorize_all(who, Resource::Visit, Action::Update)?;
        let complaint = update
            .complaint
            .as_deref()
            .map(NonEmptyText::new)
            .transpose()?;
        if let Some(doctor_id) = &update.doctor_id {
            self.ensure_doctor(doctor_id)?;
        }

        let mut previous_status = VisitStatus::default();
        let visit = self.store.visits.update(id, "visit", |v| {
            previous_status = v.status;
            if update.doctor_id.is_some() {
                v.doctor_id = update.doctor_id;
            }
            if let Some(date) = update.visit_date {
                v.visit_date = date;
            }
            if let Some(complaint) = complaint {
                v.complaint = complaint;
            }
            if update.diagnosis.is_some() {
                v.diagnosis = text_or_unset(update.diagnosis);
            }
            if update.treatment.is_some() {
                v.treatment = text_or_unset(update.treatment);
            }
            if update.prescription.is_some() {
                v.prescription = text_or_unset(update.prescription);
            }
            if let Some(notes) = update.notes {
                v.notes = notes.trim().to_string();
            }
            if let Some(status) = update.status {
                v.status = status;
            }
            v.updated_at = Utc::now();
            Ok(())
        })?;

        if visit.status != previous_status {
            if let Some(patient) = self.store.patients.get(&visit.patient_id)? {
                let date = visit.visit_date.format("%d/%m/%Y");
                match visit.status {
                    VisitStatus::Completed => self.notify(
                        &patient,
                        &visit,
                        NotificationKind::VisitCompleted,
                        "Visit completed",
                        format!("Your visit on {} is complete. Thank you for visiting.", date),
                    )?,
                    VisitStatus::Ongoing => self.notify(
                        &patient,
                        &visit,
                        NotificationKind::VisitUpdated,
                        "Visit status updated",
                        format!("Your visit on {} is in progress.", date),
                    )?,
                }
            }
        }
        Ok(visit)
    }

    pub fn delete(&self, who: &Identity, id: &RecordId) -> CoreResult<Visit> {
        authorize_all(who, Resource::Visit, Action::Delete)?;
        self.store
            .visits
            .remove(id)?
            .ok_or(CoreError::NotFound("visit"))
    }

    fn ensure_doctor(&self, doctor_id: &RecordId) -> CoreResult<()> {
        self.store
            .doctors
            .get(doctor_id)?
            .map(|_| ())
            .ok_or(CoreError::NotFound("doctor"))
    }

    /// Notifies the account linked to `patient`, if any.
    fn notify(
        &self,
        patient: &Patient,
        visit: &Visit,
        kind: NotificationKind,
        title: &str,
        message: String,
    ) -> CoreResult<()> {
        let Some(user_id) = patient.user_id else {
            return Ok(());
        };
        notifications::send(
            &self.store,
            user_id,
            Outgoing {
                kind,
                title: title.to_string(),
                message,
                data: NotificationData {
                    visit_id: Some(visit.id),
                    ..Default::default()
                },
            },
        )?;
        Ok(())
    }
}
