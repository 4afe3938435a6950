//! Document collections owned by the clinic service.

use crate::config::CoreConfig;
use crate::models::{Doctor, Notification, Patient, Visit};
use crate::store::Collection;
use crate::{CoreError, CoreResult};
use healthcure_uuid::RecordId;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use utoipa::ToSchema;

pub struct ClinicStore {
    pub(crate) patients: Collection<Patient>,
    pub(crate) doctors: Collection<Doctor>,
    pub(crate) visits: Collection<Visit>,
    pub(crate) notifications: Collection<Notification>,
    /// Serialises multi-collection workflows (binding, linking).
    workflow: Mutex<()>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicStats {
    pub total_patients: usize,
    pub total_doctors: usize,
}

impl ClinicStore {
    pub fn open(cfg: &CoreConfig) -> CoreResult<Self> {
        let dir = cfg.clinic_dir();
        let dir = dir.as_deref();
        Ok(Self {
            patients: Collection::open_or_memory(dir)?,
            doctors: Collection::open_or_memory(dir)?,
            visits: Collection::open_or_memory(dir)?,
            notifications: Collection::open_or_memory(dir)?,
            workflow: Mutex::new(()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            patients: Collection::in_memory(),
            doctors: Collection::in_memory(),
            visits: Collection::in_memory(),
            notifications: Collection::in_memory(),
            workflow: Mutex::new(()),
        }
    }

    pub(crate) fn lock_workflow(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.workflow
            .lock()
            .map_err(|_| CoreError::LockPoisoned("workflow"))
    }

    /// Headline counts: all patients and active doctors.
    pub fn stats(&self) -> CoreResult<ClinicStats> {
        Ok(ClinicStats {
            total_patients: self.patients.count(|_| true)?,
            total_doctors: self.doctors.count(|d| d.is_active)?,
        })
    }

    pub(crate) fn patient(&self, id: &RecordId) -> CoreResult<Patient> {
        self.patients.get(id)?.ok_or(CoreError::NotFound("patient"))
    }

    /// The patient linked to `user_id`, if any.
    pub(crate) fn patient_of(&self, user_id: &RecordId) -> CoreResult<Option<Patient>> {
        self.patients.find_one(|p| p.is_linked_to(user_id))
    }
}
