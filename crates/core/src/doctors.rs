use crate::clinic::ClinicStore;
use crate::constants::{DEFAULT_DOCTOR_SCHEDULE, UNSET_FIELD};
use crate::identity::Identity;
use crate::models::{Doctor, PublicDoctor};
use crate::policy::{authorize, authorize_all, Action, Resource};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use healthcure_types::NonEmptyText;
use healthcure_uuid::RecordId;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub nip: String,
    pub name: String,
    pub specialization: String,
    pub phone: String,
    pub email: String,
    pub schedule: Option<String>,
    pub room: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    pub nip: Option<String>,
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub schedule: Option<String>,
    pub room: Option<String>,
    pub is_active: Option<bool>,
}

/// Roster loaded by `seed_defaults`.
const DEFAULT_ROSTER: &[(&str, &str, &str, &str)] = &[
    ("198001012005011001", "dr. Andi Wijaya", "General Practitioner", "Room 101"),
    ("198203152008012002", "dr. Sari Dewi, Sp.A", "Pediatrics", "Room 102"),
    ("197905222006041003", "dr. Hendra Gunawan, Sp.PD", "Internal Medicine", "Room 201"),
    ("198507302010012004", "dr. Maya Lestari, Sp.OG", "Obstetrics and Gynecology", "Room 202"),
    ("198110102009041005", "drg. Rudi Hartono", "Dentistry", "Room 103"),
];

#[derive(Clone)]
pub struct DoctorService {
    store: Arc<ClinicStore>,
}

impl DoctorService {
    pub fn new(store: Arc<ClinicStore>) -> Self {
        Self { store }
    }

    /// Active doctors without contact details. Needs no caller.
    pub fn public_list(&self) -> CoreResult<Vec<PublicDoctor>> {
        Ok(self.active()?.iter().map(Doctor::public).collect())
    }

    pub fn list(&self, who: &Identity) -> CoreResult<Vec<Doctor>> {
        authorize(who, Resource::Doctor, Action::List)?;
        self.active()
    }

    fn active(&self) -> CoreResult<Vec<Doctor>> {
        let mut doctors = self.store.doctors.find(|d| d.is_active)?;
        doctors.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(doctors)
    }

    pub fn get(&self, who: &Identity, id: &RecordId) -> CoreResult<Doctor> {
        authorize(who, Resource::Doctor, Action::Read)?;
        self.store.doctors.get(id)?.ok_or(CoreError::NotFound("doctor"))
    }

    /// Active doctors whose name, specialization or NIP contains `query`.
    pub fn search(&self, who: &Identity, query: &str) -> CoreResult<Vec<Doctor>> {
        authorize(who, Resource::Doctor, Action::List)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::invalid("search query is required"));
        }
        Ok(self
            .active()?
            .into_iter()
            .filter(|d| d.matches(query))
            .collect())
    }

    pub fn create(&self, who: &Identity, input: NewDoctor) -> CoreResult<Doctor> {
        authorize_all(who, Resource::Doctor, Action::Create)?;
        let doctor = self.insert_unique(input)?;
        tracing::info!("doctor {} created by {}", doctor.id, who.user_id);
        Ok(doctor)
    }

    fn insert_unique(&self, input: NewDoctor) -> CoreResult<Doctor> {
        let now = Utc::now();
        let doctor = Doctor {
            id: RecordId::new(),
            nip: NonEmptyText::new(&input.nip)?,
            name: NonEmptyText::new(&input.name)?,
            specialization: NonEmptyText::new(&input.specialization)?,
            phone: input.phone.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            schedule: input
                .schedule
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_DOCTOR_SCHEDULE.to_string()),
            room: input
                .room
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| UNSET_FIELD.to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store.doctors.write(|txn| {
            if txn.find_one(|d| d.nip == doctor.nip).is_some() {
                return Err(CoreError::conflict("NIP is already registered"));
            }
            txn.put(doctor.clone());
            Ok(doctor)
        })
    }

    pub fn update(&self, who: &Identity, id: &RecordId, update: DoctorUpdate) -> CoreResult<Doctor> {
        authorize_all(who, Resource::Doctor, Action::Update)?;
        let nip = update.nip.as_deref().map(NonEmptyText::new).transpose()?;
        let name = update.name.as_deref().map(NonEmptyText::new).transpose()?;
        let specialization = update
            .specialization
            .as_deref()
            .map(NonEmptyText::new)
            .transpose()?;

        self.store.doctors.write(|txn| {
            let mut doctor = txn
                .get(id)
                .cloned()
                .ok_or(CoreError::NotFound("doctor"))?;

            if let Some(nip) = nip {
                if txn.find_one(|d| d.nip == nip && &d.id != id).is_some() {
                    return Err(CoreError::conflict("NIP is already registered"));
                }
                doctor.nip = nip;
            }
            if let Some(name) = name {
                doctor.name = name;
            }
            if let Some(specialization) = specialization {
                doctor.specialization = specialization;
            }
            if let Some(phone) = update.phone {
                doctor.phone = phone.trim().to_string();
            }
            if let Some(email) = update.email {
                doctor.email = email.trim().to_lowercase();
            }
            if let Some(schedule) = update.schedule {
                doctor.schedule = schedule.trim().to_string();
            }
            if let Some(room) = update.room {
                doctor.room = room.trim().to_string();
            }
            if let Some(is_active) = update.is_active {
                doctor.is_active = is_active;
            }
            doctor.updated_at = Utc::now();

            txn.put(doctor.clone());
            Ok(doctor)
        })
    }

    pub fn delete(&self, who: &Identity, id: &RecordId) -> CoreResult<Doctor> {
        authorize_all(who, Resource::Doctor, Action::Delete)?;
        let doctor = self
            .store
            .doctors
            .remove(id)?
            .ok_or(CoreError::NotFound("doctor"))?;
        tracing::info!("doctor {} deleted by {}", doctor.id, who.user_id);
        Ok(doctor)
    }

    /// Loads the default roster into an empty doctor collection. Returns how many were added.
    pub fn seed_defaults(&self) -> CoreResult<usize> {
        if self.store.doctors.count(|_| true)? > 0 {
            return Ok(0);
        }
        for (nip, name, specialization, room) in DEFAULT_ROSTER {
            self.insert_unique(NewDoctor {
                nip: nip.to_string(),
                name: name.to_string(),
                specialization: specialization.to_string(),
                phone: String::new(),
                email: String::new(),
                schedule: None,
                room: Some(room.to_string()),
            })?;
        }
        tracing::info!("seeded {} doctors", DEFAULT_ROSTER.len());
        Ok(DEFAULT_ROSTER.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn admin() -> Identity {
        Identity::new(RecordId::new(), Role::Admin, None)
    }

    fn new_doctor(nip: &str) -> NewDoctor {
        NewDoctor {
            nip: nip.into(),
            name: "dr. Test".into(),
            specialization: "Cardiology".into(),
            phone: "0211234567".into(),
            email: "Test@Clinic.id".into(),
            schedule: None,
            room: None,
        }
    }

    #[test]
    fn test_create_applies_defaults_and_unique_nip() {
        let service = DoctorService::new(Arc::new(ClinicStore::in_memory()));
        let doctor = service.create(&admin(), new_doctor("123")).unwrap();
        assert_eq!(doctor.schedule, DEFAULT_DOCTOR_SCHEDULE);
        assert_eq!(doctor.room, "-");
        assert_eq!(doctor.email, "test@clinic.id");

        let err = service.create(&admin(), new_doctor("123")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_users_cannot_manage_doctors() {
        let service = DoctorService::new(Arc::new(ClinicStore::in_memory()));
        let user = Identity::new(RecordId::new(), Role::User, None);
        let doctor = service.create(&admin(), new_doctor("123")).unwrap();

        assert!(matches!(
            service.create(&user, new_doctor("456")).unwrap_err(),
            CoreError::Forbidden(_)
        ));
        assert!(matches!(
            service
                .update(&user, &doctor.id, DoctorUpdate::default())
                .unwrap_err(),
            CoreError::Forbidden(_)
        ));
        assert!(matches!(
            service.delete(&user, &doctor.id).unwrap_err(),
            CoreError::Forbidden(_)
        ));
        assert_eq!(service.list(&user).unwrap().len(), 1);
    }

    #[test]
    fn test_inactive_doctors_are_hidden() {
        let service = DoctorService::new(Arc::new(ClinicStore::in_memory()));
        let doctor = service.create(&admin(), new_doctor("123")).unwrap();
        service
            .update(
                &admin(),
                &doctor.id,
                DoctorUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(service.public_list().unwrap().is_empty());
        assert!(service.list(&admin()).unwrap().is_empty());
        assert!(service.get(&admin(), &doctor.id).is_ok());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let service = DoctorService::new(Arc::new(ClinicStore::in_memory()));
        service.seed_defaults().unwrap();

        let found = service.search(&admin(), "PEDIATRICS").unwrap();
        assert_eq!(found.len(), 1);
        assert!(service.search(&admin(), "  ").is_err());
    }

    #[test]
    fn test_seed_only_fills_empty_roster() {
        let service = DoctorService::new(Arc::new(ClinicStore::in_memory()));
        assert_eq!(service.seed_defaults().unwrap(), DEFAULT_ROSTER.len());
        assert_eq!(service.seed_defaults().unwrap(), 0);
        assert_eq!(service.public_list().unwrap().len(), DEFAULT_ROSTER.len());
    }
}
