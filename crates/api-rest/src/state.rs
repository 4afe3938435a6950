use healthcure_core::{
    AccountService, BindingService, ClinicStore, CoreConfig, CoreResult, DoctorService,
    NotificationService, PatientService, RegistrationFlow, UserDirectory, VisitService,
};
use std::sync::Arc;

/// Application state shared by the auth and clinic routers.
///
/// Both services run in one process, so the clinic workflows reach accounts through the
/// [`UserDirectory`] implemented by [`AccountService`].
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub accounts: Arc<AccountService>,
    pub registration: RegistrationFlow,
    pub clinic: Arc<ClinicStore>,
    pub binding: BindingService,
    pub patients: PatientService,
    pub doctors: DoctorService,
    pub visits: VisitService,
    pub notifications: NotificationService,
}

impl AppState {
    /// Opens (or creates) the auth and clinic stores described by `cfg`.
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let accounts = Arc::new(AccountService::open(cfg.clone())?);
        let clinic = Arc::new(ClinicStore::open(&cfg)?);
        let directory: Arc<dyn UserDirectory> = accounts.clone();
        let binding = BindingService::new(clinic.clone(), directory);

        Ok(Self {
            registration: RegistrationFlow::new(accounts.clone(), binding.clone()),
            patients: PatientService::new(clinic.clone(), binding.clone()),
            doctors: DoctorService::new(clinic.clone()),
            visits: VisitService::new(clinic.clone()),
            notifications: NotificationService::new(clinic.clone()),
            binding,
            accounts,
            clinic,
            cfg,
        })
    }
}
