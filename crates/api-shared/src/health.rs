use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub service: String,
}

/// Health check shared by every HealthCure service.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports `service` as up.
    pub fn check_health(service: &str) -> HealthRes {
        HealthRes {
            status: "OK".into(),
            service: service.into(),
        }
    }
}
