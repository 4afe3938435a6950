//! Router of the clinic service: patients, doctors, visits, notifications and stats.

use crate::error::ApiResult;
use crate::patients::{CreatePatientRes, MatchRes, UserMatchRes};
use crate::notifications::NotificationsRes;
use crate::state::AppState;
use crate::{doctors, notifications, patients, visits};
use api_shared::bodies::{ContactReq, LinkReq, OptionalContactReq, PatientIdReq};
use api_shared::{Envelope, ErrorBody, HealthRes, HealthService};
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use healthcure_core::models::{
    BindRequest, BindStatus, BloodType, Doctor, Gender, Notification, NotificationData,
    NotificationKind, Patient, PatientStatus, PatientSummary, PublicDoctor, Visit, VisitStatus,
};
use healthcure_core::{
    ClinicStats, DoctorUpdate, LinkStatus, MatchType, NewDoctor, NewPatient, NewVisit,
    PatientEntry, PatientUpdate, SelfPatient, UserMatch, VisitUpdate,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const SERVICE_NAME: &str = "clinic-service";

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        stats,
        patients::check_match,
        patients::auto_bind,
        patients::create_from_user,
        patients::check_user_match,
        patients::unlinked_patients,
        patients::link_patient,
        patients::unlink_patient,
        patients::my_bind_requests,
        patients::approve_bind_request,
        patients::reject_bind_request,
        patients::my_data,
        patients::search,
        patients::list,
        patients::read,
        patients::create,
        patients::update,
        patients::delete,
        doctors::public_list,
        doctors::list,
        doctors::search,
        doctors::read,
        doctors::create,
        doctors::update,
        doctors::delete,
        visits::my_visits,
        visits::by_patient,
        visits::list,
        visits::create,
        visits::update,
        visits::delete,
        notifications::list,
        notifications::mark_read,
        notifications::mark_all_read,
    ),
    components(schemas(
        HealthRes,
        ErrorBody,
        ClinicStats,
        ContactReq,
        OptionalContactReq,
        LinkReq,
        PatientIdReq,
        Patient,
        PatientEntry,
        PatientSummary,
        PatientStatus,
        LinkStatus,
        BindRequest,
        BindStatus,
        BloodType,
        Gender,
        NewPatient,
        PatientUpdate,
        SelfPatient,
        MatchType,
        MatchRes,
        UserMatch,
        UserMatchRes,
        CreatePatientRes,
        Doctor,
        PublicDoctor,
        NewDoctor,
        DoctorUpdate,
        Visit,
        VisitStatus,
        NewVisit,
        VisitUpdate,
        Notification,
        NotificationData,
        NotificationKind,
        NotificationsRes,
    ))
)]
pub struct ClinicApiDoc;

/// Router of the clinic service, with OpenAPI docs at `/swagger-ui`.
///
/// # Returns
/// A `Router` nesting the patient, doctor, visit and notification routes under `/api`, plus
/// `/health` and `/api/stats`, with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .nest("/api/patients", patients::routes())
        .nest("/api/doctors", doctors::routes())
        .nest("/api/visits", visits::routes())
        .nest("/api/notifications", notifications::routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ClinicApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health(SERVICE_NAME))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Total patients and active doctors", body = ClinicStats)
    )
)]
/// Headline counts for the dashboard; needs no token.
#[axum::debug_handler(state = AppState)]
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Envelope<ClinicStats>>> {
    Ok(Json(Envelope::data(state.clinic.stats()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_session, call, call_with, test_state, user_session};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn patient_body(name: &str, phone: &str) -> Value {
        json!({"name": name, "phone": phone})
    }

    fn has_kind(page: &Value, kind: &str) -> bool {
        page["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["type"] == kind)
    }

    async fn create_patient(app: &Router, admin: &str, body: Value) -> Value {
        let (status, body) = call(app, Method::POST, "/api/patients", Some(admin), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn test_health_and_public_endpoints() {
        let state = test_state();
        state.doctors.seed_defaults().unwrap();
        let app = router(state);

        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], SERVICE_NAME);

        let (status, body) = call(&app, Method::GET, "/api/doctors/public", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 5);
        assert!(body["data"][0].get("phone").is_none());

        let (status, body) = call(&app, Method::GET, "/api/stats", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"totalPatients": 0, "totalDoctors": 5}));

        let (status, _) = call(&app, Method::GET, "/api/doctors", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_forged_admin_header_cannot_create_doctor() {
        let app = router(test_state());
        let forged = json!({"userId": "550e8400e29b41d4a716446655440000", "role": "admin"}).to_string();
        let doctor = json!({
            "nip": "199001012015011001",
            "name": "dr. Palsu",
            "specialization": "General Practitioner",
            "phone": "0211234567",
            "email": "palsu@clinic.id",
        });

        let (status, body) = call_with(
            &app,
            Method::POST,
            "/api/doctors",
            &[("x-user-info", &forged)],
            Some(doctor),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (_, body) = call(&app, Method::GET, "/api/doctors/public", None, None).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_admin_create_sends_link_request_to_matching_account() {
        let state = test_state();
        let admin = admin_session(&state);
        let app = router(state.clone());

        // registered without going through the clinic, so the account has no patient yet
        let user = state
            .accounts
            .register(healthcure_core::RegisterUser {
                email: "budi@example.com".into(),
                phone: Some("+62 812 3456 7890".into()),
                password: "rahasia123".into(),
                name: "Budi".into(),
            })
            .unwrap();
        let user_token = state.accounts.session(&user).unwrap().token;
        let user_id = user.id.to_string();

        let body = create_patient(&app, &admin, patient_body("Budi", "081234567890")).await;
        assert_eq!(body["notificationSent"], true);
        let patient_id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["bindRequest"]["status"], "pending");

        let (status, body) = call(&app, Method::GET, "/api/notifications", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unreadCount"], 1);
        assert_eq!(body["data"][0]["type"], "link_request");

        let (_, body) = call(&app, Method::GET, "/api/patients", Some(&admin), None).await;
        assert_eq!(body["data"][0]["linkStatus"], "pending");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/patients/bind-request/approve",
            Some(&user_token),
            Some(json!({"patientId": patient_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["userId"], user_id);

        let (status, body) = call(&app, Method::GET, "/api/patients/my-data", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], patient_id);

        let (_, body) = call(&app, Method::GET, "/api/notifications", Some(&user_token), None).await;
        assert_eq!(body["unreadCount"], 1);
        assert!(has_kind(&body, "account_linked"));
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden_from_managing_records() {
        let state = test_state();
        let admin = admin_session(&state);
        let (user_token, _) = user_session(&state, "budi@example.com", "081234567890");
        let app = router(state);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/doctors",
            Some(&user_token),
            Some(json!({
                "nip": "1", "name": "dr. X", "specialization": "GP",
                "phone": "021", "email": "x@clinic.id"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, Method::POST, "/api/patients", Some(&user_token), Some(patient_body("Siti", "081111111111"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let other = create_patient(&app, &admin, patient_body("Siti", "081111111111")).await;
        let uri = format!("/api/patients/{}", other["data"]["id"].as_str().unwrap());
        let (status, _) = call(&app, Method::PUT, &uri, Some(&user_token), Some(json!({"address": "x"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, Method::DELETE, &uri, Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_visit_needs_complete_patient_and_notifies_owner() {
        let state = test_state();
        let admin = admin_session(&state);
        let (user_token, user_id) = user_session(&state, "budi@example.com", "081234567890");
        let patient_id = state
            .accounts
            .get(&user_id.parse().unwrap())
            .unwrap()
            .patient_id
            .unwrap()
            .to_string();
        let app = router(state);

        let visit = json!({"patientId": patient_id, "complaint": "Fever"});
        let (status, body) = call(&app, Method::POST, "/api/visits", Some(&admin), Some(visit.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["missingFields"],
            json!(["dateOfBirth", "gender", "address", "bloodType"])
        );

        let uri = format!("/api/patients/{patient_id}");
        let (status, _) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({
                "dateOfBirth": "1990-04-01",
                "gender": "male",
                "address": "Jl. Melati 3",
                "bloodType": "O"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::POST, "/api/visits", Some(&admin), Some(visit)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["diagnosis"], "-");
        let visit_uri = format!("/api/visits/{}", body["data"]["id"].as_str().unwrap());

        let (_, body) = call(&app, Method::GET, "/api/visits/my-visits", Some(&user_token), None).await;
        assert_eq!(body["count"], 1);

        let (status, _) = call(&app, Method::PUT, &visit_uri, Some(&admin), Some(json!({"status": "completed"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::GET, "/api/notifications", Some(&user_token), None).await;
        assert_eq!(body["unreadCount"], 2);
        assert!(has_kind(&body, "visit_created"));
        assert!(has_kind(&body, "visit_completed"));
        let first = body["data"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, Method::PUT, &format!("/api/notifications/{first}/read"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::PUT, &format!("/api/notifications/{first}/read"), Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::PUT, "/api/notifications/read-all", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, Method::GET, "/api/notifications", Some(&user_token), None).await;
        assert_eq!(body["unreadCount"], 0);
    }

    #[tokio::test]
    async fn test_check_match_and_search() {
        let state = test_state();
        let admin = admin_session(&state);
        let app = router(state);
        create_patient(&app, &admin, patient_body("Budi Santoso", "081234567890")).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/patients/check-match",
            None,
            Some(json!({"email": "budi@example.com", "phone": "+6281234567890"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "match_found");
        assert_eq!(body["matchType"], "phone");

        let (status, body) = call(&app, Method::GET, "/api/patients/search?q=santoso", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, body) = call(&app, Method::GET, "/api/patients/search", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, Method::GET, "/api/patients/not-an-id", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
