//! Patient endpoints under `/api/patients`, including account matching and binding.

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::extract::Caller;
use crate::state::AppState;
use api_shared::bodies::{ContactReq, LinkReq, OptionalContactReq, PatientIdReq, SearchQuery};
use api_shared::{Envelope, ErrorBody};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use healthcure_core::models::{Patient, PatientSummary};
use healthcure_core::{
    MatchType, NewPatient, PatientEntry, PatientMatch, PatientUpdate, SelfPatient, UserMatch,
};
use healthcure_uuid::RecordId;
use serde::Serialize;
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/check-match", post(check_match))
        .route("/auto-bind", post(auto_bind))
        .route("/create-from-user", post(create_from_user))
        .route("/check-user-match", post(check_user_match))
        .route("/admin/unlinked-patients", get(unlinked_patients))
        .route("/admin/link", post(link_patient))
        .route("/admin/unlink", post(unlink_patient))
        .route("/my-bind-requests", get(my_bind_requests))
        .route("/bind-request/approve", post(approve_bind_request))
        .route("/bind-request/reject", post(reject_bind_request))
        .route("/my-data", get(my_data))
        .route("/search", get(search))
        .route("/", get(list).post(create))
        .route("/:id", get(read).put(update).delete(delete))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchRes {
    pub success: bool,
    /// `match_found`, `already_linked` or `no_match`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PatientSummary>,
}

impl From<PatientMatch> for MatchRes {
    fn from(found: PatientMatch) -> Self {
        match found {
            PatientMatch::MatchFound {
                match_type,
                patient,
            } => {
                let by = match match_type {
                    MatchType::Both => "email and phone number",
                    MatchType::Phone => "phone number",
                    MatchType::Email => "email",
                };
                MatchRes {
                    success: true,
                    status: "match_found".into(),
                    match_type: Some(match_type),
                    message: format!("patient data found by {by}"),
                    data: Some(patient),
                }
            }
            PatientMatch::AlreadyLinked => MatchRes {
                success: true,
                status: "already_linked".into(),
                match_type: None,
                message: "patient data with this email or phone is linked to another account"
                    .into(),
                data: None,
            },
            PatientMatch::NoMatch => MatchRes {
                success: true,
                status: "no_match".into(),
                match_type: None,
                message: "no matching patient data, continue as a new user".into(),
                data: None,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMatchRes {
    pub success: bool,
    pub user_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserMatch>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRes {
    pub success: bool,
    pub message: String,
    pub data: Patient,
    /// True when a matching account was sent a link request.
    pub notification_sent: bool,
}

#[utoipa::path(
    post,
    path = "/api/patients/check-match",
    request_body = ContactReq,
    responses(
        (status = 200, description = "Match outcome", body = MatchRes),
        (status = 400, description = "Invalid email or phone", body = ErrorBody)
    )
)]
/// Looks for an unlinked patient record a prospective account could take over.
#[axum::debug_handler(state = AppState)]
pub async fn check_match(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContactReq>,
) -> ApiResult<Json<MatchRes>> {
    let found = state.binding.check_patient_match(&req.email, &req.phone)?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    post,
    path = "/api/patients/auto-bind",
    request_body = LinkReq,
    responses(
        (status = 200, description = "Patient bound to the account", body = Patient),
        (status = 403, description = "Cannot bind another account", body = ErrorBody),
        (status = 409, description = "Patient already linked", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn auto_bind(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<LinkReq>,
) -> ApiResult<Json<Envelope<Patient>>> {
    let patient = state.binding.auto_bind(&who, &req.patient_id, &req.user_id)?;
    Ok(Json(Envelope::data(patient).with_message("patient data linked to the account")))
}

#[utoipa::path(
    post,
    path = "/api/patients/create-from-user",
    request_body = SelfPatient,
    responses(
        (status = 201, description = "Minimal patient record linked to the caller", body = Patient),
        (status = 409, description = "Caller already has a patient, or email/phone taken", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn create_from_user(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<SelfPatient>,
) -> ApiResult<(StatusCode, Json<Envelope<Patient>>)> {
    let patient = state.patients.create_from_user(&who, req)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(patient).with_message("patient profile created")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/patients/check-user-match",
    request_body = OptionalContactReq,
    responses(
        (status = 200, description = "Account without a patient that matches", body = UserMatchRes),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn check_user_match(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<OptionalContactReq>,
) -> ApiResult<Json<UserMatchRes>> {
    let user = state
        .binding
        .check_user_match(&who, req.email.as_deref(), req.phone.as_deref())?;
    Ok(Json(UserMatchRes {
        success: true,
        user_found: user.is_some(),
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/api/patients/admin/unlinked-patients",
    responses(
        (status = 200, description = "Patients without an account", body = [Patient]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn unlinked_patients(
    State(state): State<AppState>,
    Caller(who): Caller,
) -> ApiResult<Json<Envelope<Vec<Patient>>>> {
    Ok(Json(Envelope::list(state.binding.unlinked_patients(&who)?)))
}

#[utoipa::path(
    post,
    path = "/api/patients/admin/link",
    request_body = LinkReq,
    responses(
        (status = 200, description = "Patient linked", body = Patient),
        (status = 409, description = "Patient linked to another account", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn link_patient(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<LinkReq>,
) -> ApiResult<Json<Envelope<Patient>>> {
    let patient = state
        .binding
        .link_user_to_patient(&who, &req.user_id, &req.patient_id)?;
    Ok(Json(Envelope::data(patient).with_message("patient linked to the account")))
}

#[utoipa::path(
    post,
    path = "/api/patients/admin/unlink",
    request_body = PatientIdReq,
    responses(
        (status = 200, description = "Patient unlinked", body = Patient),
        (status = 400, description = "Patient is not linked", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn unlink_patient(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<PatientIdReq>,
) -> ApiResult<Json<Envelope<Patient>>> {
    let (patient, previous) = state.binding.unlink_patient(&who, &req.patient_id)?;
    Ok(Json(
        Envelope::data(patient).with_message(format!("patient unlinked from account {previous}")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/patients/my-bind-requests",
    responses(
        (status = 200, description = "Patients waiting for the caller's approval", body = [Patient])
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn my_bind_requests(
    State(state): State<AppState>,
    Caller(who): Caller,
) -> ApiResult<Json<Envelope<Vec<Patient>>>> {
    Ok(Json(Envelope::list(state.binding.my_bind_requests(&who)?)))
}

#[utoipa::path(
    post,
    path = "/api/patients/bind-request/approve",
    request_body = PatientIdReq,
    responses(
        (status = 200, description = "Account linked to the patient", body = Patient),
        (status = 400, description = "No request for this account", body = ErrorBody),
        (status = 409, description = "Already linked", body = ErrorBody)
    )
)]
/// Accepts a link request raised when an admin created a matching patient.
#[axum::debug_handler(state = AppState)]
pub async fn approve_bind_request(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<PatientIdReq>,
) -> ApiResult<Json<Envelope<Patient>>> {
    let patient = state.binding.approve_bind_request(&who, &req.patient_id)?;
    Ok(Json(Envelope::data(patient).with_message("account linked to patient data")))
}

#[utoipa::path(
    post,
    path = "/api/patients/bind-request/reject",
    request_body = PatientIdReq,
    responses(
        (status = 200, description = "Request rejected; patient stays unlinked", body = Patient),
        (status = 400, description = "No pending request for this account", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn reject_bind_request(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<PatientIdReq>,
) -> ApiResult<Json<Envelope<Patient>>> {
    let patient = state.binding.reject_bind_request(&who, &req.patient_id)?;
    Ok(Json(Envelope::data(patient).with_message("link request rejected")))
}

#[utoipa::path(
    get,
    path = "/api/patients/my-data",
    responses(
        (status = 200, description = "The caller's patient record", body = Patient),
        (status = 404, description = "No linked patient record", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn my_data(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<Envelope<Patient>>> {
    Ok(Json(Envelope::data(state.patients.my_data(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/patients/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching patients", body = [Patient]),
        (status = 400, description = "Missing query", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn search(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Envelope<Vec<Patient>>>> {
    let found = state
        .patients
        .search(&who, query.q.as_deref().unwrap_or_default())?;
    Ok(Json(Envelope::list(found)))
}

#[utoipa::path(
    get,
    path = "/api/patients",
    responses(
        (status = 200, description = "All patients with link status (admin) or the caller's own", body = [PatientEntry])
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list(
    State(state): State<AppState>,
    Caller(who): Caller,
) -> ApiResult<Json<Envelope<Vec<PatientEntry>>>> {
    Ok(Json(Envelope::list(state.patients.list(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 403, description = "Not the caller's record", body = ErrorBody),
        (status = 404, description = "No such patient", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn read(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<Patient>>> {
    Ok(Json(Envelope::data(state.patients.get(&who, &id)?)))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = NewPatient,
    responses(
        (status = 201, description = "Patient created", body = CreatePatientRes),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 409, description = "Phone already registered", body = ErrorBody)
    )
)]
/// Admin creation of a patient record.
///
/// When the record matches an account without a patient, that account gets a link request
/// instead of being linked straight away.
#[axum::debug_handler(state = AppState)]
pub async fn create(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<CreatePatientRes>)> {
    let created = state.patients.create(&who, req)?;
    let message = match &created.notified {
        Some(user) => format!(
            "patient added; a link request was sent to {} ({})",
            user.name, user.email
        ),
        None => "patient added".to_string(),
    };
    Ok((
        StatusCode::CREATED,
        Json(CreatePatientRes {
            success: true,
            message,
            data: created.patient,
            notification_sent: created.notified.is_some(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientUpdate,
    responses(
        (status = 200, description = "Updated patient", body = Patient),
        (status = 403, description = "Not the caller's record", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn update(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(req): ApiJson<PatientUpdate>,
) -> ApiResult<Json<Envelope<Patient>>> {
    let patient = state.patients.update(&who, &id, req)?;
    Ok(Json(Envelope::data(patient).with_message("patient updated")))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient deleted"),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 404, description = "No such patient", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn delete(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<()>>> {
    state.patients.delete(&who, &id)?;
    Ok(Json(Envelope::message("patient deleted")))
}
