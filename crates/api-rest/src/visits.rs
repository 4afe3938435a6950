//! Visit endpoints under `/api/visits`.

use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::extract::Caller;
use crate::state::AppState;
use api_shared::{Envelope, ErrorBody};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use healthcure_core::models::Visit;
use healthcure_core::{NewVisit, VisitUpdate};
use healthcure_uuid::RecordId;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/my-visits", get(my_visits))
        .route("/patient/:patient_id", get(by_patient))
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(delete))
}

#[utoipa::path(
    get,
    path = "/api/visits/my-visits",
    responses(
        (status = 200, description = "Visits of the caller's patient record; empty when unlinked", body = [Visit])
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn my_visits(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<Envelope<Vec<Visit>>>> {
    Ok(Json(Envelope::list(state.visits.my_visits(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/visits/patient/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Visits of one patient", body = [Visit]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn by_patient(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(patient_id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<Vec<Visit>>>> {
    Ok(Json(Envelope::list(state.visits.by_patient(&who, &patient_id)?)))
}

#[utoipa::path(
    get,
    path = "/api/visits",
    responses(
        (status = 200, description = "All visits, latest visit date first", body = [Visit]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<Envelope<Vec<Visit>>>> {
    Ok(Json(Envelope::list(state.visits.list(&who)?)))
}

#[utoipa::path(
    post,
    path = "/api/visits",
    request_body = NewVisit,
    responses(
        (status = 201, description = "Visit recorded; the linked account is notified", body = Visit),
        (status = 400, description = "Patient record incomplete; lists `missingFields`", body = ErrorBody),
        (status = 404, description = "Patient or doctor not found", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn create(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<NewVisit>,
) -> ApiResult<(StatusCode, Json<Envelope<Visit>>)> {
    let visit = state.visits.create(&who, req)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(visit).with_message("visit recorded")),
    ))
}

#[utoipa::path(
    put,
    path = "/api/visits/{id}",
    params(("id" = String, Path, description = "Visit id")),
    request_body = VisitUpdate,
    responses(
        (status = 200, description = "Updated visit", body = Visit),
        (status = 404, description = "No such visit", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn update(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(req): ApiJson<VisitUpdate>,
) -> ApiResult<Json<Envelope<Visit>>> {
    let visit = state.visits.update(&who, &id, req)?;
    Ok(Json(Envelope::data(visit).with_message("visit updated")))
}

#[utoipa::path(
    delete,
    path = "/api/visits/{id}",
    params(("id" = String, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit deleted"),
        (status = 404, description = "No such visit", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn delete(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<()>>> {
    state.visits.delete(&who, &id)?;
    Ok(Json(Envelope::message("visit deleted")))
}
