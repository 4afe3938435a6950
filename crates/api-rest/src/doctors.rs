//! Doctor endpoints under `/api/doctors`.

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::extract::Caller;
use crate::state::AppState;
use api_shared::bodies::SearchQuery;
use api_shared::{Envelope, ErrorBody};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use healthcure_core::models::{Doctor, PublicDoctor};
use healthcure_core::{DoctorUpdate, NewDoctor};
use healthcure_uuid::RecordId;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public", get(public_list))
        .route("/search", get(search))
        .route("/", get(list).post(create))
        .route("/:id", get(read).put(update).delete(delete))
}

#[utoipa::path(
    get,
    path = "/api/doctors/public",
    responses(
        (status = 200, description = "Active doctors without contact details", body = [PublicDoctor])
    )
)]
/// Public roster for the landing page; needs no token.
#[axum::debug_handler(state = AppState)]
pub async fn public_list(State(state): State<AppState>) -> ApiResult<Json<Envelope<Vec<PublicDoctor>>>> {
    Ok(Json(Envelope::list(state.doctors.public_list()?)))
}

#[utoipa::path(
    get,
    path = "/api/doctors",
    responses(
        (status = 200, description = "Active doctors", body = [Doctor])
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<Envelope<Vec<Doctor>>>> {
    Ok(Json(Envelope::list(state.doctors.list(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/doctors/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Active doctors matching name, specialization or NIP", body = [Doctor]),
        (status = 400, description = "Missing query", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn search(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Envelope<Vec<Doctor>>>> {
    let found = state
        .doctors
        .search(&who, query.q.as_deref().unwrap_or_default())?;
    Ok(Json(Envelope::list(found)))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor", body = Doctor),
        (status = 404, description = "No such doctor", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn read(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<Doctor>>> {
    Ok(Json(Envelope::data(state.doctors.get(&who, &id)?)))
}

#[utoipa::path(
    post,
    path = "/api/doctors",
    request_body = NewDoctor,
    responses(
        (status = 201, description = "Doctor created", body = Doctor),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 409, description = "NIP already registered", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn create(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<NewDoctor>,
) -> ApiResult<(StatusCode, Json<Envelope<Doctor>>)> {
    let doctor = state.doctors.create(&who, req)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(doctor).with_message("doctor added")),
    ))
}

#[utoipa::path(
    put,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    request_body = DoctorUpdate,
    responses(
        (status = 200, description = "Updated doctor", body = Doctor),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn update(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(req): ApiJson<DoctorUpdate>,
) -> ApiResult<Json<Envelope<Doctor>>> {
    let doctor = state.doctors.update(&who, &id, req)?;
    Ok(Json(Envelope::data(doctor).with_message("doctor updated")))
}

#[utoipa::path(
    delete,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor deleted"),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn delete(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<()>>> {
    state.doctors.delete(&who, &id)?;
    Ok(Json(Envelope::message("doctor deleted")))
}
