//! Notification endpoints under `/api/notifications`.

use crate::error::{ApiPath, ApiResult};
use crate::extract::Caller;
use crate::state::AppState;
use api_shared::{Envelope, ErrorBody};
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use healthcure_core::models::Notification;
use healthcure_uuid::RecordId;
use serde::Serialize;
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsRes {
    pub success: bool,
    pub unread_count: usize,
    pub data: Vec<Notification>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Latest notifications and the unread count", body = NotificationsRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn list(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<NotificationsRes>> {
    let page = state.notifications.list(&who)?;
    Ok(Json(NotificationsRes {
        success: true,
        unread_count: page.unread_count,
        data: page.notifications,
    }))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Not found among the caller's notifications", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn mark_read(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<Notification>>> {
    Ok(Json(Envelope::data(state.notifications.mark_read(&who, &id)?)))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Every notification of the caller marked read")
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn mark_all_read(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<Envelope<()>>> {
    let marked = state.notifications.mark_all_read(&who)?;
    Ok(Json(Envelope::message(format!("{marked} notifications marked read"))))
}
