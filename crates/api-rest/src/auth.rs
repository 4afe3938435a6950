//! Auth service endpoints under `/api/auth`.

use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::extract::{BearerClaims, Caller};
use crate::state::AppState;
use api_shared::bodies::{ContactReq, LoginReq, RejectUserReq, UserIdReq};
use api_shared::{Envelope, ErrorBody, HealthRes, HealthService};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use healthcure_core::models::UserView;
use healthcure_core::{Claims, EmailCheck, RegisterUser, Registered, Session, UserUpdate};
use healthcure_uuid::RecordId;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub const SERVICE_NAME: &str = "auth-service";

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        check_email_phone,
        register,
        login,
        me,
        verify,
        list_users,
        unverified_users,
        verified_users,
        verify_user,
        reject_user,
        update_user,
        delete_user,
    ),
    components(schemas(
        HealthRes,
        ErrorBody,
        ContactReq,
        LoginReq,
        UserIdReq,
        RejectUserReq,
        RegisterUser,
        UserUpdate,
        UserView,
        Session,
        Registered,
        Claims,
        CheckEmailPhoneRes,
        VerifyRes,
    ))
)]
pub struct AuthApiDoc;

/// Router of the auth service, with OpenAPI docs at `/swagger-ui`.
///
/// Protected routes resolve the caller with [`Caller`](crate::extract::Caller): a bearer token,
/// or `x-user-info` only when the service is configured to trust the gateway.
///
/// # Returns
/// A `Router` with CORS and request tracing applied, ready for `axum::serve`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/check-email-phone", post(check_email_phone))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/verify", get(verify))
        .route("/api/auth/users", get(list_users))
        .route("/api/auth/users/unverified", get(unverified_users))
        .route("/api/auth/users/verified", get(verified_users))
        .route("/api/auth/users/verify", post(verify_user))
        .route("/api/auth/users/reject", post(reject_user))
        .route("/api/auth/users/:id", put(update_user).delete(delete_user))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", AuthApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckEmailPhoneRes {
    pub success: bool,
    /// `available` or `email_exists`.
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyRes {
    pub success: bool,
    pub valid: bool,
    pub user: Claims,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health(SERVICE_NAME))
}

#[utoipa::path(
    post,
    path = "/api/auth/check-email-phone",
    request_body = ContactReq,
    responses(
        (status = 200, description = "Email is free", body = CheckEmailPhoneRes),
        (status = 400, description = "Email already registered or invalid input", body = CheckEmailPhoneRes)
    )
)]
/// Pre-registration check that the email is not taken yet.
#[axum::debug_handler(state = AppState)]
async fn check_email_phone(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContactReq>,
) -> ApiResult<Response> {
    let res = match state.accounts.check_email_phone(&req.email, &req.phone)? {
        EmailCheck::Available => (
            StatusCode::OK,
            Json(CheckEmailPhoneRes {
                success: true,
                status: "available".into(),
                message: "email is available for registration".into(),
            }),
        ),
        EmailCheck::EmailExists => (
            StatusCode::BAD_REQUEST,
            Json(CheckEmailPhoneRes {
                success: false,
                status: "email_exists".into(),
                message: "email is already registered, please log in".into(),
            }),
        ),
    };
    Ok(res.into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created and linked to a patient record; wrapped in the success envelope", body = Registered),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Email taken or matching patient already linked", body = ErrorBody)
    )
)]
/// Self-registration.
///
/// Creates the account, then claims the unlinked patient record with the same phone number or
/// creates a fresh one. The account is removed again if the patient step fails.
#[axum::debug_handler(state = AppState)]
async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterUser>,
) -> ApiResult<(StatusCode, Json<Envelope<Registered>>)> {
    let registered = state.registration.register(req)?;
    let message = match registered.patient.status {
        healthcure_core::LinkOutcome::Bound => "account created and linked to existing patient data",
        healthcure_core::LinkOutcome::Created => "registration successful",
    };
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(registered).with_message(message)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Session; wrapped in the success envelope", body = Session),
        (status = 401, description = "Wrong email or password", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginReq>,
) -> ApiResult<Json<Envelope<Session>>> {
    let session = state.accounts.login(&req.email, &req.password)?;
    Ok(Json(Envelope::data(session).with_message("login successful")))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The caller's account", body = UserView),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn me(State(state): State<AppState>, Caller(who): Caller) -> ApiResult<Json<Envelope<UserView>>> {
    Ok(Json(Envelope::data(state.accounts.me(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyRes),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody)
    )
)]
/// Checks the bearer token and echoes its claims.
#[axum::debug_handler(state = AppState)]
async fn verify(BearerClaims(claims): BearerClaims) -> Json<VerifyRes> {
    Json(VerifyRes {
        success: true,
        valid: true,
        user: claims,
    })
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    responses(
        (status = 200, description = "All accounts, newest first", body = [UserView]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn list_users(
    State(state): State<AppState>,
    Caller(who): Caller,
) -> ApiResult<Json<Envelope<Vec<UserView>>>> {
    Ok(Json(Envelope::list(state.accounts.list_users(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/auth/users/unverified",
    responses(
        (status = 200, description = "Accounts awaiting verification", body = [UserView]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn unverified_users(
    State(state): State<AppState>,
    Caller(who): Caller,
) -> ApiResult<Json<Envelope<Vec<UserView>>>> {
    Ok(Json(Envelope::list(state.accounts.unverified_users(&who)?)))
}

#[utoipa::path(
    get,
    path = "/api/auth/users/verified",
    responses(
        (status = 200, description = "Verified accounts", body = [UserView]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn verified_users(
    State(state): State<AppState>,
    Caller(who): Caller,
) -> ApiResult<Json<Envelope<Vec<UserView>>>> {
    Ok(Json(Envelope::list(state.accounts.verified_users(&who)?)))
}

#[utoipa::path(
    post,
    path = "/api/auth/users/verify",
    request_body = UserIdReq,
    responses(
        (status = 200, description = "Account verified", body = UserView),
        (status = 404, description = "No such account", body = ErrorBody),
        (status = 409, description = "Already verified", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn verify_user(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<UserIdReq>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let user = state.accounts.verify_user(&who, &req.user_id)?;
    Ok(Json(Envelope::data(user).with_message("user verified")))
}

#[utoipa::path(
    post,
    path = "/api/auth/users/reject",
    request_body = RejectUserReq,
    responses(
        (status = 200, description = "Verification revoked", body = UserView),
        (status = 404, description = "No such account", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn reject_user(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiJson(req): ApiJson<RejectUserReq>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let user = state.accounts.reject_user(&who, &req.user_id, req.reason)?;
    Ok(Json(Envelope::data(user).with_message("user verification rejected")))
}

#[utoipa::path(
    put,
    path = "/api/auth/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated account", body = UserView),
        (status = 403, description = "Not allowed to change this account or field", body = ErrorBody),
        (status = 409, description = "Email, phone or patient already taken", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn update_user(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(req): ApiJson<UserUpdate>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let user = state.registration.update_user(&who, &id, req)?;
    Ok(Json(Envelope::data(user).with_message("user updated")))
}

#[utoipa::path(
    delete,
    path = "/api/auth/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted and its patient link cleared"),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 404, description = "No such account", body = ErrorBody)
    )
)]
#[axum::debug_handler(state = AppState)]
async fn delete_user(
    State(state): State<AppState>,
    Caller(who): Caller,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Envelope<()>>> {
    state.registration.unregister(&who, &id)?;
    Ok(Json(Envelope::message("user deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_session, call, call_with, gateway_trusting_state, register, test_state};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_health_names_service() {
        let app = router(test_state());
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "OK", "service": "auth-service"}));
    }

    #[tokio::test]
    async fn test_register_then_login_and_me() {
        let state = test_state();
        let app = router(state);

        let (status, body) = register(&app, "budi@example.com", "+6281234567890").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["phone"], "081234567890");
        assert_eq!(body["data"]["patient"]["status"], "created");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "BUDI@example.com", "password": "rahasia123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "budi@example.com");

        let (status, body) = call(&app, Method::GET, "/api/auth/verify", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["user"]["role"], "user");
    }

    #[tokio::test]
    async fn test_login_failure_is_401_json() {
        let app = router(test_state());
        register(&app, "budi@example.com", "081234567890").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "budi@example.com", "password": "wrong-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_check_email_phone() {
        let app = router(test_state());
        let req = json!({"email": "budi@example.com", "phone": "081234567890"});

        let (status, body) = call(&app, Method::POST, "/api/auth/check-email-phone", None, Some(req.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "available");

        register(&app, "budi@example.com", "081234567890").await;
        let (status, body) = call(&app, Method::POST, "/api/auth/check-email-phone", None, Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "email_exists");
    }

    #[tokio::test]
    async fn test_user_admin_endpoints_need_admin() {
        let state = test_state();
        let app = router(state.clone());
        let (_, body) = register(&app, "budi@example.com", "081234567890").await;
        let user_token = body["data"]["token"].as_str().unwrap().to_string();
        let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, Method::GET, "/api/auth/users", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = admin_session(&state);
        let (status, body) = call(&app, Method::GET, "/api/auth/users/unverified", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let verify = json!({"userId": user_id});
        let (status, body) = call(&app, Method::POST, "/api/auth/users/verify", Some(&admin), Some(verify.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isVerified"], true);

        let (status, _) = call(&app, Method::POST, "/api/auth/users/verify", Some(&admin), Some(verify)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, Method::GET, "/api/auth/users/verified", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_user_cannot_promote_themselves() {
        let app = router(test_state());
        let (_, body) = register(&app, "budi@example.com", "081234567890").await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let uri = format!("/api/auth/users/{}", body["data"]["user"]["id"].as_str().unwrap());

        let (status, _) = call(&app, Method::PUT, &uri, Some(&token), Some(json!({"role": "admin"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, Method::PUT, &uri, Some(&token), Some(json!({"name": "Budi S."}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Budi S.");
    }

    #[tokio::test]
    async fn test_forwarded_identity_header() {
        let state = gateway_trusting_state();
        let app = router(state.clone());
        let (_, body) = register(&app, "budi@example.com", "081234567890").await;
        let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let info = json!({"userId": user_id, "role": "user"}).to_string();

        let (status, body) = call_with(&app, Method::GET, "/api/auth/me", &[("x-user-info", &info)], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], user_id);

        let (status, _) = call(&app, Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_identity_header_ignored_by_default() {
        let state = test_state();
        let app = router(state.clone());
        let (_, body) = register(&app, "budi@example.com", "081234567890").await;
        let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let info = json!({"userId": user_id, "role": "user"}).to_string();

        let (status, body) = call_with(&app, Method::GET, "/api/auth/me", &[("x-user-info", &info)], None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "no token provided");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_400() {
        let app = router(test_state());
        let (status, body) = call(&app, Method::POST, "/api/auth/login", None, Some(json!({"email": 5}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
