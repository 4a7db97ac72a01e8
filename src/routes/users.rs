use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::users::{ContactUserRequest, ReportOutcome, ReportUserRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{PublicProfile, UserProfile},
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/{id}", get(get_user))
        .route("/{id}/report", post(report_user))
        .route("/{id}/contact", post(contact_user))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Own profile", body = ApiResponse<UserProfile>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::get_me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::update_me(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = ApiResponse<PublicProfile>),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PublicProfile>>> {
    let resp = user_service::get_public_profile(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/report",
    params(("id" = Uuid, Path, description = "Reported user ID")),
    request_body = ReportUserRequest,
    responses(
        (status = 200, description = "Report recorded", body = ApiResponse<ReportOutcome>),
        (status = 400, description = "Cannot report yourself"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already reported")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Users"
)]
pub async fn report_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportUserRequest>,
) -> AppResult<Json<ApiResponse<ReportOutcome>>> {
    let resp = user_service::report_user(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/contact",
    params(("id" = Uuid, Path, description = "Recipient user ID")),
    request_body = ContactUserRequest,
    responses(
        (status = 200, description = "Email sent", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "User not found"),
        (status = 502, description = "Mail delivery failed")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Users"
)]
pub async fn contact_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactUserRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::contact_user(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
