use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{BlockUserRequest, DashboardStats, ReportList, UserList},
        donations::DonationList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::UserProfile,
    response::ApiResponse,
    routes::params::{DonationListQuery, Pagination, UserListQuery},
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard_stats))
        .route("/users", get(list_users))
        .route("/users/{id}/block", patch(set_blocked))
        .route("/reports", get(list_reports))
        .route("/donations", get(list_donations))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = admin_service::dashboard_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "User accounts", body = ApiResponse<UserList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/block",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = BlockUserRequest,
    responses(
        (status = 200, description = "Block flag updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Cannot block yourself"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Admin"
)]
pub async fn set_blocked(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlockUserRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = admin_service::set_blocked(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(Pagination),
    responses(
        (status = 200, description = "User reports, newest first", body = ApiResponse<ReportList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Admin"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ReportList>>> {
    let resp = admin_service::list_reports(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/donations",
    params(DonationListQuery),
    responses(
        (status = 200, description = "All donation requests", body = ApiResponse<DonationList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Admin"
)]
pub async fn list_donations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DonationListQuery>,
) -> AppResult<Json<ApiResponse<DonationList>>> {
    let resp = admin_service::list_donations(&state, &user, query).await?;
    Ok(Json(resp))
}
