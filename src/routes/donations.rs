use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::donations::{
        ApproveDonationRequest, CreateDonationRequest, DonationDetail, DonationList,
        RejectDonationRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::DonationListQuery,
    services::donation_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(request_book))
        .route("/incoming", get(list_incoming))
        .route("/outgoing", get(list_outgoing))
        .route("/{id}", get(get_donation).delete(cancel_donation))
        .route("/{id}/approve", post(approve_donation))
        .route("/{id}/reject", post(reject_donation))
}

#[utoipa::path(
    post,
    path = "/api/donations",
    request_body = CreateDonationRequest,
    responses(
        (status = 200, description = "Request created", body = ApiResponse<DonationDetail>),
        (status = 400, description = "Book unavailable or own book"),
        (status = 403, description = "Only recipients can request books"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Pending request already exists")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn request_book(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDonationRequest>,
) -> AppResult<Json<ApiResponse<DonationDetail>>> {
    let resp = donation_service::request_book(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/donations/incoming",
    params(DonationListQuery),
    responses(
        (status = 200, description = "Requests on the donor's books", body = ApiResponse<DonationList>),
        (status = 403, description = "Only donors")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn list_incoming(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DonationListQuery>,
) -> AppResult<Json<ApiResponse<DonationList>>> {
    let resp = donation_service::list_incoming(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/donations/outgoing",
    params(DonationListQuery),
    responses(
        (status = 200, description = "Requests made by the caller", body = ApiResponse<DonationList>)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn list_outgoing(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DonationListQuery>,
) -> AppResult<Json<ApiResponse<DonationList>>> {
    let resp = donation_service::list_outgoing(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/donations/{id}",
    params(("id" = Uuid, Path, description = "Donation request ID")),
    responses(
        (status = 200, description = "Donation request", body = ApiResponse<DonationDetail>),
        (status = 403, description = "Not involved"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn get_donation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DonationDetail>>> {
    let resp = donation_service::get_donation(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/donations/{id}/approve",
    params(("id" = Uuid, Path, description = "Donation request ID")),
    request_body = ApproveDonationRequest,
    responses(
        (status = 200, description = "Approved, book marked donated", body = ApiResponse<DonationDetail>),
        (status = 400, description = "Not pending or book unavailable"),
        (status = 403, description = "Not the book owner"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn approve_donation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveDonationRequest>,
) -> AppResult<Json<ApiResponse<DonationDetail>>> {
    let resp = donation_service::approve(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/donations/{id}/reject",
    params(("id" = Uuid, Path, description = "Donation request ID")),
    request_body = RejectDonationRequest,
    responses(
        (status = 200, description = "Rejected", body = ApiResponse<DonationDetail>),
        (status = 400, description = "Not pending"),
        (status = 403, description = "Not the book owner"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn reject_donation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectDonationRequest>,
) -> AppResult<Json<ApiResponse<DonationDetail>>> {
    let resp = donation_service::reject(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/donations/{id}",
    params(("id" = Uuid, Path, description = "Donation request ID")),
    responses(
        (status = 200, description = "Request withdrawn", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Already decided"),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Donations"
)]
pub async fn cancel_donation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = donation_service::cancel(&state, &user, id).await?;
    Ok(Json(resp))
}
