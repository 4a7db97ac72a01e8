use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::contact::ContactRequest, error::AppResult, response::ApiResponse,
    services::contact_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(contact))
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Forwarded to the administrator", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid input"),
        (status = 502, description = "Mail delivery failed")
    ),
    tag = "Contact"
)]
pub async fn contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = contact_service::submit(&state, payload).await?;
    Ok(Json(resp))
}
