use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::chat::{ConversationList, MessageList, SendMessageRequest, StartConversationRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Conversation, Message},
    response::ApiResponse,
    routes::params::Pagination,
    services::chat_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(start_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
}

#[utoipa::path(
    post,
    path = "/api/chat/conversations",
    request_body = StartConversationRequest,
    responses(
        (status = 200, description = "Existing or new conversation", body = ApiResponse<Conversation>),
        (status = 400, description = "Cannot message yourself"),
        (status = 404, description = "Participant not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Chat"
)]
pub async fn start_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<StartConversationRequest>,
) -> AppResult<Json<ApiResponse<Conversation>>> {
    let resp = chat_service::start_conversation(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/chat/conversations",
    params(Pagination),
    responses(
        (status = 200, description = "Conversations, most recent first", body = ApiResponse<ConversationList>)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Chat"
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ConversationList>>> {
    let resp = chat_service::list_conversations(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/chat/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation ID"), Pagination),
    responses(
        (status = 200, description = "Messages, oldest first", body = ApiResponse<MessageList>),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Chat"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<MessageList>>> {
    let resp = chat_service::list_messages(&state, &user, id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = ApiResponse<Message>),
        (status = 400, description = "Empty or too long"),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let resp = chat_service::send_message(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
