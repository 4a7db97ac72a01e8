use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::chat::{
        ConversationList, ConversationSummary, MessageList, SendMessageRequest,
        StartConversationRequest,
    },
    entity::{
        Conversations, Messages, Users,
        conversations::{self, ActiveModel as ConversationActive, Model as ConversationModel},
        messages::{self, ActiveModel as MessageActive},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Conversation, Message},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::user_service::load_public_profiles,
    state::AppState,
};

const MAX_MESSAGE_CHARS: usize = 2000;

/// Conversations store their participants in ascending order.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

fn other_participant(conversation: &ConversationModel, me: Uuid) -> Uuid {
    if conversation.user_a == me {
        conversation.user_b
    } else {
        conversation.user_a
    }
}

fn validate_body(body: &str) -> AppResult<String> {
    let body = body.trim();
    let chars = body.chars().count();
    if chars == 0 || chars > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message must be between 1 and {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(body.to_string())
}

async fn find_pair(orm: &OrmConn, a: Uuid, b: Uuid) -> AppResult<Option<ConversationModel>> {
    let (user_a, user_b) = ordered_pair(a, b);
    Ok(Conversations::find()
        .filter(conversations::Column::UserA.eq(user_a))
        .filter(conversations::Column::UserB.eq(user_b))
        .one(orm)
        .await?)
}

/// Load a conversation the caller takes part in.
async fn participant_conversation(
    orm: &OrmConn,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ConversationModel> {
    let conversation = Conversations::find_by_id(id)
        .one(orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if conversation.user_a != user.user_id && conversation.user_b != user.user_id {
        return Err(AppError::Forbidden("Not a participant of this conversation".into()));
    }
    Ok(conversation)
}

pub async fn start_conversation(
    state: &AppState,
    user: &AuthUser,
    payload: StartConversationRequest,
) -> AppResult<ApiResponse<Conversation>> {
    if payload.participant_id == user.user_id {
        return Err(AppError::BadRequest("You cannot message yourself".into()));
    }
    let participant = Users::find_by_id(payload.participant_id)
        .one(&state.orm)
        .await?;
    if participant.is_none() {
        return Err(AppError::NotFound);
    }

    if let Some(existing) = find_pair(&state.orm, user.user_id, payload.participant_id).await? {
        return Ok(ApiResponse::success("Conversation", existing.into(), Some(Meta::empty())));
    }

    let (user_a, user_b) = ordered_pair(user.user_id, payload.participant_id);
    let inserted = ConversationActive {
        id: Set(Uuid::new_v4()),
        user_a: Set(user_a),
        user_b: Set(user_b),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    let conversation = match inserted {
        Ok(conversation) => conversation,
        // Lost a race with the other participant; their row wins.
        Err(err) => find_pair(&state.orm, user_a, user_b)
            .await?
            .ok_or(AppError::OrmError(err))?,
    };

    audit::record(
        &state.pool,
        user.user_id,
        "conversation_start",
        "conversations",
        serde_json::json!({ "conversation_id": conversation.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Conversation started",
        conversation.into(),
        Some(Meta::empty()),
    ))
}

pub async fn list_conversations(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ConversationList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Conversations::find()
        .filter(
            Condition::any()
                .add(conversations::Column::UserA.eq(user.user_id))
                .add(conversations::Column::UserB.eq(user.user_id)),
        )
        .order_by_desc(conversations::Column::UpdatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let profiles = load_public_profiles(
        &state.orm,
        rows.iter().map(|c| other_participant(c, user.user_id)),
    )
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for conversation in rows {
        let last_message = Messages::find()
            .filter(messages::Column::ConversationId.eq(conversation.id))
            .order_by_desc(messages::Column::CreatedAt)
            .one(&state.orm)
            .await?
            .map(Message::from);
        let unread = Messages::find()
            .filter(messages::Column::ConversationId.eq(conversation.id))
            .filter(messages::Column::SenderId.ne(user.user_id))
            .filter(messages::Column::IsRead.eq(false))
            .count(&state.orm)
            .await?;
        let other = profiles
            .get(&other_participant(&conversation, user.user_id))
            .cloned();
        items.push(ConversationSummary {
            conversation: conversation.into(),
            other,
            last_message,
            unread,
        });
    }

    Ok(ApiResponse::success(
        "Conversations",
        ConversationList { items },
        Some(Meta::paged(page, limit, total)),
    ))
}

/// Oldest first. Reading marks the other participant's messages as read.
pub async fn list_messages(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<MessageList>> {
    let conversation = participant_conversation(&state.orm, user, id).await?;
    let (page, limit, offset) = pagination.normalize();

    Messages::update_many()
        .col_expr(messages::Column::IsRead, Expr::value(true))
        .filter(messages::Column::ConversationId.eq(conversation.id))
        .filter(messages::Column::SenderId.ne(user.user_id))
        .filter(messages::Column::IsRead.eq(false))
        .exec(&state.orm)
        .await?;

    let finder = Messages::find()
        .filter(messages::Column::ConversationId.eq(conversation.id))
        .order_by_asc(messages::Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    Ok(ApiResponse::success(
        "Messages",
        MessageList { items },
        Some(Meta::paged(page, limit, total)),
    ))
}

pub async fn send_message(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SendMessageRequest,
) -> AppResult<ApiResponse<Message>> {
    let body = validate_body(&payload.body)?;
    let conversation = participant_conversation(&state.orm, user, id).await?;

    let txn = state.orm.begin().await?;
    let message = MessageActive {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conversation.id),
        sender_id: Set(user.user_id),
        body: Set(body),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut active: ConversationActive = conversation.into();
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    txn.commit().await?;

    tracing::debug!(conversation_id = %id, sender = %user.user_id, "message sent");

    Ok(ApiResponse::success(
        "Message sent",
        Message::from(message),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_order_is_stable() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
        let (low, high) = ordered_pair(a, b);
        assert!(low <= high);
    }

    #[test]
    fn message_length_is_bounded() {
        assert!(validate_body("   ").is_err());
        assert_eq!(validate_body(" hello ").unwrap(), "hello");
        assert!(validate_body(&"x".repeat(MAX_MESSAGE_CHARS)).is_ok());
        assert!(validate_body(&"x".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }
}
