use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Conversation, Message, PublicProfile};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartConversationRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub other: Option<PublicProfile>,
    pub last_message: Option<Message>,
    pub unread: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ConversationList {
    #[schema(value_type = Vec<ConversationSummary>)]
    pub items: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct MessageList {
    #[schema(value_type = Vec<Message>)]
    pub items: Vec<Message>,
}
