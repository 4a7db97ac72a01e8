use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::entity::enums::{BookCategory, BookCondition, BookStatus, DonationStatus, Role};
use crate::entity::{
    books, conversations, donations, favourites, messages, user_details, user_reports, users,
};

/// Account plus profile as returned to the account owner and admins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub report_count: i32,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_parts(user: users::Model, details: user_details::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: details.name,
            city: details.city,
            address: details.address,
            photo: details.photo,
            role: details.role,
            is_verified: user.is_verified,
            is_blocked: user.is_blocked,
            report_count: user.report_count,
            created_at: user.created_at.with_timezone(&Utc),
        }
    }
}

/// What other users may see about someone.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub photo: Option<String>,
    pub role: Role,
}

impl From<user_details::Model> for PublicProfile {
    fn from(details: user_details::Model) -> Self {
        Self {
            id: details.user_id,
            name: details.name,
            city: details.city,
            photo: details.photo,
            role: details.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub condition: BookCondition,
    pub category: BookCategory,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<books::Model> for Book {
    fn from(model: books::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            author: model.author,
            description: model.description,
            image: model.image,
            condition: model.condition,
            category: model.category,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Donation {
    pub id: Uuid,
    pub book_id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub status: DonationStatus,
    pub message: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_date: Option<DateTime<Utc>>,
    pub pickup_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<donations::Model> for Donation {
    fn from(model: donations::Model) -> Self {
        Self {
            id: model.id,
            book_id: model.book_id,
            requester_id: model.requester_id,
            owner_id: model.owner_id,
            status: model.status,
            message: model.message,
            pickup_address: model.pickup_address,
            pickup_date: model.pickup_date.map(|dt| dt.with_timezone(&Utc)),
            pickup_notes: model.pickup_notes,
            rejection_reason: model.rejection_reason,
            decided_at: model.decided_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Favourite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<favourites::Model> for Favourite {
    fn from(model: favourites::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            book_id: model.book_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<user_reports::Model> for UserReport {
    fn from(model: user_reports::Model) -> Self {
        Self {
            id: model.id,
            reporter_id: model.reporter_id,
            reported_id: model.reported_id,
            reason: model.reason,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<conversations::Model> for Conversation {
    fn from(model: conversations::Model) -> Self {
        Self {
            id: model.id,
            participants: vec![model.user_a, model.user_b],
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<messages::Model> for Message {
    fn from(model: messages::Model) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            body: model.body,
            is_read: model.is_read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
