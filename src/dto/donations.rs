use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Book, Donation, PublicProfile};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDonationRequest {
    pub book_id: Uuid,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveDonationRequest {
    pub pickup_address: String,
    pub pickup_date: DateTime<Utc>,
    pub pickup_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectDonationRequest {
    pub reason: Option<String>,
}

/// A request with the book and both parties resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct DonationDetail {
    pub donation: Donation,
    pub book: Option<Book>,
    pub requester: Option<PublicProfile>,
    pub owner: Option<PublicProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DonationList {
    #[schema(value_type = Vec<DonationDetail>)]
    pub items: Vec<DonationDetail>,
}
