use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{BookCategory, UserProfile, UserReport};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BlockUserRequest {
    pub blocked: bool,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct UserStats {
    pub total: u64,
    pub donors: u64,
    pub recipients: u64,
    pub admins: u64,
    pub verified: u64,
    pub blocked: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: BookCategory,
    pub count: u64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BookStats {
    pub total: u64,
    pub available: u64,
    pub donated: u64,
    pub by_category: Vec<CategoryCount>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DonationStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: UserStats,
    pub books: BookStats,
    pub donations: DonationStats,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<UserProfile>)]
    pub items: Vec<UserProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReportList {
    #[schema(value_type = Vec<UserReport>)]
    pub items: Vec<UserReport>,
}
