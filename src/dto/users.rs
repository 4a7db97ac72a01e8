use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportUserRequest {
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportOutcome {
    pub report_count: i32,
    pub is_blocked: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactUserRequest {
    pub subject: String,
    pub message: String,
}
