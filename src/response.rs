//! JSON envelope shared by every endpoint, errors included:
//! `{ "message": .., "data": .., "meta": .. }`.

use serde::Serialize;
use utoipa::ToSchema;

/// Paging information for list endpoints; all fields are null elsewhere.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct Meta {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub total: Option<u64>,
}

impl Meta {
    /// `page` and `per_page` come from [`Pagination::normalize`](crate::routes::params::Pagination::normalize),
    /// so they are already at least 1.
    pub fn paged(page: i64, per_page: i64, total: u64) -> Self {
        Self {
            page: Some(page.unsigned_abs()),
            per_page: Some(per_page.unsigned_abs()),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// For operations that only report an outcome; `data` is an empty object.
    pub fn done(message: impl Into<String>) -> Self {
        Self::success(message, serde_json::json!({}), Some(Meta::empty()))
    }
}
