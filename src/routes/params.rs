use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{BookCategory, BookCondition, BookStatus, DonationStatus, Role};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Page number, default 1
    pub page: Option<i64>,
    /// Items per page, default 20, max 100
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Returns `(page, per_page, offset)` with defaults and bounds applied.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

// Query structs repeat `page`/`per_page` instead of flattening `Pagination`:
// serde_urlencoded cannot parse numbers through `#[serde(flatten)]`.

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive match on title or author
    pub q: Option<String>,
    pub category: Option<BookCategory>,
    pub condition: Option<BookCondition>,
    pub status: Option<BookStatus>,
    /// Owner's city, case-insensitive
    pub city: Option<String>,
    pub owner_id: Option<Uuid>,
}

impl BookQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DonationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<DonationStatus>,
}

impl DonationListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<Role>,
    pub blocked: Option<bool>,
}

impl UserListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::new(0, 1000).normalize(), (1, 100, 0));
        assert_eq!(Pagination::new(-4, 0).normalize(), (1, 1, 0));
        assert_eq!(
            Pagination::new(i64::MAX, 100).normalize(),
            (i64::MAX, 100, i64::MAX)
        );
    }

    #[test]
    fn book_query_parses_from_query_string() {
        let uri: axum::http::Uri = "/books?page=2&per_page=5&category=non_fiction&city=Lagos"
            .parse()
            .unwrap();
        let axum::extract::Query(query) =
            axum::extract::Query::<BookQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.pagination().normalize(), (2, 5, 5));
        assert_eq!(query.category, Some(BookCategory::NonFiction));
        assert_eq!(query.city.as_deref(), Some("Lagos"));
    }
}
