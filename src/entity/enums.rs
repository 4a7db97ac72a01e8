//! Text-backed enumerations shared by entities, DTOs and the API schema.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "donor")]
    Donor,
    #[sea_orm(string_value = "recipient")]
    Recipient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Donor => "donor",
            Role::Recipient => "recipient",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum BookCondition {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "like_new")]
    LikeNew,
    #[sea_orm(string_value = "good")]
    Good,
    #[sea_orm(string_value = "fair")]
    Fair,
    #[sea_orm(string_value = "poor")]
    Poor,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum BookCategory {
    #[sea_orm(string_value = "fiction")]
    Fiction,
    #[sea_orm(string_value = "non_fiction")]
    NonFiction,
    #[sea_orm(string_value = "academic")]
    Academic,
    #[sea_orm(string_value = "children")]
    Children,
    #[sea_orm(string_value = "comics")]
    Comics,
    #[sea_orm(string_value = "biography")]
    Biography,
    #[sea_orm(string_value = "self_help")]
    SelfHelp,
    #[sea_orm(string_value = "religion")]
    Religion,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Availability of a listed book.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "donated")]
    Donated,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Approved => "approved",
            DonationStatus::Rejected => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&BookCondition::LikeNew).unwrap(),
            "\"like_new\""
        );
        assert_eq!(
            serde_json::from_str::<BookCategory>("\"self_help\"").unwrap(),
            BookCategory::SelfHelp
        );
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }

    #[test]
    fn db_values_match_wire_values() {
        assert_eq!(Role::Recipient.to_value(), Role::Recipient.as_str());
        assert_eq!(DonationStatus::Approved.to_value(), "approved");
        assert_eq!(BookCategory::NonFiction.to_value(), "non_fiction");
    }
}
