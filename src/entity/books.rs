use sea_orm::entity::prelude::*;

use super::enums::{BookCategory, BookCondition, BookStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub condition: BookCondition,
    pub category: BookCategory,
    pub status: BookStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
    /// Owner profile, joined for city filtering.
    #[sea_orm(
        belongs_to = "super::user_details::Entity",
        from = "Column::OwnerId",
        to = "super::user_details::Column::UserId"
    )]
    OwnerDetails,
    #[sea_orm(has_many = "super::donations::Entity")]
    Donations,
    #[sea_orm(has_many = "super::favourites::Entity")]
    Favourites,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::user_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnerDetails.def()
    }
}

impl Related<super::donations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl Related<super::favourites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favourites.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
