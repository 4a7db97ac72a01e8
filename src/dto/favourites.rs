use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Book;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddFavouriteRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FavouriteBookList {
    #[schema(value_type = Vec<Book>)]
    pub items: Vec<Book>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveFavouriteResponse {
    pub removed: bool,
}
