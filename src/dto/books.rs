use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Book, BookCategory, BookCondition, PublicProfile};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub condition: BookCondition,
    pub category: BookCategory,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub condition: Option<BookCondition>,
    pub category: Option<BookCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
    pub owner: Option<PublicProfile>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct BookList {
    #[schema(value_type = Vec<Book>)]
    pub items: Vec<Book>,
}
