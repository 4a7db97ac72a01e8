pub mod admin;
pub mod auth;
pub mod books;
pub mod chat;
pub mod contact;
pub mod donations;
pub mod favourites;
pub mod users;
