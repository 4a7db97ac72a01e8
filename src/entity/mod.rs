pub mod books;
pub mod conversations;
pub mod donations;
pub mod enums;
pub mod favourites;
pub mod messages;
pub mod user_details;
pub mod user_reports;
pub mod users;

pub use books::Entity as Books;
pub use conversations::Entity as Conversations;
pub use donations::Entity as Donations;
pub use favourites::Entity as Favourites;
pub use messages::Entity as Messages;
pub use user_details::Entity as UserDetails;
pub use user_reports::Entity as UserReports;
pub use users::Entity as Users;
