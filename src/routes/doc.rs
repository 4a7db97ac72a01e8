use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            BlockUserRequest, BookStats, CategoryCount, DashboardStats, DonationStats, ReportList,
            UserList, UserStats,
        },
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
            SignupRequest,
        },
        books::{BookDetail, BookList, CreateBookRequest, UpdateBookRequest},
        chat::{
            ConversationList, ConversationSummary, MessageList, SendMessageRequest,
            StartConversationRequest,
        },
        contact::ContactRequest,
        donations::{
            ApproveDonationRequest, CreateDonationRequest, DonationDetail, DonationList,
            RejectDonationRequest,
        },
        favourites::{AddFavouriteRequest, FavouriteBookList, RemoveFavouriteResponse},
        users::{ContactUserRequest, ReportOutcome, ReportUserRequest, UpdateProfileRequest},
    },
    middleware::auth::TOKEN_COOKIE,
    models::{
        Book, BookCategory, BookCondition, BookStatus, Conversation, Donation, DonationStatus,
        Favourite, Message, PublicProfile, Role, UserProfile, UserReport,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, books, chat, contact, donations, favourites, health, params, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "cookie_auth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                TOKEN_COOKIE,
                "Session cookie set by POST /api/auth/login.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Donation API",
        description = "Donors list books, recipients request them, donors decide."
    ),
    paths(
        health::health_check,
        auth::signup,
        auth::verify,
        auth::login,
        auth::logout,
        auth::forgot_password,
        auth::reset_password,
        auth::me,
        users::get_me,
        users::update_me,
        users::get_user,
        users::report_user,
        users::contact_user,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        donations::request_book,
        donations::list_incoming,
        donations::list_outgoing,
        donations::get_donation,
        donations::approve_donation,
        donations::reject_donation,
        donations::cancel_donation,
        favourites::list_favourites,
        favourites::add_favourite,
        favourites::remove_favourite,
        chat::start_conversation,
        chat::list_conversations,
        chat::list_messages,
        chat::send_message,
        contact::contact,
        admin::dashboard_stats,
        admin::list_users,
        admin::set_blocked,
        admin::list_reports,
        admin::list_donations
    ),
    components(
        schemas(
            Role,
            BookCondition,
            BookCategory,
            BookStatus,
            DonationStatus,
            UserProfile,
            PublicProfile,
            Book,
            Donation,
            Favourite,
            UserReport,
            Conversation,
            Message,
            SignupRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdateProfileRequest,
            ReportUserRequest,
            ReportOutcome,
            ContactUserRequest,
            CreateBookRequest,
            UpdateBookRequest,
            BookDetail,
            BookList,
            CreateDonationRequest,
            ApproveDonationRequest,
            RejectDonationRequest,
            DonationDetail,
            DonationList,
            AddFavouriteRequest,
            FavouriteBookList,
            RemoveFavouriteResponse,
            StartConversationRequest,
            SendMessageRequest,
            ConversationSummary,
            ConversationList,
            MessageList,
            ContactRequest,
            BlockUserRequest,
            UserStats,
            CategoryCount,
            BookStats,
            DonationStats,
            DashboardStats,
            UserList,
            ReportList,
            params::Pagination,
            params::BookQuery,
            params::DonationListQuery,
            params::UserListQuery,
            Meta,
            ApiResponse<UserProfile>,
            ApiResponse<BookDetail>,
            ApiResponse<BookList>,
            ApiResponse<DonationDetail>,
            ApiResponse<DonationList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup, email verification, login and password reset"),
        (name = "Users", description = "Profiles, reporting and donor messaging"),
        (name = "Books", description = "Book listings"),
        (name = "Donations", description = "Donation requests and decisions"),
        (name = "Favourites", description = "Saved books"),
        (name = "Chat", description = "Direct conversations between users"),
        (name = "Contact", description = "Contact form"),
        (name = "Admin", description = "Admin dashboard endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
