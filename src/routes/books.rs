use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::books::{BookDetail, BookList, CreateBookRequest, UpdateBookRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Book,
    response::ApiResponse,
    routes::params::BookQuery,
    services::book_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
}

#[utoipa::path(
    get,
    path = "/api/books",
    params(BookQuery),
    responses(
        (status = 200, description = "Books visible to the caller", body = ApiResponse<BookList>)
    ),
    tag = "Books"
)]
pub async fn list_books(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<ApiResponse<BookList>>> {
    let resp = book_service::list_books(&state, user.as_ref(), query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book with owner", body = ApiResponse<BookDetail>),
        (status = 404, description = "Book not found")
    ),
    tag = "Books"
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookDetail>>> {
    let resp = book_service::get_book(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    responses(
        (status = 200, description = "Book listed", body = ApiResponse<Book>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Only donors can list books")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Books"
)]
pub async fn create_book(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBookRequest>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::create_book(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = ApiResponse<Book>),
        (status = 400, description = "Book already donated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Books"
)]
pub async fn update_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookRequest>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::update_book(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Book was already donated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Books"
)]
pub async fn delete_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = book_service::delete_book(&state, &user, id).await?;
    Ok(Json(resp))
}
