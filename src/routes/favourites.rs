use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::favourites::{AddFavouriteRequest, FavouriteBookList, RemoveFavouriteResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Favourite,
    response::ApiResponse,
    routes::params::Pagination,
    services::favourite_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favourites).post(add_favourite))
        .route("/{book_id}", delete(remove_favourite))
}

#[utoipa::path(
    get,
    path = "/api/favourites",
    params(Pagination),
    responses(
        (status = 200, description = "Favourite books", body = ApiResponse<FavouriteBookList>)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Favourites"
)]
pub async fn list_favourites(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<FavouriteBookList>>> {
    let resp = favourite_service::list_favourites(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/favourites",
    request_body = AddFavouriteRequest,
    responses(
        (status = 200, description = "Added to favourites", body = ApiResponse<Favourite>),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Favourites"
)]
pub async fn add_favourite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddFavouriteRequest>,
) -> AppResult<Json<ApiResponse<Favourite>>> {
    let resp = favourite_service::add_favourite(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/favourites/{book_id}",
    params(("book_id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Removed, or was not a favourite", body = ApiResponse<RemoveFavouriteResponse>)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Favourites"
)]
pub async fn remove_favourite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RemoveFavouriteResponse>>> {
    let resp = favourite_service::remove_favourite(&state, &user, book_id).await?;
    Ok(Json(resp))
}
