use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::favourites::{AddFavouriteRequest, FavouriteBookList, RemoveFavouriteResponse},
    entity::{
        Books, Favourites,
        favourites::{self, ActiveModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Book, Favourite},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_favourites(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<FavouriteBookList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Books::find()
        .inner_join(Favourites)
        .filter(favourites::Column::UserId.eq(user.user_id))
        .order_by_desc(favourites::Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Book::from)
        .collect();

    let meta = Meta::paged(page, limit, total);
    Ok(ApiResponse::success("OK", FavouriteBookList { items }, Some(meta)))
}

pub async fn add_favourite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavouriteRequest,
) -> AppResult<ApiResponse<Favourite>> {
    let book = Books::find_by_id(payload.book_id).one(&state.orm).await?;
    if book.is_none() {
        return Err(AppError::NotFound);
    }

    let favourite = match find_favourite(&state.orm, user.user_id, payload.book_id).await? {
        Some(fav) => fav,
        None => {
            let inserted = ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                book_id: Set(payload.book_id),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await;
            match inserted {
                Ok(fav) => fav,
                // Lost a race against the same (user_id, book_id) insert.
                Err(err)
                    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    find_favourite(&state.orm, user.user_id, payload.book_id)
                        .await?
                        .ok_or(AppError::OrmError(err))?
                }
                Err(err) => return Err(err.into()),
            }
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        "favourite_add",
        "favourites",
        serde_json::json!({ "book_id": payload.book_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to favourites",
        Favourite::from(favourite),
        Some(Meta::empty()),
    ))
}

async fn find_favourite(
    orm: &OrmConn,
    user_id: Uuid,
    book_id: Uuid,
) -> AppResult<Option<favourites::Model>> {
    let found = Favourites::find()
        .filter(favourites::Column::UserId.eq(user_id))
        .filter(favourites::Column::BookId.eq(book_id))
        .one(orm)
        .await?;
    Ok(found)
}

/// Removing a favourite that does not exist is not an error.
pub async fn remove_favourite(
    state: &AppState,
    user: &AuthUser,
    book_id: Uuid,
) -> AppResult<ApiResponse<RemoveFavouriteResponse>> {
    let result = Favourites::delete_many()
        .filter(favourites::Column::UserId.eq(user.user_id))
        .filter(favourites::Column::BookId.eq(book_id))
        .exec(&state.orm)
        .await?;
    let removed = result.rows_affected > 0;

    if removed {
        audit::record(
            &state.pool,
            user.user_id,
            "favourite_remove",
            "favourites",
            serde_json::json!({ "book_id": book_id }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Removed from favourites",
        RemoveFavouriteResponse { removed },
        Some(Meta::empty()),
    ))
}
