use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::books::{BookDetail, BookList, CreateBookRequest, UpdateBookRequest},
    entity::{
        Books, Donations, Favourites, UserDetails,
        books::{self, ActiveModel},
        donations, favourites, user_details,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::{Book, BookStatus, DonationStatus, PublicProfile, Role},
    response::{ApiResponse, Meta},
    routes::params::BookQuery,
    services::{escape_like, non_blank, required},
    state::AppState,
};

/// Filters after applying what the viewer's role allows them to see.
#[derive(Debug, Default, PartialEq)]
struct Visibility {
    owner_id: Option<Uuid>,
    status: Option<BookStatus>,
    city: Option<String>,
    needs_viewer_city: bool,
}

/// Recipients browse available books in their city, donors manage their own
/// listings, everyone else sees whatever the filters select.
fn visibility(viewer: Option<&AuthUser>, query: &BookQuery) -> Visibility {
    let city = non_blank(query.city.clone());
    match viewer.map(|v| (v.user_id, v.role)) {
        Some((_, Role::Recipient)) => Visibility {
            owner_id: query.owner_id,
            status: Some(BookStatus::Available),
            needs_viewer_city: city.is_none(),
            city,
        },
        Some((user_id, Role::Donor)) => Visibility {
            owner_id: Some(user_id),
            status: query.status,
            city,
            needs_viewer_city: false,
        },
        _ => Visibility {
            owner_id: query.owner_id,
            status: query.status,
            city,
            needs_viewer_city: false,
        },
    }
}

pub async fn list_books(
    state: &AppState,
    viewer: Option<&AuthUser>,
    query: BookQuery,
) -> AppResult<ApiResponse<BookList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut scope = visibility(viewer, &query);

    if let Some(viewer) = viewer.filter(|_| scope.needs_viewer_city) {
        scope.city = UserDetails::find()
            .filter(user_details::Column::UserId.eq(viewer.user_id))
            .one(&state.orm)
            .await?
            .map(|details| details.city);
    }

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Books, books::Column::Title)).ilike(pattern.clone()))
                .add(Expr::col((Books, books::Column::Author)).ilike(pattern)),
        );
    }
    if let Some(category) = query.category {
        condition = condition.add(books::Column::Category.eq(category));
    }
    if let Some(book_condition) = query.condition {
        condition = condition.add(books::Column::Condition.eq(book_condition));
    }
    if let Some(status) = scope.status {
        condition = condition.add(books::Column::Status.eq(status));
    }
    if let Some(owner_id) = scope.owner_id {
        condition = condition.add(books::Column::OwnerId.eq(owner_id));
    }

    let mut finder = Books::find();
    if let Some(city) = scope.city.as_deref() {
        finder = finder.join(JoinType::InnerJoin, books::Relation::OwnerDetails.def());
        condition = condition.add(
            Expr::col((UserDetails, user_details::Column::City)).ilike(escape_like(city)),
        );
    }
    let finder = finder
        .filter(condition)
        .order_by_desc(books::Column::CreatedAt);

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
    Ok(ApiResponse::success("Books", BookList { items }, Some(meta)))
}

pub async fn get_book(state: &AppState, id: Uuid) -> AppResult<ApiResponse<BookDetail>> {
    let (book, owner) = Books::find_by_id(id)
        .find_also_related(UserDetails)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let detail = BookDetail {
        book: book.into(),
        owner: owner.map(PublicProfile::from),
    };
    Ok(ApiResponse::success("Book", detail, None))
}

pub async fn create_book(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookRequest,
) -> AppResult<ApiResponse<Book>> {
    if user.role == Role::Recipient {
        return Err(AppError::Forbidden("Only donors can list books".into()));
    }
    let title = required(&payload.title, "title")?;
    let author = required(&payload.author, "author")?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(user.user_id),
        title: Set(title),
        author: Set(author),
        description: Set(non_blank(payload.description)),
        image: Set(non_blank(payload.image)),
        condition: Set(payload.condition),
        category: Set(payload.category),
        status: Set(BookStatus::Available),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let book = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "book_create",
        "books",
        serde_json::json!({ "book_id": book.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Book created",
        Book::from(book),
        Some(Meta::empty()),
    ))
}

pub async fn update_book(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateBookRequest,
) -> AppResult<ApiResponse<Book>> {
    let existing = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_owner_or_admin(user, existing.owner_id)?;
    if existing.status == BookStatus::Donated {
        return Err(AppError::BadRequest("A donated book cannot be edited".into()));
    }

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(required(&title, "title")?);
    }
    if let Some(author) = payload.author {
        active.author = Set(required(&author, "author")?);
    }
    if payload.description.is_some() {
        active.description = Set(non_blank(payload.description));
    }
    if payload.image.is_some() {
        active.image = Set(non_blank(payload.image));
    }
    if let Some(condition) = payload.condition {
        active.condition = Set(condition);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    active.updated_at = Set(Utc::now().into());

    let book = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "book_update",
        "books",
        serde_json::json!({ "book_id": book.id }),
    )
    .await;

    Ok(ApiResponse::success("Updated", Book::from(book), Some(Meta::empty())))
}

pub async fn delete_book(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_owner_or_admin(user, existing.owner_id)?;
    // Approved donations reference the book as their history.
    if existing.status == BookStatus::Donated {
        return Err(AppError::BadRequest("A donated book cannot be deleted".into()));
    }

    let txn = state.orm.begin().await?;
    Favourites::delete_many()
        .filter(favourites::Column::BookId.eq(id))
        .exec(&txn)
        .await?;
    let withdrawn = Donations::delete_many()
        .filter(donations::Column::BookId.eq(id))
        .filter(donations::Column::Status.eq(DonationStatus::Pending))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "book_delete",
        "books",
        serde_json::json!({ "book_id": id, "withdrawn_requests": withdrawn.rows_affected }),
    )
    .await;

    Ok(ApiResponse::done("Deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn recipients_only_see_available_books_near_them() {
        let recipient = viewer(Role::Recipient);
        let query = BookQuery {
            status: Some(BookStatus::Donated),
            ..Default::default()
        };
        let scope = visibility(Some(&recipient), &query);
        assert_eq!(scope.status, Some(BookStatus::Available));
        assert!(scope.needs_viewer_city);

        let query = BookQuery {
            city: Some("Nairobi".into()),
            ..Default::default()
        };
        let scope = visibility(Some(&recipient), &query);
        assert_eq!(scope.city.as_deref(), Some("Nairobi"));
        assert!(!scope.needs_viewer_city);
    }

    #[test]
    fn donors_see_their_own_listings() {
        let donor = viewer(Role::Donor);
        let query = BookQuery {
            owner_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let scope = visibility(Some(&donor), &query);
        assert_eq!(scope.owner_id, Some(donor.user_id));
        assert_eq!(scope.status, None);
    }

    #[test]
    fn anonymous_and_admin_filters_pass_through() {
        let owner = Uuid::new_v4();
        let query = BookQuery {
            owner_id: Some(owner),
            status: Some(BookStatus::Donated),
            city: Some("  ".into()),
            ..Default::default()
        };
        let expected = Visibility {
            owner_id: Some(owner),
            status: Some(BookStatus::Donated),
            city: None,
            needs_viewer_city: false,
        };
        assert_eq!(visibility(None, &query), expected);
        assert_eq!(visibility(Some(&viewer(Role::Admin)), &query), expected);
    }
}
