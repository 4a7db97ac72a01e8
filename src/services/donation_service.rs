use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::donations::{
        ApproveDonationRequest, CreateDonationRequest, DonationDetail, DonationList,
        RejectDonationRequest,
    },
    entity::{
        Books, Donations,
        books::{self, ActiveModel as BookActive},
        donations::{self, ActiveModel, Model as DonationModel},
    },
    error::{AppError, AppResult},
    mailer::{Email, notify, templates},
    middleware::auth::{AuthUser, ensure_role},
    models::{Book, BookStatus, DonationStatus, Role},
    response::{ApiResponse, Meta},
    routes::params::DonationListQuery,
    services::{non_blank, required, user_service::{load_profile, load_public_profiles}},
    state::AppState,
};

const SUPERSEDED_REASON: &str = "The book was donated to another requester";

/// Resolve books and both parties for a page of donation requests.
pub async fn hydrate(orm: &OrmConn, models: Vec<DonationModel>) -> AppResult<Vec<DonationDetail>> {
    let book_ids: Vec<Uuid> = models.iter().map(|d| d.book_id).collect();
    let books: HashMap<Uuid, Book> = if book_ids.is_empty() {
        HashMap::new()
    } else {
        Books::find()
            .filter(books::Column::Id.is_in(book_ids))
            .all(orm)
            .await?
            .into_iter()
            .map(|b| (b.id, Book::from(b)))
            .collect()
    };
    let profiles = load_public_profiles(
        orm,
        models.iter().flat_map(|d| [d.requester_id, d.owner_id]),
    )
    .await?;

    Ok(models
        .into_iter()
        .map(|d| DonationDetail {
            book: books.get(&d.book_id).cloned(),
            requester: profiles.get(&d.requester_id).cloned(),
            owner: profiles.get(&d.owner_id).cloned(),
            donation: d.into(),
        })
        .collect())
}

async fn detail(orm: &OrmConn, model: DonationModel) -> AppResult<DonationDetail> {
    hydrate(orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("donation vanished while loading")))
}

/// Page through donations matching `base`, newest first.
pub async fn list_where(
    state: &AppState,
    base: Condition,
    query: DonationListQuery,
) -> AppResult<ApiResponse<DonationList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = base;
    if let Some(status) = query.status {
        condition = condition.add(donations::Column::Status.eq(status));
    }

    let finder = Donations::find()
        .filter(condition)
        .order_by_desc(donations::Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = hydrate(&state.orm, models).await?;
    Ok(ApiResponse::success(
        "Donation requests",
        DonationList { items },
        Some(Meta::paged(page, limit, total)),
    ))
}

pub async fn request_book(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDonationRequest,
) -> AppResult<ApiResponse<DonationDetail>> {
    ensure_role(user, Role::Recipient)?;

    let book = Books::find_by_id(payload.book_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if book.owner_id == user.user_id {
        return Err(AppError::BadRequest("You cannot request your own book".into()));
    }
    if book.status != BookStatus::Available {
        return Err(AppError::BadRequest("Book is no longer available".into()));
    }

    let pending = Donations::find()
        .filter(donations::Column::BookId.eq(book.id))
        .filter(donations::Column::RequesterId.eq(user.user_id))
        .filter(donations::Column::Status.eq(DonationStatus::Pending))
        .one(&state.orm)
        .await?;
    if pending.is_some() {
        return Err(AppError::Conflict(
            "You already have a pending request for this book".into(),
        ));
    }

    let donation = ActiveModel {
        id: Set(Uuid::new_v4()),
        book_id: Set(book.id),
        requester_id: Set(user.user_id),
        owner_id: Set(book.owner_id),
        status: Set(DonationStatus::Pending),
        message: Set(non_blank(payload.message)),
        pickup_address: Set(None),
        pickup_date: Set(None),
        pickup_notes: Set(None),
        rejection_reason: Set(None),
        decided_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        // Partial unique index on pending (book_id, requester_id).
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
            "You already have a pending request for this book".into(),
        ),
        _ => AppError::OrmError(err),
    })?;

    audit::record(
        &state.pool,
        user.user_id,
        "donation_request",
        "donations",
        serde_json::json!({ "donation_id": donation.id, "book_id": book.id }),
    )
    .await;

    let data = detail(&state.orm, donation).await?;
    Ok(ApiResponse::success("Request sent", data, Some(Meta::empty())))
}

pub async fn list_incoming(
    state: &AppState,
    user: &AuthUser,
    query: DonationListQuery,
) -> AppResult<ApiResponse<DonationList>> {
    ensure_role(user, Role::Donor)?;
    let base = Condition::all().add(donations::Column::OwnerId.eq(user.user_id));
    list_where(state, base, query).await
}

pub async fn list_outgoing(
    state: &AppState,
    user: &AuthUser,
    query: DonationListQuery,
) -> AppResult<ApiResponse<DonationList>> {
    let base = Condition::all().add(donations::Column::RequesterId.eq(user.user_id));
    list_where(state, base, query).await
}

pub async fn get_donation(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DonationDetail>> {
    let donation = Donations::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let involved = donation.requester_id == user.user_id || donation.owner_id == user.user_id;
    if !involved && !user.is_admin() {
        return Err(AppError::Forbidden("Not your donation request".into()));
    }

    let data = detail(&state.orm, donation).await?;
    Ok(ApiResponse::success("Donation request", data, Some(Meta::empty())))
}

fn ensure_decidable(user: &AuthUser, donation: &DonationModel) -> AppResult<()> {
    if donation.owner_id != user.user_id {
        return Err(AppError::Forbidden(
            "Only the book owner can decide on this request".into(),
        ));
    }
    if donation.status != DonationStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Request is already {}",
            donation.status.as_str()
        )));
    }
    Ok(())
}

/// Approve a pending request: the book becomes donated and competing
/// pending requests for it are rejected, all in one transaction.
pub async fn approve(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ApproveDonationRequest,
) -> AppResult<ApiResponse<DonationDetail>> {
    let pickup_address = required(&payload.pickup_address, "pickup_address")?;
    let pickup_notes = non_blank(payload.pickup_notes);

    let txn = state.orm.begin().await?;

    let donation = Donations::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_decidable(user, &donation)?;

    let book = Books::find_by_id(donation.book_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if book.status != BookStatus::Available {
        return Err(AppError::BadRequest("Book is no longer available".into()));
    }

    let now = Utc::now();
    let mut active: ActiveModel = donation.into();
    active.status = Set(DonationStatus::Approved);
    active.pickup_address = Set(Some(pickup_address.clone()));
    active.pickup_date = Set(Some(payload.pickup_date.into()));
    active.pickup_notes = Set(pickup_notes.clone());
    active.decided_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let donation = active.update(&txn).await?;

    let book_title = book.title.clone();
    let mut book_active: BookActive = book.into();
    book_active.status = Set(BookStatus::Donated);
    book_active.updated_at = Set(now.into());
    book_active.update(&txn).await?;

    let competing = Donations::find()
        .filter(donations::Column::BookId.eq(donation.book_id))
        .filter(donations::Column::Status.eq(DonationStatus::Pending))
        .filter(donations::Column::Id.ne(donation.id))
        .all(&txn)
        .await?;
    if !competing.is_empty() {
        Donations::update_many()
            .col_expr(donations::Column::Status, Expr::value(DonationStatus::Rejected))
            .col_expr(donations::Column::RejectionReason, Expr::value(SUPERSEDED_REASON))
            .col_expr(donations::Column::DecidedAt, Expr::value(now))
            .col_expr(donations::Column::UpdatedAt, Expr::value(now))
            .filter(donations::Column::Id.is_in(competing.iter().map(|d| d.id)))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    if let Ok(requester) = load_profile(&state.orm, donation.requester_id).await {
        let (subject, html) = templates::donation_approved(
            &requester.name,
            &book_title,
            &pickup_address,
            payload.pickup_date,
            pickup_notes.as_deref(),
        );
        notify(state.mailer.as_ref(), Email::new(requester.email.as_str(), subject, html)).await;
    }
    for other in &competing {
        if let Ok(requester) = load_profile(&state.orm, other.requester_id).await {
            let (subject, html) =
                templates::donation_rejected(&requester.name, &book_title, Some(SUPERSEDED_REASON));
            notify(state.mailer.as_ref(), Email::new(requester.email.as_str(), subject, html)).await;
        }
    }

    audit::record(
        &state.pool,
        user.user_id,
        "donation_approve",
        "donations",
        serde_json::json!({
            "donation_id": donation.id,
            "book_id": donation.book_id,
            "superseded": competing.len(),
        }),
    )
    .await;

    let data = detail(&state.orm, donation).await?;
    Ok(ApiResponse::success("Request approved", data, Some(Meta::empty())))
}

pub async fn reject(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RejectDonationRequest,
) -> AppResult<ApiResponse<DonationDetail>> {
    let reason = non_blank(payload.reason);

    let txn = state.orm.begin().await?;
    let donation = Donations::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_decidable(user, &donation)?;

    let now = Utc::now();
    let mut active: ActiveModel = donation.into();
    active.status = Set(DonationStatus::Rejected);
    active.rejection_reason = Set(reason.clone());
    active.decided_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let donation = active.update(&txn).await?;
    txn.commit().await?;

    let book = donation.find_related(Books).one(&state.orm).await?;
    if let (Some(book), Ok(requester)) = (book, load_profile(&state.orm, donation.requester_id).await) {
        let (subject, html) =
            templates::donation_rejected(&requester.name, &book.title, reason.as_deref());
        notify(state.mailer.as_ref(), Email::new(requester.email.as_str(), subject, html)).await;
    }

    audit::record(
        &state.pool,
        user.user_id,
        "donation_reject",
        "donations",
        serde_json::json!({ "donation_id": donation.id, "book_id": donation.book_id }),
    )
    .await;

    let data = detail(&state.orm, donation).await?;
    Ok(ApiResponse::success("Request rejected", data, Some(Meta::empty())))
}

/// Withdraw a request that is still pending.
pub async fn cancel(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let donation = Donations::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if donation.requester_id != user.user_id {
        return Err(AppError::Forbidden("Not your donation request".into()));
    }
    if donation.status != DonationStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Request is already {}",
            donation.status.as_str()
        )));
    }

    let book_id = donation.book_id;
    donation.delete(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "donation_cancel",
        "donations",
        serde_json::json!({ "donation_id": id, "book_id": book_id }),
    )
    .await;

    Ok(ApiResponse::done("Request cancelled"))
}
