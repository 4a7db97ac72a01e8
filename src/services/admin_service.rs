use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Iterable, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            BlockUserRequest, BookStats, CategoryCount, DashboardStats, DonationStats, ReportList,
            UserList, UserStats,
        },
        donations::DonationList,
    },
    entity::{
        Books, Donations, UserDetails, UserReports, Users, books, donations, user_details,
        user_reports, users::{self, ActiveModel as UserActive},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{BookCategory, BookStatus, DonationStatus, Role, UserProfile, UserReport},
    response::{ApiResponse, Meta},
    routes::params::{DonationListQuery, Pagination, UserListQuery},
    services::{donation_service, user_service::load_profile},
    state::AppState,
};

pub async fn dashboard_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;
    let orm = &state.orm;

    let role_count = |role: Role| {
        UserDetails::find()
            .filter(user_details::Column::Role.eq(role))
            .count(orm)
    };
    let users = UserStats {
        total: Users::find().count(orm).await?,
        donors: role_count(Role::Donor).await?,
        recipients: role_count(Role::Recipient).await?,
        admins: role_count(Role::Admin).await?,
        verified: Users::find()
            .filter(users::Column::IsVerified.eq(true))
            .count(orm)
            .await?,
        blocked: Users::find()
            .filter(users::Column::IsBlocked.eq(true))
            .count(orm)
            .await?,
    };

    let status_count =
        |status: BookStatus| Books::find().filter(books::Column::Status.eq(status)).count(orm);
    let mut by_category = Vec::new();
    for category in BookCategory::iter() {
        let count = Books::find()
            .filter(books::Column::Category.eq(category))
            .count(orm)
            .await?;
        by_category.push(CategoryCount { category, count });
    }
    let books = BookStats {
        total: Books::find().count(orm).await?,
        available: status_count(BookStatus::Available).await?,
        donated: status_count(BookStatus::Donated).await?,
        by_category,
    };

    let donation_count = |status: DonationStatus| {
        Donations::find()
            .filter(donations::Column::Status.eq(status))
            .count(orm)
    };
    let donations = DonationStats {
        total: Donations::find().count(orm).await?,
        pending: donation_count(DonationStatus::Pending).await?,
        approved: donation_count(DonationStatus::Approved).await?,
        rejected: donation_count(DonationStatus::Rejected).await?,
    };

    Ok(ApiResponse::success(
        "Dashboard",
        DashboardStats {
            users,
            books,
            donations,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(role) = query.role {
        condition = condition.add(user_details::Column::Role.eq(role));
    }
    if let Some(blocked) = query.blocked {
        condition = condition.add(users::Column::IsBlocked.eq(blocked));
    }

    let finder = Users::find()
        .find_also_related(UserDetails)
        .filter(condition)
        .order_by_desc(users::Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(account, details)| details.map(|d| UserProfile::from_parts(account, d)))
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::paged(page, limit, total)),
    ))
}

/// Block or unblock an account. Unblocking also clears the report count.
pub async fn set_blocked(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: BlockUserRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("You cannot block yourself".into()));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = target.into();
    active.is_blocked = Set(payload.blocked);
    if !payload.blocked {
        active.report_count = Set(0);
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        if payload.blocked { "user_block" } else { "user_unblock" },
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    let profile = load_profile(&state.orm, id).await?;
    Ok(ApiResponse::success("User updated", profile, Some(Meta::empty())))
}

pub async fn list_reports(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReportList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = UserReports::find().order_by_desc(user_reports::Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserReport::from)
        .collect();

    Ok(ApiResponse::success(
        "Reports",
        ReportList { items },
        Some(Meta::paged(page, limit, total)),
    ))
}

pub async fn list_donations(
    state: &AppState,
    user: &AuthUser,
    query: DonationListQuery,
) -> AppResult<ApiResponse<DonationList>> {
    ensure_admin(user)?;
    donation_service::list_where(state, Condition::all(), query).await
}
