use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::users::{ContactUserRequest, ReportOutcome, ReportUserRequest, UpdateProfileRequest},
    entity::{
        UserDetails, UserReports, Users,
        user_details::{self, ActiveModel as DetailsActive},
        user_reports::{self, ActiveModel as ReportActive},
        users::ActiveModel as UserActive,
    },
    error::{AppError, AppResult},
    mailer::{Email, templates},
    middleware::auth::AuthUser,
    models::{PublicProfile, UserProfile},
    response::{ApiResponse, Meta},
    services::{non_blank, required},
    state::AppState,
};

/// Account plus profile for `user_id`.
pub async fn load_profile(orm: &OrmConn, user_id: Uuid) -> AppResult<UserProfile> {
    let found = Users::find_by_id(user_id)
        .find_also_related(UserDetails)
        .one(orm)
        .await?;
    match found {
        Some((user, Some(details))) => Ok(UserProfile::from_parts(user, details)),
        _ => Err(AppError::NotFound),
    }
}

/// Public profiles keyed by user id; unknown ids are simply absent.
pub async fn load_public_profiles(
    orm: &OrmConn,
    user_ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, PublicProfile>> {
    let mut ids: Vec<Uuid> = user_ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles = UserDetails::find()
        .filter(user_details::Column::UserId.is_in(ids))
        .all(orm)
        .await?
        .into_iter()
        .map(|details| (details.user_id, PublicProfile::from(details)))
        .collect();
    Ok(profiles)
}

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let profile = load_profile(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Profile", profile, Some(Meta::empty())))
}

pub async fn update_me(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let details = UserDetails::find()
        .filter(user_details::Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: DetailsActive = details.into();
    if let Some(name) = payload.name {
        active.name = Set(required(&name, "name")?);
    }
    if let Some(city) = payload.city {
        active.city = Set(required(&city, "city")?);
    }
    if payload.address.is_some() {
        active.address = Set(non_blank(payload.address));
    }
    if payload.photo.is_some() {
        active.photo = Set(non_blank(payload.photo));
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "profile_update",
        "user_details",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    let profile = load_profile(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Profile updated", profile, Some(Meta::empty())))
}

pub async fn get_public_profile(state: &AppState, id: Uuid) -> AppResult<ApiResponse<PublicProfile>> {
    let details = UserDetails::find()
        .filter(user_details::Column::UserId.eq(id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", details.into(), None))
}

/// A user is blocked once `threshold` distinct users have reported them.
pub fn should_block(report_count: i32, threshold: i32) -> bool {
    report_count >= threshold
}

pub async fn report_user(
    state: &AppState,
    user: &AuthUser,
    reported_id: Uuid,
    payload: ReportUserRequest,
) -> AppResult<ApiResponse<ReportOutcome>> {
    if reported_id == user.user_id {
        return Err(AppError::BadRequest("You cannot report yourself".into()));
    }
    let reason = required(&payload.reason, "reason")?;

    let txn = state.orm.begin().await?;

    let target = Users::find_by_id(reported_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let already = UserReports::find()
        .filter(user_reports::Column::ReporterId.eq(user.user_id))
        .filter(user_reports::Column::ReportedId.eq(reported_id))
        .one(&txn)
        .await?;
    if already.is_some() {
        return Err(AppError::Conflict("You already reported this user".into()));
    }

    ReportActive {
        id: Set(Uuid::new_v4()),
        reporter_id: Set(user.user_id),
        reported_id: Set(reported_id),
        reason: Set(reason),
        created_at: sea_orm::ActiveValue::NotSet,
    }
    .insert(&txn)
    .await?;

    let report_count = target.report_count + 1;
    let newly_blocked =
        !target.is_blocked && should_block(report_count, state.config.report_block_threshold);
    let is_blocked = target.is_blocked || newly_blocked;

    let mut active: UserActive = target.into();
    active.report_count = Set(report_count);
    active.is_blocked = Set(is_blocked);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;

    if newly_blocked {
        tracing::info!(user_id = %reported_id, report_count, "user blocked after reports");
    }
    audit::record(
        &state.pool,
        user.user_id,
        "user_report",
        "user_reports",
        serde_json::json!({ "reported_id": reported_id, "report_count": report_count, "blocked": is_blocked }),
    )
    .await;

    Ok(ApiResponse::success(
        "User reported",
        ReportOutcome {
            report_count,
            is_blocked,
        },
        Some(Meta::empty()),
    ))
}

/// Email another user on behalf of the caller, with reply-to set to the caller.
pub async fn contact_user(
    state: &AppState,
    user: &AuthUser,
    target_id: Uuid,
    payload: ContactUserRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if target_id == user.user_id {
        return Err(AppError::BadRequest("You cannot message yourself".into()));
    }
    let subject = required(&payload.subject, "subject")?;
    let message = required(&payload.message, "message")?;

    let sender = load_profile(&state.orm, user.user_id).await?;
    let target = load_profile(&state.orm, target_id).await?;

    let (subject, html) =
        templates::direct_message(&target.name, &sender.name, &sender.email, &subject, &message);
    state
        .mailer
        .send(Email::new(target.email.as_str(), subject, html).reply_to(sender.email.as_str()))
        .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_contact",
        "users",
        serde_json::json!({ "target_id": target_id }),
    )
    .await;

    Ok(ApiResponse::done("Message sent"))
}

#[cfg(test)]
mod tests {
    use super::should_block;

    #[test]
    fn blocking_starts_at_threshold() {
        assert!(!should_block(2, 3));
        assert!(should_block(3, 3));
        assert!(should_block(7, 3));
    }
}
