use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
        SignupRequest,
    },
    entity::{
        Users,
        user_details::ActiveModel as DetailsActive,
        users::{self, ActiveModel as UserActive},
    },
    error::{AppError, AppResult},
    mailer::{Email, notify, templates},
    middleware::auth::{AuthUser, TOKEN_COOKIE},
    models::{Role, UserProfile},
    response::{ApiResponse, Meta},
    services::{non_blank, required, user_service::load_profile},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::BadRequest("A valid email is required".into())),
    }
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: usize::try_from(expiration.timestamp())
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Session cookie carrying the token, expiring with it.
pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    let mut cookie = base_cookie(config, token);
    cookie.set_max_age(time::Duration::hours(config.jwt_ttl_hours));
    cookie
}

/// Cookie matching the session cookie's path, for removal from the jar.
pub fn cleared_cookie(config: &AppConfig) -> Cookie<'static> {
    base_cookie(config, String::new())
}

fn base_cookie(config: &AppConfig, value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.cookie_secure)
        .build()
}

pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<ApiResponse<UserProfile>> {
    let email = normalize_email(&payload.email)?;
    check_password(&payload.password)?;
    let name = required(&payload.name, "name")?;
    let city = required(&payload.city, "city")?;
    if payload.role == Role::Admin {
        return Err(AppError::BadRequest("Role must be donor or recipient".into()));
    }

    let exist = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let verify_token = random_token();
    let user_id = Uuid::new_v4();

    let txn = state.orm.begin().await?;
    UserActive {
        id: Set(user_id),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        is_verified: Set(false),
        verify_token: Set(Some(verify_token.clone())),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        report_count: Set(0),
        is_blocked: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        // Concurrent signup with the same address won the insert.
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Email is already taken".to_string())
        }
        _ => AppError::OrmError(err),
    })?;

    DetailsActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(name.clone()),
        city: Set(city),
        address: Set(non_blank(payload.address)),
        photo: Set(None),
        role: Set(payload.role),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    let link = format!(
        "{}/api/auth/verify?token={verify_token}",
        state.config.public_url
    );
    let (subject, html) = templates::verification(&name, &link);
    notify(state.mailer.as_ref(), Email::new(email.as_str(), subject, html)).await;

    audit::record(
        &state.pool,
        user_id,
        "user_signup",
        "users",
        serde_json::json!({ "user_id": user_id, "role": payload.role }),
    )
    .await;

    let profile = load_profile(&state.orm, user_id).await?;
    Ok(ApiResponse::success(
        "Account created, check your email to verify it",
        profile,
        Some(Meta::empty()),
    ))
}

pub async fn verify_email(state: &AppState, token: &str) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = Users::find()
        .filter(users::Column::VerifyToken.eq(token))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid verification token".into()))?;
    let user_id = user.id;

    let mut active: UserActive = user.into();
    active.is_verified = Set(true);
    active.verify_token = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user_id,
        "user_verify",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::done("Email verified"))
}

/// Returns the session cookie alongside the response body.
pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<(Cookie<'static>, ApiResponse<LoginResponse>)> {
    let email = payload.email.trim().to_lowercase();
    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }
    if user.is_blocked {
        return Err(AppError::Forbidden("Account is blocked".into()));
    }
    if !user.is_verified {
        return Err(AppError::Forbidden("Email is not verified".into()));
    }

    let profile = load_profile(&state.orm, user.id).await?;
    let token = issue_token(&state.config, profile.id, profile.role)?;
    let cookie = session_cookie(&state.config, token.clone());

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok((
        cookie,
        ApiResponse::success(
            "Logged in",
            LoginResponse {
                token,
                user: profile,
            },
            Some(Meta::empty()),
        ),
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = payload.email.trim().to_lowercase();
    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    if let Some(user) = user {
        let user_id = user.id;
        let token = random_token();
        let mut active: UserActive = user.into();
        active.reset_token = Set(Some(token.clone()));
        active.reset_token_expires_at =
            Set(Some((Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES)).into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        let profile = load_profile(&state.orm, user_id).await?;
        let link = format!("{}/reset-password?token={token}", state.config.public_url);
        let (subject, html) = templates::password_reset(&profile.name, &link);
        notify(state.mailer.as_ref(), Email::new(profile.email.as_str(), subject, html)).await;

        audit::record(
            &state.pool,
            user_id,
            "password_reset_requested",
            "users",
            serde_json::json!({ "user_id": user_id }),
        )
        .await;
    } else {
        tracing::debug!("password reset requested for unknown email");
    }

    Ok(ApiResponse::done(
        "If the account exists, a reset link has been sent",
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    check_password(&payload.password)?;
    let user = Users::find()
        .filter(users::Column::ResetToken.eq(payload.token.trim()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    let expired = user
        .reset_token_expires_at
        .is_none_or(|expires| expires.with_timezone(&Utc) < Utc::now());
    if expired {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.reset_token = Set(None);
    active.reset_token_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user_id,
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::done("Password updated"))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let profile = load_profile(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Current user", profile, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_claims;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn issued_token_decodes_to_same_subject() {
        let config = AppConfig::for_database("postgres://unused");
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, user_id, Role::Donor).unwrap();
        let claims = decode_claims(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Donor);
        assert!(decode_claims(&token, "another-secret").is_err());
    }

    #[test]
    fn cookies_carry_expected_attributes() {
        let mut config = AppConfig::for_database("postgres://unused");
        let cookie = session_cookie(&config, "abc".into());
        assert_eq!((cookie.name(), cookie.value()), ("token", "abc"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
        assert_eq!(cookie.secure(), Some(false));

        config.cookie_secure = true;
        let cleared = cleared_cookie(&config);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.path(), Some("/"));
        assert_eq!(cleared.secure(), Some(true));
    }
}
