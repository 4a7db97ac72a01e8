use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::{UserDetails, Users, user_details},
    error::AppError,
    models::Role,
    state::AppState,
};

/// Name of the session cookie carrying the signed token.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!(
            "Only {} accounts can do this",
            role.as_str()
        )));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

/// Owners may act on their own records, admins on everyone's.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.user_id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("You do not own this resource".into()))
    }
}

/// Token from `Authorization: Bearer …`, falling back to the session cookie.
/// Any other authorization scheme is ignored.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

async fn resolve(token: &str, state: &AppState) -> Result<AuthUser, AppError> {
    let claims = decode_claims(token, &state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    let found = Users::find_by_id(user_id)
        .find_also_related(UserDetails)
        .one(&state.orm)
        .await?;
    let (user, details): (_, Option<user_details::Model>) = match found {
        Some(pair) => pair,
        None => return Err(AppError::Unauthorized("Account no longer exists".into())),
    };

    if user.is_blocked {
        return Err(AppError::Forbidden("Account is blocked".into()));
    }

    let role = details.map(|d| d.role).unwrap_or(claims.role);
    Ok(AuthUser { user_id, role })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".into()))?;
        resolve(&token, state).await
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(None);
        };
        // A stale or rejected session browses anonymously.
        match resolve(&token, state).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::Unauthorized(reason) | AppError::Forbidden(reason)) => {
                tracing::debug!(%reason, "ignoring session on optional route");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn token_is_read_from_cookie_jar() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=xyz; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn other_schemes_fall_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(extract_token(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("token=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn ownership_check_allows_admins() {
        let owner = Uuid::new_v4();
        let admin = AuthUser { user_id: Uuid::new_v4(), role: Role::Admin };
        let stranger = AuthUser { user_id: Uuid::new_v4(), role: Role::Donor };
        assert!(ensure_owner_or_admin(&admin, owner).is_ok());
        assert!(ensure_owner_or_admin(&stranger, owner).is_err());
    }
}
