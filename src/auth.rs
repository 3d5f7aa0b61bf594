use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    policy::Principal,
    repository::{Repository, RepositoryState},
};

/// Header accepted in `Env::Local` in place of a bearer token.
pub const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload expected inside the bearer JWT issued by the external auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the id of the `users` row the token was issued for.
    pub sub: i64,
    /// Expiration time; expired tokens are rejected.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// resolve_principal
///
/// Turns the request credentials into a `Principal`, or `None` for anonymous access.
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user wins.
/// 2. No `Authorization` header: anonymous.
/// 3. A bearer token must decode against the configured secret, be unexpired, and name
///    a user that still exists. Anything else is `InvalidCredential`; a bad credential
///    is never downgraded to anonymous.
///
/// The role is always read from storage, never from the token.
pub async fn resolve_principal(
    headers: &HeaderMap,
    config: &AppConfig,
    repo: &dyn Repository,
) -> AppResult<Option<Principal>> {
    if config.env == Env::Local {
        let local_id = headers
            .get(LOCAL_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        if let Some(user_id) = local_id {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(Principal::new(user.id, user.role)));
            }
            tracing::debug!(user_id, "local bypass header names no user, falling back to JWT");
        }
    }

    let Some(raw) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = raw
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidCredential)?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!(reason = ?other, "rejected malformed token"),
            }
            return Err(AppError::InvalidCredential);
        }
    };

    // Tokens outlive deleted accounts; the user row is the source of truth.
    let user = repo
        .get_user(claims.sub)
        .await?
        .ok_or(AppError::InvalidCredential)?;

    Ok(Some(Principal::new(user.id, user.role)))
}

/// MaybeAuthUser
///
/// Optional identity for public routes. Absent credentials yield `None`; invalid ones
/// still reject the request.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let principal = resolve_principal(&parts.headers, &config, repo.as_ref()).await?;
        Ok(MaybeAuthUser(principal))
    }
}

/// AuthUser
///
/// Required identity. Used both as the guard middleware of the authenticated router and
/// as a handler argument. Rejects anonymous requests with `Unauthenticated`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(principal) = MaybeAuthUser::from_request_parts(parts, state).await?;
        principal.map(AuthUser).ok_or(AppError::Unauthenticated(None))
    }
}
