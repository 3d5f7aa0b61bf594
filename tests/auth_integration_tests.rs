use axum::{
    extract::FromRequestParts,
    http::{Request, request::Parts},
};
use blog_backend::{
    AppError, AppState,
    auth::{AuthUser, Claims, LOCAL_USER_HEADER, MaybeAuthUser},
    config::{AppConfig, Env},
    models::Role,
    repository::InMemoryRepository,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

// --- Helpers ---

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn token(sub: i64, secret: &str, exp: usize) -> String {
    let claims = Claims {
        sub,
        exp,
        iat: now(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn parts(headers: &[(&str, String)]) -> Parts {
    let mut builder = Request::builder().uri("/me");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(()).unwrap().into_parts().0
}

fn bearer(token: String) -> (&'static str, String) {
    ("authorization", format!("Bearer {token}"))
}

async fn state_with(config: AppConfig) -> (AppState, i64) {
    let repo = InMemoryRepository::new();
    let author = repo.insert_user("ada", "ada@blog.dev", Role::Author).await;
    (AppState::new(Arc::new(repo), config), author.id)
}

// --- Bearer tokens ---

#[tokio::test]
async fn test_valid_token_resolves_principal_with_stored_role() {
    let config = AppConfig::default();
    let secret = config.jwt_secret.clone();
    let (state, user_id) = state_with(config).await;

    let mut parts = parts(&[bearer(token(user_id, &secret, now() + 3600))]);
    let AuthUser(principal) = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(principal.id, user_id);
    assert_eq!(principal.role, Role::Author);
}

#[tokio::test]
async fn test_expired_token_is_invalid_credential() {
    let config = AppConfig::default();
    let secret = config.jwt_secret.clone();
    let (state, user_id) = state_with(config).await;

    let mut parts = parts(&[bearer(token(user_id, &secret, now() - 3600))]);
    let result = MaybeAuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(result, Err(AppError::InvalidCredential)));
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let (state, user_id) = state_with(AppConfig::default()).await;

    let mut parts = parts(&[bearer(token(user_id, "not-the-secret", now() + 3600))]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(result, Err(AppError::InvalidCredential)));
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let config = AppConfig::default();
    let secret = config.jwt_secret.clone();
    let (state, _) = state_with(config).await;

    let mut parts = parts(&[bearer(token(4_242, &secret, now() + 3600))]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(result, Err(AppError::InvalidCredential)));
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected_not_anonymous() {
    let (state, _) = state_with(AppConfig::default()).await;

    let mut parts = parts(&[("authorization", "Basic YWRhOnB3".to_string())]);
    let result = MaybeAuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(result, Err(AppError::InvalidCredential)));
}

// --- Anonymous ---

#[tokio::test]
async fn test_missing_credentials() {
    let (state, _) = state_with(AppConfig::default()).await;

    let MaybeAuthUser(principal) = MaybeAuthUser::from_request_parts(&mut parts(&[]), &state)
        .await
        .unwrap();
    assert!(principal.is_none());

    let required = AuthUser::from_request_parts(&mut parts(&[]), &state).await;
    assert!(matches!(required, Err(AppError::Unauthenticated(None))));
}

// --- Local bypass ---

#[tokio::test]
async fn test_local_bypass_header() {
    let (state, user_id) = state_with(AppConfig::default()).await;

    let mut parts = parts(&[(LOCAL_USER_HEADER, user_id.to_string())]);
    let AuthUser(principal) = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(principal.id, user_id);
}

#[tokio::test]
async fn test_local_bypass_is_ignored_in_production() {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let (state, user_id) = state_with(config).await;

    let mut parts = parts(&[(LOCAL_USER_HEADER, user_id.to_string())]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(result, Err(AppError::Unauthenticated(None))));
}

#[tokio::test]
async fn test_local_bypass_for_unknown_user_falls_back_to_token() {
    let config = AppConfig::default();
    let secret = config.jwt_secret.clone();
    let (state, user_id) = state_with(config).await;

    let mut parts = parts(&[
        (LOCAL_USER_HEADER, "9999".to_string()),
        bearer(token(user_id, &secret, now() + 3600)),
    ]);
    let MaybeAuthUser(principal) = MaybeAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(principal.map(|p| p.id), Some(user_id));
}
