use std::fmt;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{models::LikeTarget, policy::Operation};

/// ResourceRef
///
/// Names the record (or the listing) an error is about, so every message is actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    User(i64),
    Post(i64),
    Comment(i64),
    Posts,
    Comments,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::User(id) => write!(f, "user {id}"),
            ResourceRef::Post(id) => write!(f, "post {id}"),
            ResourceRef::Comment(id) => write!(f, "comment {id}"),
            ResourceRef::Posts => f.write_str("posts matching the request"),
            ResourceRef::Comments => f.write_str("comments matching the request"),
        }
    }
}

fn to_operation(operation: &Option<Operation>) -> String {
    operation.map(|op| format!(" to {op}")).unwrap_or_default()
}

fn on_resource(resource: &Option<ResourceRef>) -> String {
    resource.map(|r| format!(" on {r}")).unwrap_or_default()
}

/// AppError
///
/// Domain-level error taxonomy of the policy engine and its storage collaborator.
/// The HTTP mapping lives in the `IntoResponse` impl below; nothing else in the crate
/// knows about status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication required{}", to_operation(.0))]
    Unauthenticated(Option<Operation>),

    #[error("invalid or expired credential")]
    InvalidCredential,

    #[error("not permitted to {operation}{}", on_resource(.resource))]
    Forbidden {
        operation: Operation,
        resource: Option<ResourceRef>,
    },

    #[error("{0} not found")]
    NotFound(ResourceRef),

    #[error("user {user_id} already likes {target}")]
    DuplicateLike { target: LikeTarget, user_id: i64 },

    #[error("user {user_id} has not liked {target}")]
    LikeNotFound { target: LikeTarget, user_id: i64 },

    #[error("user {follower_id} already follows user {followed_id}")]
    AlreadyFollowing { follower_id: i64, followed_id: i64 },

    #[error("user {follower_id} does not follow user {followed_id}")]
    NotFollowing { follower_id: i64, followed_id: i64 },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn forbidden(operation: Operation, resource: ResourceRef) -> Self {
        AppError::Forbidden {
            operation,
            resource: Some(resource),
        }
    }

    /// Stable machine-readable code carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidCredential => "INVALID_CREDENTIAL",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateLike { .. } => "DUPLICATE_LIKE",
            AppError::LikeNotFound { .. } => "LIKE_NOT_FOUND",
            AppError::AlreadyFollowing { .. } => "ALREADY_FOLLOWING",
            AppError::NotFollowing { .. } => "NOT_FOLLOWING",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateLike { .. } | AppError::AlreadyFollowing { .. } => {
                StatusCode::CONFLICT
            }
            AppError::LikeNotFound { .. }
            | AppError::NotFollowing { .. }
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Malformed bodies and query strings are input errors like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!("storage failure: {:?}", e);
                "internal storage failure".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
