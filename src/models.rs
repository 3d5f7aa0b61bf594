use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, ResourceRef};

// --- Enumerations ---

/// Role
///
/// The three-tier RBAC field stored on every user row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Author,
    #[default]
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Author => "author",
            Role::Reader => "reader",
        })
    }
}

/// Tag
///
/// Closed set of post categories. Stored as text; the wire form of
/// `HealthAndWellness` is `"health & wellness"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum Tag {
    Entertainment,
    Technology,
    #[serde(rename = "health & wellness")]
    #[sqlx(rename = "health & wellness")]
    HealthAndWellness,
    Lifestyle,
}

impl Tag {
    pub const ALL: [Tag; 4] = [
        Tag::Entertainment,
        Tag::Technology,
        Tag::HealthAndWellness,
        Tag::Lifestyle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Entertainment => "entertainment",
            Tag::Technology => "technology",
            Tag::HealthAndWellness => "health & wellness",
            Tag::Lifestyle => "lifestyle",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_lowercase();
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| AppError::Validation(format!("unknown tag `{raw}`")))
    }
}

// --- Persisted Rows ---

/// User
///
/// A principal's profile row in `users`. Credentials live with the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub job_description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserSummary
///
/// Compact user projection returned by listings and follow graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Post
///
/// A blog post from `posts`. `published = false` marks a draft, readable only by its
/// author and admins. `likes_count` moves in lockstep with the `post_likes` rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub tag: Option<Tag>,
    pub published: bool,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    pub likes_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment from `comments`, attached to exactly one post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    pub content: String,
    pub likes_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Like
///
/// One row of `post_likes` or `comment_likes`. `target_id` is the liked post or comment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Like {
    pub id: i64,
    pub target_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// FollowEdge
///
/// Directed edge `follower_id -> followed_id` from `follows`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct FollowEdge {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// LikeTarget
///
/// The likeable resources. Each maps onto its own like table and counter column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Post(i64),
    Comment(i64),
}

impl LikeTarget {
    pub fn id(self) -> i64 {
        match self {
            LikeTarget::Post(id) | LikeTarget::Comment(id) => id,
        }
    }

    pub fn resource(self) -> ResourceRef {
        match self {
            LikeTarget::Post(id) => ResourceRef::Post(id),
            LikeTarget::Comment(id) => ResourceRef::Comment(id),
        }
    }
}

impl fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LikeTarget::Post(id) => write!(f, "post {id}"),
            LikeTarget::Comment(id) => write!(f, "comment {id}"),
        }
    }
}

// --- Request Payloads ---

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}

fn require_optional_text(field: &str, value: Option<&String>) -> AppResult<()> {
    match value {
        Some(value) => require_text(field, value),
        None => Ok(()),
    }
}

/// CreatePostRequest
///
/// Input for `POST /posts`. `author_id` is honoured only for admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author_id: Option<i64>,
}

impl CreatePostRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}

/// UpdatePostRequest
///
/// Partial update for `PUT /posts/{id}`. Absent fields are left untouched.
///
/// An explicit `null` reads the same as an absent field, so `tag` and `published_at`
/// cannot be cleared once set; they can only be replaced.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_optional_text("title", self.title.as_ref())?;
        require_optional_text("content", self.content.as_ref())
    }
}

/// CommentRequest
///
/// Body for creating or editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_text("content", &self.content)
    }
}

/// UpdateUserRequest
///
/// Partial self-update of the caller's profile. The role is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_optional_text("username", self.username.as_ref())
    }
}

// --- Response Payloads ---

/// LikeStatus
///
/// Result of a like/unlike: the target and its counter after the change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LikeStatus {
    pub target_id: i64,
    pub likes_count: i64,
}

/// Detail
///
/// Plain acknowledgement body for mutations without a resource to return.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
