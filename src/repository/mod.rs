use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        Comment, CreatePostRequest, FollowEdge, LikeTarget, Post, UpdatePostRequest,
        UpdateUserRequest, User, UserSummary,
    },
    policy::visibility::{CommentScope, PostQuery},
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The storage collaborator of the policy engine. Implementations execute already
/// authorized reads and writes; they never make access decisions themselves.
///
/// Contract for writes:
/// - every method is one atomic unit; a failure leaves no partial state behind;
/// - `add_like`/`remove_like` move the target's `likes_count` in the same unit as the row;
/// - unique-constraint violations surface as `DuplicateLike`/`AlreadyFollowing`;
/// - deletes follow [`CASCADE_RULES`].
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<UserSummary>>;
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> AppResult<Option<User>>;
    // Removes the user and everything cascading from it. Returns false if absent.
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    // --- Posts ---
    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> AppResult<Option<Post>>;
    async fn create_post(&self, author_id: i64, req: CreatePostRequest) -> AppResult<Post>;
    // Applies only the fields present in `req`.
    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> AppResult<Option<Post>>;
    async fn delete_post(&self, id: i64) -> AppResult<bool>;

    // --- Comments ---
    async fn get_comment(&self, id: i64) -> AppResult<Option<Comment>>;
    async fn list_comments(&self, post_id: i64, scope: CommentScope) -> AppResult<Vec<Comment>>;
    async fn create_comment(&self, post_id: i64, author_id: i64, content: String)
    -> AppResult<Comment>;
    async fn update_comment(&self, id: i64, content: String) -> AppResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> AppResult<bool>;

    // --- Likes ---
    async fn has_like(&self, target: LikeTarget, user_id: i64) -> AppResult<bool>;
    // Inserts the like row and increments the counter. Returns the new count.
    async fn add_like(&self, target: LikeTarget, user_id: i64) -> AppResult<i64>;
    // Deletes the like row and decrements the counter. Returns the new count.
    async fn remove_like(&self, target: LikeTarget, user_id: i64) -> AppResult<i64>;

    // --- Follows ---
    async fn is_following(&self, follower_id: i64, followed_id: i64) -> AppResult<bool>;
    async fn follow(&self, follower_id: i64, followed_id: i64) -> AppResult<FollowEdge>;
    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> AppResult<()>;
    async fn following(&self, user_id: i64) -> AppResult<Vec<UserSummary>>;
    async fn followers(&self, user_id: i64) -> AppResult<Vec<UserSummary>>;
}

/// RepositoryState
///
/// The shared handle to the storage collaborator held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Cascade Rules ---

/// Entity
///
/// Every persisted table the cascade rules talk about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Post,
    Comment,
    PostLike,
    CommentLike,
    Follow,
}

impl Entity {
    pub fn table(self) -> &'static str {
        match self {
            Entity::User => "users",
            Entity::Post => "posts",
            Entity::Comment => "comments",
            Entity::PostLike => "post_likes",
            Entity::CommentLike => "comment_likes",
            Entity::Follow => "follows",
        }
    }

    /// For like tables: the counter table and the column pointing at it.
    pub fn like_counter(self) -> Option<(&'static str, &'static str)> {
        match self {
            Entity::PostLike => Some(("posts", "post_id")),
            Entity::CommentLike => Some(("comments", "comment_id")),
            _ => None,
        }
    }

    /// Rules whose parent is `self`, in the order they must run.
    pub fn dependents(self) -> impl Iterator<Item = &'static CascadeRule> {
        CASCADE_RULES.iter().filter(move |rule| rule.parent == self)
    }
}

/// CascadeRule
///
/// Deleting a `parent` row deletes every `child` row whose `column` references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeRule {
    pub parent: Entity,
    pub child: Entity,
    pub column: &'static str,
}

const fn rule(parent: Entity, child: Entity, column: &'static str) -> CascadeRule {
    CascadeRule {
        parent,
        child,
        column,
    }
}

/// The explicit cascade table both repositories execute. The schema's
/// `ON DELETE CASCADE` clauses mirror it but are never relied upon.
pub const CASCADE_RULES: &[CascadeRule] = &[
    rule(Entity::User, Entity::Post, "author_id"),
    rule(Entity::User, Entity::Comment, "author_id"),
    rule(Entity::User, Entity::PostLike, "user_id"),
    rule(Entity::User, Entity::CommentLike, "user_id"),
    rule(Entity::User, Entity::Follow, "follower_id"),
    rule(Entity::User, Entity::Follow, "followed_id"),
    rule(Entity::Post, Entity::Comment, "post_id"),
    rule(Entity::Post, Entity::PostLike, "post_id"),
    rule(Entity::Comment, Entity::CommentLike, "comment_id"),
];

/// The like table backing a target.
pub(crate) fn like_entity(target: LikeTarget) -> Entity {
    match target {
        LikeTarget::Post(_) => Entity::PostLike,
        LikeTarget::Comment(_) => Entity::CommentLike,
    }
}
