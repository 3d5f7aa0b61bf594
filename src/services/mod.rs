//! One canonical service per entity.
//!
//! A service is built per request from the storage handle and the resolved caller
//! (`None` for anonymous). Every method runs the same pipeline: validate the input,
//! check the operation's requirement, load the target (`NotFound`), apply the
//! ownership/guard rules, check uniqueness, then hand the write to the repository.

pub mod comments;
pub mod follows;
pub mod likes;
pub mod posts;
pub mod users;

pub use comments::CommentService;
pub use follows::FollowService;
pub use likes::LikeService;
pub use posts::PostService;
pub use users::UserService;

use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{Comment, Post},
    repository::Repository,
};

/// Loads a post or fails with `NotFound`.
pub(crate) async fn load_post(repo: &dyn Repository, id: i64) -> AppResult<Post> {
    repo.get_post(id)
        .await?
        .ok_or(AppError::NotFound(ResourceRef::Post(id)))
}

/// Loads a comment or fails with `NotFound`.
pub(crate) async fn load_comment(repo: &dyn Repository, id: i64) -> AppResult<Comment> {
    repo.get_comment(id)
        .await?
        .ok_or(AppError::NotFound(ResourceRef::Comment(id)))
}
