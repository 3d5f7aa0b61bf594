use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{Comment, CommentRequest},
    policy::{Operation, Principal, authorize, guard, require_principal, visibility},
    repository::Repository,
};

use super::{load_comment, load_post};

/// CommentService
///
/// Comment threads under posts.
pub struct CommentService<'a> {
    repo: &'a dyn Repository,
    viewer: Option<&'a Principal>,
}

impl<'a> CommentService<'a> {
    pub fn new(repo: &'a dyn Repository, viewer: Option<&'a Principal>) -> Self {
        Self { repo, viewer }
    }

    /// list
    ///
    /// Scope precedence: `author_id`, then `include_all`, then the caller's own
    /// comments (which needs a caller). An empty result is `NotFound`.
    pub async fn list(
        &self,
        post_id: i64,
        author_id: Option<i64>,
        include_all: bool,
    ) -> AppResult<Vec<Comment>> {
        authorize(Operation::ListComments, self.viewer)?;
        let scope = visibility::comment_scope(self.viewer, author_id, include_all)?;
        load_post(self.repo, post_id).await?;

        let comments = self.repo.list_comments(post_id, scope).await?;
        visibility::non_empty(comments, ResourceRef::Comments)
    }

    pub async fn create(&self, post_id: i64, req: CommentRequest) -> AppResult<Comment> {
        req.validate()?;
        let principal = require_principal(Operation::CreateComment, self.viewer)?;
        load_post(self.repo, post_id).await?;

        let comment = self
            .repo
            .create_comment(post_id, principal.id, req.content)
            .await?;
        tracing::info!(comment_id = comment.id, post_id, user_id = principal.id, "comment created");
        Ok(comment)
    }

    pub async fn update(&self, id: i64, req: CommentRequest) -> AppResult<Comment> {
        req.validate()?;
        let principal = require_principal(Operation::UpdateComment, self.viewer)?;
        let comment = load_comment(self.repo, id).await?;
        guard::ensure_can_modify_comment(principal, &comment, Operation::UpdateComment)?;

        let updated = self
            .repo
            .update_comment(id, req.content)
            .await?
            .ok_or(AppError::NotFound(ResourceRef::Comment(id)))?;
        tracing::info!(comment_id = id, user_id = principal.id, "comment updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let principal = require_principal(Operation::DeleteComment, self.viewer)?;
        let comment = load_comment(self.repo, id).await?;
        guard::ensure_can_modify_comment(principal, &comment, Operation::DeleteComment)?;

        if !self.repo.delete_comment(id).await? {
            return Err(AppError::NotFound(ResourceRef::Comment(id)));
        }
        tracing::info!(comment_id = id, user_id = principal.id, "comment deleted");
        Ok(())
    }
}
