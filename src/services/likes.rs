use crate::{
    error::AppResult,
    models::{LikeStatus, LikeTarget},
    policy::{Operation, Principal, require_principal, uniqueness},
    repository::Repository,
};

use super::{load_comment, load_post};

/// LikeService
///
/// Likes on posts and comments. The repository moves the target's counter together
/// with the like row, so the returned `likes_count` is always consistent.
pub struct LikeService<'a> {
    repo: &'a dyn Repository,
    viewer: Option<&'a Principal>,
}

impl<'a> LikeService<'a> {
    pub fn new(repo: &'a dyn Repository, viewer: Option<&'a Principal>) -> Self {
        Self { repo, viewer }
    }

    pub async fn like(&self, target: LikeTarget) -> AppResult<LikeStatus> {
        let operation = match target {
            LikeTarget::Post(_) => Operation::LikePost,
            LikeTarget::Comment(_) => Operation::LikeComment,
        };
        let principal = require_principal(operation, self.viewer)?;
        self.ensure_target_exists(target).await?;
        uniqueness::ensure_like_absent(self.repo, target, principal.id).await?;

        let likes_count = self.repo.add_like(target, principal.id).await?;
        tracing::info!(%target, user_id = principal.id, likes_count, "like added");
        Ok(LikeStatus {
            target_id: target.id(),
            likes_count,
        })
    }

    pub async fn unlike(&self, target: LikeTarget) -> AppResult<LikeStatus> {
        let operation = match target {
            LikeTarget::Post(_) => Operation::UnlikePost,
            LikeTarget::Comment(_) => Operation::UnlikeComment,
        };
        let principal = require_principal(operation, self.viewer)?;
        self.ensure_target_exists(target).await?;
        uniqueness::ensure_like_present(self.repo, target, principal.id).await?;

        let likes_count = self.repo.remove_like(target, principal.id).await?;
        tracing::info!(%target, user_id = principal.id, likes_count, "like removed");
        Ok(LikeStatus {
            target_id: target.id(),
            likes_count,
        })
    }

    async fn ensure_target_exists(&self, target: LikeTarget) -> AppResult<()> {
        match target {
            LikeTarget::Post(id) => load_post(self.repo, id).await.map(|_| ()),
            LikeTarget::Comment(id) => load_comment(self.repo, id).await.map(|_| ()),
        }
    }
}
