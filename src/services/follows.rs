use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{FollowEdge, UserSummary},
    policy::{Operation, Principal, guard, require_principal, uniqueness, visibility},
    repository::Repository,
};

/// FollowService
///
/// The directed follow graph between users.
pub struct FollowService<'a> {
    repo: &'a dyn Repository,
    viewer: Option<&'a Principal>,
}

impl<'a> FollowService<'a> {
    pub fn new(repo: &'a dyn Repository, viewer: Option<&'a Principal>) -> Self {
        Self { repo, viewer }
    }

    pub async fn follow(&self, target_id: i64) -> AppResult<FollowEdge> {
        let principal = require_principal(Operation::Follow, self.viewer)?;
        guard::ensure_not_self_follow(principal, target_id)?;
        self.ensure_user_exists(target_id).await?;
        uniqueness::ensure_not_following(self.repo, principal.id, target_id).await?;

        let edge = self.repo.follow(principal.id, target_id).await?;
        tracing::info!(follower_id = principal.id, followed_id = target_id, "follow added");
        Ok(edge)
    }

    pub async fn unfollow(&self, target_id: i64) -> AppResult<()> {
        let principal = require_principal(Operation::Unfollow, self.viewer)?;
        self.ensure_user_exists(target_id).await?;
        uniqueness::ensure_following(self.repo, principal.id, target_id).await?;

        self.repo.unfollow(principal.id, target_id).await?;
        tracing::info!(follower_id = principal.id, followed_id = target_id, "follow removed");
        Ok(())
    }

    /// Users followed by `alt_user`, or by the caller when absent. Empty is `[]`, including
    /// for an `alt_user` that names no account.
    pub async fn following(&self, alt_user: Option<i64>) -> AppResult<Vec<UserSummary>> {
        let subject = visibility::follow_subject(Operation::ListFollowing, self.viewer, alt_user)?;
        self.repo.following(subject).await
    }

    pub async fn followers(&self, alt_user: Option<i64>) -> AppResult<Vec<UserSummary>> {
        let subject = visibility::follow_subject(Operation::ListFollowers, self.viewer, alt_user)?;
        self.repo.followers(subject).await
    }

    async fn ensure_user_exists(&self, id: i64) -> AppResult<()> {
        match self.repo.get_user(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(ResourceRef::User(id))),
        }
    }
}
