use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{UpdateUserRequest, User, UserSummary},
    policy::{Operation, Principal, require_principal},
    repository::Repository,
};

/// UserService
///
/// Profiles. Accounts are created by the external auth provider; callers may only
/// edit or delete their own.
pub struct UserService<'a> {
    repo: &'a dyn Repository,
    viewer: Option<&'a Principal>,
}

impl<'a> UserService<'a> {
    pub fn new(repo: &'a dyn Repository, viewer: Option<&'a Principal>) -> Self {
        Self { repo, viewer }
    }

    pub async fn list(&self) -> AppResult<Vec<UserSummary>> {
        require_principal(Operation::ListUsers, self.viewer)?;
        self.repo.list_users().await
    }

    pub async fn get(&self, id: i64) -> AppResult<User> {
        require_principal(Operation::ReadUser, self.viewer)?;
        self.repo
            .get_user(id)
            .await?
            .ok_or(AppError::NotFound(ResourceRef::User(id)))
    }

    /// The caller's own profile.
    pub async fn me(&self) -> AppResult<User> {
        let principal = require_principal(Operation::ReadUser, self.viewer)?;
        self.get(principal.id).await
    }

    pub async fn update_me(&self, req: UpdateUserRequest) -> AppResult<User> {
        req.validate()?;
        let principal = require_principal(Operation::UpdateAccount, self.viewer)?;

        let user = self
            .repo
            .update_user(principal.id, req)
            .await?
            .ok_or(AppError::NotFound(ResourceRef::User(principal.id)))?;
        tracing::info!(user_id = principal.id, "profile updated");
        Ok(user)
    }

    /// delete_me
    ///
    /// Self-delete only. Posts, comments, likes and follow edges in both directions
    /// are removed with the account.
    pub async fn delete_me(&self) -> AppResult<()> {
        let principal = require_principal(Operation::DeleteAccount, self.viewer)?;
        if !self.repo.delete_user(principal.id).await? {
            return Err(AppError::NotFound(ResourceRef::User(principal.id)));
        }
        tracing::info!(user_id = principal.id, "account deleted");
        Ok(())
    }
}
