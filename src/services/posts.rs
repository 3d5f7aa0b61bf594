use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{CreatePostRequest, Post, Tag, UpdatePostRequest},
    policy::{
        Operation, Principal, authorize, guard, ownership, require_principal,
        visibility::{self, PostQuery},
    },
    repository::Repository,
};

use super::load_post;

/// PostService
///
/// Browse, read and mutate blog posts on behalf of one caller.
pub struct PostService<'a> {
    repo: &'a dyn Repository,
    viewer: Option<&'a Principal>,
}

impl<'a> PostService<'a> {
    pub fn new(repo: &'a dyn Repository, viewer: Option<&'a Principal>) -> Self {
        Self { repo, viewer }
    }

    /// Browse listing. Admins also see drafts; `author_id` narrows for everyone.
    pub async fn list(&self, author_id: Option<i64>) -> AppResult<Vec<Post>> {
        authorize(Operation::ListPosts, self.viewer)?;
        let query = visibility::post_listing(self.viewer, author_id, None);
        let posts = self.repo.list_posts(&query).await?;
        visibility::non_empty(posts, ResourceRef::Posts)
    }

    pub async fn list_by_tag(&self, tag: Tag) -> AppResult<Vec<Post>> {
        authorize(Operation::ListPostsByTag, self.viewer)?;
        let query = visibility::post_listing(self.viewer, None, Some(tag));
        let posts = self.repo.list_posts(&query).await?;
        visibility::non_empty(posts, ResourceRef::Posts)
    }

    pub async fn get(&self, id: i64) -> AppResult<Post> {
        authorize(Operation::ReadPost, self.viewer)?;
        let post = load_post(self.repo, id).await?;
        visibility::check_post_readable(self.viewer, &post)?;
        Ok(post)
    }

    /// The caller's own posts, drafts included.
    pub async fn own(&self) -> AppResult<Vec<Post>> {
        let principal = require_principal(Operation::ListOwnPosts, self.viewer)?;
        let posts = self.repo.list_posts(&PostQuery::owned_by(principal.id)).await?;
        visibility::non_empty(posts, ResourceRef::Posts)
    }

    /// create
    ///
    /// Only admins may name another owner through `author_id`; that user must exist.
    /// For everyone else the field is ignored and the caller owns the post.
    pub async fn create(&self, req: CreatePostRequest) -> AppResult<Post> {
        req.validate()?;
        let principal = require_principal(Operation::CreatePost, self.viewer)?;

        let owner = guard::post_owner(principal, req.author_id);
        if owner.delegated && self.repo.get_user(owner.owner_id).await?.is_none() {
            return Err(AppError::NotFound(ResourceRef::User(owner.owner_id)));
        }

        let post = self.repo.create_post(owner.owner_id, req).await?;
        tracing::info!(
            post_id = post.id,
            author_id = post.author_id,
            created_by = principal.id,
            "post created"
        );
        Ok(post)
    }

    pub async fn update(&self, id: i64, req: UpdatePostRequest) -> AppResult<Post> {
        req.validate()?;
        let principal = require_principal(Operation::UpdatePost, self.viewer)?;
        let post = load_post(self.repo, id).await?;
        guard::ensure_can_update_post(principal, &post)?;

        let updated = self
            .repo
            .update_post(id, req)
            .await?
            .ok_or(AppError::NotFound(ResourceRef::Post(id)))?;
        tracing::info!(post_id = id, user_id = principal.id, "post updated");
        Ok(updated)
    }

    /// Owner or admin. Comments and likes of the post go with it.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let principal = require_principal(Operation::DeletePost, self.viewer)?;
        let post = load_post(self.repo, id).await?;
        guard::ensure_can_delete_post(principal, &post)?;

        if !self.repo.delete_post(id).await? {
            return Err(AppError::NotFound(ResourceRef::Post(id)));
        }
        tracing::info!(
            post_id = id,
            user_id = principal.id,
            as_admin = ownership::is_admin(Some(principal)) && post.author_id != principal.id,
            "post deleted"
        );
        Ok(())
    }
}
