//! Read-side rules: which posts, comments and follow edges a caller may see.
//!
//! Listing rules are expressed as query values ([`PostQuery`], [`CommentScope`]) so the
//! storage layer can push them down into SQL, while `matches` keeps the same predicate
//! available for in-process filtering.

use super::{
    Operation, Principal,
    ownership::{is_admin, owns_or_admin},
};
use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{Comment, Post, Tag},
};

/// PostQuery
///
/// The post filter a listing resolves to after the caller's rights are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostQuery {
    pub published_only: bool,
    pub author_id: Option<i64>,
    pub tag: Option<Tag>,
}

impl PostQuery {
    /// Every post of `author_id`, drafts included.
    pub fn owned_by(author_id: i64) -> Self {
        Self {
            published_only: false,
            author_id: Some(author_id),
            tag: None,
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        (!self.published_only || post.published)
            && self.author_id.is_none_or(|id| post.author_id == id)
            && self.tag.is_none_or(|tag| post.tag == Some(tag))
    }
}

/// Browse/tag listing: admins see drafts, everyone else only published posts.
pub fn post_listing(viewer: Option<&Principal>, author_id: Option<i64>, tag: Option<Tag>) -> PostQuery {
    PostQuery {
        published_only: !is_admin(viewer),
        author_id,
        tag,
    }
}

pub fn can_view_post(viewer: Option<&Principal>, post: &Post) -> bool {
    post.published || owns_or_admin(viewer, post.author_id)
}

/// Single-post read. Drafts are refused as `Unauthenticated` for anonymous callers and
/// `Forbidden` for anyone else who is neither author nor admin.
pub fn check_post_readable(viewer: Option<&Principal>, post: &Post) -> AppResult<()> {
    if can_view_post(viewer, post) {
        return Ok(());
    }
    match viewer {
        None => Err(AppError::Unauthenticated(Some(Operation::ReadPost))),
        Some(_) => Err(AppError::forbidden(Operation::ReadPost, ResourceRef::Post(post.id))),
    }
}

/// CommentScope
///
/// Which comments of a post a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentScope {
    ByAuthor(i64),
    All,
    Own(i64),
}

impl CommentScope {
    pub fn author_filter(self) -> Option<i64> {
        match self {
            CommentScope::ByAuthor(id) | CommentScope::Own(id) => Some(id),
            CommentScope::All => None,
        }
    }

    pub fn matches(self, post_id: i64, comment: &Comment) -> bool {
        comment.post_id == post_id && self.author_filter().is_none_or(|id| comment.author_id == id)
    }
}

/// Precedence: explicit author filter, then `include_all`, then the caller's own comments.
pub fn comment_scope(
    viewer: Option<&Principal>,
    author_id: Option<i64>,
    include_all: bool,
) -> AppResult<CommentScope> {
    if let Some(author_id) = author_id {
        return Ok(CommentScope::ByAuthor(author_id));
    }
    if include_all {
        return Ok(CommentScope::All);
    }
    viewer
        .map(|p| CommentScope::Own(p.id))
        .ok_or(AppError::Unauthenticated(Some(Operation::ListComments)))
}

/// Whose follow graph a `following`/`followers` listing reads.
pub fn follow_subject(
    operation: Operation,
    viewer: Option<&Principal>,
    alt_user: Option<i64>,
) -> AppResult<i64> {
    let principal = super::require_principal(operation, viewer)?;
    Ok(alt_user.unwrap_or(principal.id))
}

/// Post and comment listings report an empty visible set as `NotFound`.
pub fn non_empty<T>(items: Vec<T>, resource: ResourceRef) -> AppResult<Vec<T>> {
    if items.is_empty() {
        return Err(AppError::NotFound(resource));
    }
    Ok(items)
}
