//! Write-side rules, evaluated after the operation's requirement has passed and before
//! anything reaches storage.

use super::{
    Operation, Principal,
    ownership::{owns, owns_or_admin},
};
use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{Comment, Post, Role},
};

/// OwnerAssignment
///
/// Who a new post will belong to. `delegated` means an admin named another user, whose
/// existence the caller must confirm before inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerAssignment {
    pub owner_id: i64,
    pub delegated: bool,
}

/// Admins may create on behalf of `requested`; everyone else always owns what they create.
pub fn post_owner(principal: &Principal, requested: Option<i64>) -> OwnerAssignment {
    match requested {
        Some(owner_id) if principal.role == Role::Admin => OwnerAssignment {
            owner_id,
            delegated: owner_id != principal.id,
        },
        _ => OwnerAssignment {
            owner_id: principal.id,
            delegated: false,
        },
    }
}

/// Owner only. Admins get no bypass here, unlike deletion.
pub fn ensure_can_update_post(principal: &Principal, post: &Post) -> AppResult<()> {
    if owns(Some(principal), post.author_id) {
        return Ok(());
    }
    deny(principal, Operation::UpdatePost, ResourceRef::Post(post.id))
}

pub fn ensure_can_delete_post(principal: &Principal, post: &Post) -> AppResult<()> {
    if owns_or_admin(Some(principal), post.author_id) {
        return Ok(());
    }
    deny(principal, Operation::DeletePost, ResourceRef::Post(post.id))
}

/// Comment edits and deletions are owner only.
pub fn ensure_can_modify_comment(
    principal: &Principal,
    comment: &Comment,
    operation: Operation,
) -> AppResult<()> {
    if owns(Some(principal), comment.author_id) {
        return Ok(());
    }
    deny(principal, operation, ResourceRef::Comment(comment.id))
}

pub fn ensure_not_self_follow(principal: &Principal, target_id: i64) -> AppResult<()> {
    if principal.id == target_id {
        return Err(AppError::Validation("users cannot follow themselves".to_string()));
    }
    Ok(())
}

fn deny(principal: &Principal, operation: Operation, resource: ResourceRef) -> AppResult<()> {
    tracing::warn!(user_id = principal.id, %operation, %resource, "mutation denied");
    Err(AppError::forbidden(operation, resource))
}
