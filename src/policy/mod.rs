//! Access & visibility policy engine.
//!
//! Every operation the service exposes declares its minimum requirement once, in
//! [`Operation::requirement`]. Services call [`authorize`] or [`require_principal`]
//! before touching storage, then consult [`ownership`], [`visibility`], [`guard`] and
//! [`uniqueness`] for the resource-level rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::Role,
};

pub mod guard;
pub mod ownership;
pub mod uniqueness;
pub mod visibility;

/// Principal
///
/// The resolved identity behind a request. Absence (`None`) means anonymous access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

/// Requirement
///
/// Minimum caller identity an operation demands before any resource rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anonymous callers allowed.
    Public,
    /// Any authenticated principal.
    AnyPrincipal,
    /// An authenticated principal holding one of these roles.
    Roles(&'static [Role]),
}

const PUBLISHERS: &[Role] = &[Role::Admin, Role::Author];
const FOLLOWERS: &[Role] = &[Role::Reader, Role::Author];

/// Operation
///
/// Every entry point of the engine. Also used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPosts,
    ListPostsByTag,
    ReadPost,
    ListOwnPosts,
    CreatePost,
    UpdatePost,
    DeletePost,
    LikePost,
    UnlikePost,
    ListComments,
    CreateComment,
    UpdateComment,
    DeleteComment,
    LikeComment,
    UnlikeComment,
    Follow,
    Unfollow,
    ListFollowing,
    ListFollowers,
    ListUsers,
    ReadUser,
    UpdateAccount,
    DeleteAccount,
}

impl Operation {
    pub const fn requirement(self) -> Requirement {
        use Operation::*;
        match self {
            ListPosts | ListPostsByTag | ReadPost | ListComments => Requirement::Public,
            ListOwnPosts | CreatePost | DeletePost => Requirement::Roles(PUBLISHERS),
            Follow | Unfollow => Requirement::Roles(FOLLOWERS),
            UpdatePost | LikePost | UnlikePost | CreateComment | UpdateComment
            | DeleteComment | LikeComment | UnlikeComment | ListFollowing | ListFollowers
            | ListUsers | ReadUser | UpdateAccount | DeleteAccount => Requirement::AnyPrincipal,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operation::*;
        f.write_str(match self {
            ListPosts => "list posts",
            ListPostsByTag => "list posts by tag",
            ReadPost => "read post",
            ListOwnPosts => "list own posts",
            CreatePost => "create post",
            UpdatePost => "update post",
            DeletePost => "delete post",
            LikePost => "like post",
            UnlikePost => "unlike post",
            ListComments => "list comments",
            CreateComment => "create comment",
            UpdateComment => "update comment",
            DeleteComment => "delete comment",
            LikeComment => "like comment",
            UnlikeComment => "unlike comment",
            Follow => "follow user",
            Unfollow => "unfollow user",
            ListFollowing => "list following",
            ListFollowers => "list followers",
            ListUsers => "list users",
            ReadUser => "read user",
            UpdateAccount => "update account",
            DeleteAccount => "delete account",
        })
    }
}

/// Checks the operation's requirement against an optional principal.
pub fn authorize(operation: Operation, viewer: Option<&Principal>) -> AppResult<()> {
    match (operation.requirement(), viewer) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(AppError::Unauthenticated(Some(operation))),
        (Requirement::AnyPrincipal, Some(_)) => Ok(()),
        (Requirement::Roles(roles), Some(principal)) => {
            if roles.contains(&principal.role) {
                Ok(())
            } else {
                tracing::warn!(
                    user_id = principal.id,
                    role = %principal.role,
                    %operation,
                    "role not permitted"
                );
                Err(AppError::Forbidden {
                    operation,
                    resource: None,
                })
            }
        }
    }
}

/// Like [`authorize`], but also hands back the principal for operations that need one.
pub fn require_principal(
    operation: Operation,
    viewer: Option<&Principal>,
) -> AppResult<&Principal> {
    authorize(operation, viewer)?;
    viewer.ok_or(AppError::Unauthenticated(Some(operation)))
}
