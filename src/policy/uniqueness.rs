//! One like per (target, user); one follow edge per ordered (follower, followed) pair.
//!
//! These lookups produce the friendly domain error in the common case. The storage
//! layer's unique constraints stay authoritative: a racing insert that slips past
//! this check is translated to the same error by the repository.

use crate::{
    error::{AppError, AppResult},
    models::LikeTarget,
    repository::Repository,
};

pub async fn ensure_like_absent(
    repo: &dyn Repository,
    target: LikeTarget,
    user_id: i64,
) -> AppResult<()> {
    if repo.has_like(target, user_id).await? {
        return Err(AppError::DuplicateLike { target, user_id });
    }
    Ok(())
}

pub async fn ensure_like_present(
    repo: &dyn Repository,
    target: LikeTarget,
    user_id: i64,
) -> AppResult<()> {
    if !repo.has_like(target, user_id).await? {
        return Err(AppError::LikeNotFound { target, user_id });
    }
    Ok(())
}

pub async fn ensure_not_following(
    repo: &dyn Repository,
    follower_id: i64,
    followed_id: i64,
) -> AppResult<()> {
    if repo.is_following(follower_id, followed_id).await? {
        return Err(AppError::AlreadyFollowing {
            follower_id,
            followed_id,
        });
    }
    Ok(())
}

pub async fn ensure_following(
    repo: &dyn Repository,
    follower_id: i64,
    followed_id: i64,
) -> AppResult<()> {
    if !repo.is_following(follower_id, followed_id).await? {
        return Err(AppError::NotFollowing {
            follower_id,
            followed_id,
        });
    }
    Ok(())
}
