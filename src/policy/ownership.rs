//! Ownership evaluation. Anonymous callers own nothing and are never admin.

use super::Principal;
use crate::models::Role;

pub fn owns(viewer: Option<&Principal>, owner_id: i64) -> bool {
    viewer.is_some_and(|p| p.id == owner_id)
}

pub fn is_admin(viewer: Option<&Principal>) -> bool {
    viewer.is_some_and(|p| p.role == Role::Admin)
}

pub fn owns_or_admin(viewer: Option<&Principal>, owner_id: i64) -> bool {
    owns(viewer, owner_id) || is_admin(viewer)
}
