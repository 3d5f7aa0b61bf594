use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `AuthUser` middleware, so anonymous requests are
/// turned away with 401 before a handler runs. Role and ownership rules are enforced in
/// the services, not here.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Account ---
        .route(
            "/me",
            get(handlers::get_me)
                .put(handlers::update_me)
                .delete(handlers::delete_me),
        )
        // GET /me/posts
        // Drafts included. Authors and admins only.
        .route("/me/posts", get(handlers::get_my_posts))
        .route("/users", get(handlers::list_users))
        .route("/users/{id}", get(handlers::get_user))
        // --- Posts ---
        .route("/posts", post(handlers::create_post))
        // PUT is owner only; DELETE is owner or admin.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        .route(
            "/posts/{id}/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        // --- Comments ---
        .route("/posts/{id}/comments", post(handlers::create_comment))
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route(
            "/comments/{id}/like",
            post(handlers::like_comment).delete(handlers::unlike_comment),
        )
        // --- Follow Graph ---
        // Readers and authors only; admins are refused with 403.
        .route(
            "/follows/{user_id}",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/follows/following", get(handlers::list_following))
        .route("/follows/followers", get(handlers::list_followers))
}
