use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints. Handlers take `MaybeAuthUser`, so drafts are only ever returned
/// to their author or an admin, and the published gate is applied in the query itself.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe.
        .route("/health", get(handlers::health))
        // GET /posts?author_id=...
        .route("/posts", get(handlers::list_posts))
        // GET /posts/tag/{tag}
        // Tag values are parsed into the closed `Tag` set; anything else is a 400.
        .route("/posts/tag/{tag}", get(handlers::list_posts_by_tag))
        // GET /posts/{id}
        .route("/posts/{id}", get(handlers::get_post))
        // GET /posts/{id}/comments?author_id=...&include_all=...
        // The own-comments scope (no query) still needs a credential; the service says so.
        .route("/posts/{id}/comments", get(handlers::list_comments))
}
