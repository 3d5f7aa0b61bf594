use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

// Public vs. authenticated route sets.
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every handler and payload, served at `/api-docs/openapi.json`
/// and browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::list_posts, handlers::list_posts_by_tag, handlers::get_post,
        handlers::list_comments, handlers::get_me, handlers::update_me, handlers::delete_me,
        handlers::get_my_posts, handlers::list_users, handlers::get_user, handlers::create_post,
        handlers::update_post, handlers::delete_post, handlers::like_post, handlers::unlike_post,
        handlers::create_comment, handlers::update_comment, handlers::delete_comment,
        handlers::like_comment, handlers::unlike_comment, handlers::follow_user,
        handlers::unfollow_user, handlers::list_following, handlers::list_followers
    ),
    components(
        schemas(
            models::Role, models::Tag, models::User, models::UserSummary, models::Post,
            models::Comment, models::FollowEdge, models::CreatePostRequest,
            models::UpdatePostRequest, models::CommentRequest, models::UpdateUserRequest,
            models::LikeStatus, models::Detail,
        )
    ),
    tags(
        (name = "blog-backend", description = "Blog API: posts, comments, likes and follows")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Storage collaborator (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router: extracting `AuthUser` rejects anonymous or invalid
/// credentials with the error's own response before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the auth layer on the authenticated set, and the request-id,
/// tracing and CORS layers around everything.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Same paths as the public set with other methods are merged per method, so the
        // layer below only covers the authenticated ones.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, URI and the `x-request-id` set by the layer above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
