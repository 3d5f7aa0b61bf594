use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    error::AppResult,
    models::{
        Comment, CommentRequest, CreatePostRequest, Detail, FollowEdge, LikeStatus, LikeTarget,
        Post, Tag, UpdatePostRequest, UpdateUserRequest, User, UserSummary,
    },
    services::{CommentService, FollowService, LikeService, PostService, UserService},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;

// --- Query Structs ---

/// PostListParams
///
/// Query parameters of `GET /posts`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct PostListParams {
    /// Only posts by this author.
    pub author_id: Option<i64>,
}

/// CommentListParams
///
/// Query parameters of `GET /posts/{id}/comments`. Without either filter the caller's own
/// comments are returned, which requires authentication.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct CommentListParams {
    /// Only comments by this author.
    pub author_id: Option<i64>,
    /// The whole thread.
    #[serde(default)]
    pub include_all: bool,
}

/// FollowListParams
///
/// Query parameters of the follow-graph listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct FollowListParams {
    /// Read this user's graph instead of the caller's.
    pub alt_user: Option<i64>,
}

// --- Public Handlers ---

/// health
///
/// Liveness probe for load balancers.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> &'static str {
    "ok"
}

/// list_posts
///
/// [Public Route] Browse posts. Anonymous and non-admin callers only see published posts.
#[utoipa::path(
    get,
    path = "/posts",
    params(PostListParams),
    responses(
        (status = 200, description = "Visible posts, newest first", body = [Post]),
        (status = 404, description = "No post matches")
    )
)]
pub async fn list_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    params: Result<Query<PostListParams>, QueryRejection>,
) -> AppResult<Json<Vec<Post>>> {
    let Query(params) = params?;
    let posts = PostService::new(state.repo.as_ref(), viewer.as_ref())
        .list(params.author_id)
        .await?;
    Ok(Json(posts))
}

/// list_posts_by_tag
///
/// [Public Route] Posts under one tag, gated like `list_posts`.
#[utoipa::path(
    get,
    path = "/posts/tag/{tag}",
    params(("tag" = String, Path, description = "entertainment | technology | health & wellness | lifestyle")),
    responses(
        (status = 200, description = "Visible posts with the tag", body = [Post]),
        (status = 400, description = "Unknown tag"),
        (status = 404, description = "No post matches")
    )
)]
pub async fn list_posts_by_tag(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> AppResult<Json<Vec<Post>>> {
    let tag: Tag = tag.parse()?;
    let posts = PostService::new(state.repo.as_ref(), viewer.as_ref())
        .list_by_tag(tag)
        .await?;
    Ok(Json(posts))
}

/// get_post
///
/// [Public Route] A single post. Drafts are only returned to their author and admins.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 401, description = "Draft requested anonymously"),
        (status = 403, description = "Draft of another author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Post>> {
    let post = PostService::new(state.repo.as_ref(), viewer.as_ref())
        .get(id)
        .await?;
    Ok(Json(post))
}

/// list_comments
///
/// [Public Route] Comments of a post, scoped by `author_id`, then `include_all`, then the
/// caller's own comments.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post id"), CommentListParams),
    responses(
        (status = 200, description = "Comments, oldest first", body = [Comment]),
        (status = 401, description = "Own-comments scope without credentials"),
        (status = 404, description = "Post not found or no comment matches")
    )
)]
pub async fn list_comments(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    params: Result<Query<CommentListParams>, QueryRejection>,
) -> AppResult<Json<Vec<Comment>>> {
    let Query(params) = params?;
    let comments = CommentService::new(state.repo.as_ref(), viewer.as_ref())
        .list(post_id, params.author_id, params.include_all)
        .await?;
    Ok(Json(comments))
}

// --- Account Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    let user = UserService::new(state.repo.as_ref(), Some(&principal)).me().await?;
    Ok(Json(user))
}

/// update_me
///
/// [Authenticated Route] Partial profile update. The role cannot be changed here.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn update_me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(payload) = payload?;
    let user = UserService::new(state.repo.as_ref(), Some(&principal))
        .update_me(payload)
        .await?;
    Ok(Json(user))
}

/// delete_me
///
/// [Authenticated Route] Deletes the caller's account with all of its content.
#[utoipa::path(
    delete,
    path = "/me",
    responses((status = 200, description = "Account deleted", body = Detail))
)]
pub async fn delete_me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Detail>> {
    UserService::new(state.repo.as_ref(), Some(&principal))
        .delete_me()
        .await?;
    Ok(Json(Detail::new(format!("user {} deleted", principal.id))))
}

/// get_my_posts
///
/// [Authenticated Route] Every post of the caller, drafts included. Authors and admins only.
#[utoipa::path(
    get,
    path = "/me/posts",
    responses(
        (status = 200, description = "My posts", body = [Post]),
        (status = 403, description = "Readers cannot publish"),
        (status = 404, description = "No posts yet")
    )
)]
pub async fn get_my_posts(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Post>>> {
    let posts = PostService::new(state.repo.as_ref(), Some(&principal))
        .own()
        .await?;
    Ok(Json(posts))
}

// --- User Handlers ---

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [UserSummary]))
)]
pub async fn list_users(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let users = UserService::new(state.repo.as_ref(), Some(&principal))
        .list()
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    let user = UserService::new(state.repo.as_ref(), Some(&principal))
        .get(id)
        .await?;
    Ok(Json(user))
}

// --- Post Handlers ---

/// create_post
///
/// [Authenticated Route] Authors and admins only. Admins may set `author_id` to publish
/// on behalf of another user.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 403, description = "Readers cannot publish"),
        (status = 404, description = "Named author not found")
    )
)]
pub async fn create_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let Json(payload) = payload?;
    let post = PostService::new(state.repo.as_ref(), Some(&principal))
        .create(payload)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Owner only. Absent fields keep their value.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> AppResult<Json<Post>> {
    let Json(payload) = payload?;
    let post = PostService::new(state.repo.as_ref(), Some(&principal))
        .update(id, payload)
        .await?;
    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Owner or admin.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = Detail),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Detail>> {
    PostService::new(state.repo.as_ref(), Some(&principal))
        .delete(id)
        .await?;
    Ok(Json(Detail::new(format!("post {id} deleted"))))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Liked", body = LikeStatus),
        (status = 409, description = "Already liked")
    )
)]
pub async fn like_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<LikeStatus>> {
    let status = LikeService::new(state.repo.as_ref(), Some(&principal))
        .like(LikeTarget::Post(id))
        .await?;
    Ok(Json(status))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}/like",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Like removed", body = LikeStatus),
        (status = 400, description = "Post was not liked")
    )
)]
pub async fn unlike_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<LikeStatus>> {
    let status = LikeService::new(state.repo.as_ref(), Some(&principal))
        .unlike(LikeTarget::Post(id))
        .await?;
    Ok(Json(status))
}

// --- Comment Handlers ---

#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let Json(payload) = payload?;
    let comment = CommentService::new(state.repo.as_ref(), Some(&principal))
        .create(post_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Authenticated Route] Owner only, no admin bypass.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn update_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> AppResult<Json<Comment>> {
    let Json(payload) = payload?;
    let comment = CommentService::new(state.repo.as_ref(), Some(&principal))
        .update(id, payload)
        .await?;
    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = Detail),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn delete_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Detail>> {
    CommentService::new(state.repo.as_ref(), Some(&principal))
        .delete(id)
        .await?;
    Ok(Json(Detail::new(format!("comment {id} deleted"))))
}

#[utoipa::path(
    post,
    path = "/comments/{id}/like",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Liked", body = LikeStatus),
        (status = 409, description = "Already liked")
    )
)]
pub async fn like_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<LikeStatus>> {
    let status = LikeService::new(state.repo.as_ref(), Some(&principal))
        .like(LikeTarget::Comment(id))
        .await?;
    Ok(Json(status))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}/like",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Like removed", body = LikeStatus),
        (status = 400, description = "Comment was not liked")
    )
)]
pub async fn unlike_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<LikeStatus>> {
    let status = LikeService::new(state.repo.as_ref(), Some(&principal))
        .unlike(LikeTarget::Comment(id))
        .await?;
    Ok(Json(status))
}

// --- Follow Handlers ---

/// follow_user
///
/// [Authenticated Route] Readers and authors only; self-follow is rejected.
#[utoipa::path(
    post,
    path = "/follows/{user_id}",
    params(("user_id" = i64, Path, description = "User to follow")),
    responses(
        (status = 201, description = "Now following", body = FollowEdge),
        (status = 400, description = "Self-follow"),
        (status = 403, description = "Admins cannot follow"),
        (status = 409, description = "Already following")
    )
)]
pub async fn follow_user(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<(StatusCode, Json<FollowEdge>)> {
    let edge = FollowService::new(state.repo.as_ref(), Some(&principal))
        .follow(user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

#[utoipa::path(
    delete,
    path = "/follows/{user_id}",
    params(("user_id" = i64, Path, description = "User to unfollow")),
    responses(
        (status = 200, description = "Unfollowed", body = Detail),
        (status = 400, description = "Not following")
    )
)]
pub async fn unfollow_user(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Detail>> {
    FollowService::new(state.repo.as_ref(), Some(&principal))
        .unfollow(user_id)
        .await?;
    Ok(Json(Detail::new(format!("unfollowed user {user_id}"))))
}

#[utoipa::path(
    get,
    path = "/follows/following",
    params(FollowListParams),
    responses((status = 200, description = "Users followed", body = [UserSummary]))
)]
pub async fn list_following(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    params: Result<Query<FollowListParams>, QueryRejection>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let Query(params) = params?;
    let users = FollowService::new(state.repo.as_ref(), Some(&principal))
        .following(params.alt_user)
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/follows/followers",
    params(FollowListParams),
    responses((status = 200, description = "Followers", body = [UserSummary]))
)]
pub async fn list_followers(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    params: Result<Query<FollowListParams>, QueryRejection>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let Query(params) = params?;
    let users = FollowService::new(state.repo.as_ref(), Some(&principal))
        .followers(params.alt_user)
        .await?;
    Ok(Json(users))
}
