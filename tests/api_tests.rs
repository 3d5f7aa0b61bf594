use blog_backend::{
    AppConfig, AppState, create_router,
    models::{Comment, LikeStatus, Post, Role, UserSummary},
    repository::{InMemoryRepository, RepositoryState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub admin_id: i64,
    pub author_id: i64,
    pub reader_id: i64,
}

async fn spawn_app() -> TestApp {
    let repo = InMemoryRepository::new();
    let admin = repo.insert_user("root", "root@blog.dev", Role::Admin).await;
    let author = repo.insert_user("ada", "ada@blog.dev", Role::Author).await;
    let reader = repo.insert_user("rita", "rita@blog.dev", Role::Reader).await;

    let state = AppState::new(Arc::new(repo) as RepositoryState, AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        admin_id: admin.id,
        author_id: author.id,
        reader_id: reader.id,
    }
}

#[tokio::test]
async fn test_health_check_carries_request_id() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/posts/{id}"].is_object());
    assert!(doc["paths"]["/follows/followers"].is_object());
}

#[tokio::test]
async fn test_authenticated_routes_reject_anonymous() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/posts", app.address))
        .json(&json!({ "title": "T", "content": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let response = client
        .get(format!("{}/me", app.address))
        .header("authorization", "Bearer not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let author = app.author_id.to_string();
    let reader = app.reader_id.to_string();

    // Admin drafts on behalf of the author.
    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-user-id", app.admin_id.to_string())
        .json(&json!({
            "title": "Rust at scale", "content": "...", "tag": "technology",
            "published": false, "author_id": app.author_id
        }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 201);
    let draft: Post = response.json().await.unwrap();
    assert_eq!(draft.author_id, app.author_id);

    // Hidden from the public listing and from the reader.
    let response = client
        .get(format!("{}/posts/tag/technology", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .get(format!("{}/posts/{}", app.address, draft.id))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The author publishes it.
    let response = client
        .put(format!("{}/posts/{}", app.address, draft.id))
        .header("x-user-id", &author)
        .json(&json!({ "published": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let posts: Vec<Post> = client
        .get(format!("{}/posts/tag/technology", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);

    // Like, comment, then the author deletes the post.
    let like: LikeStatus = client
        .post(format!("{}/posts/{}/like", app.address, draft.id))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(like.likes_count, 1);

    let response = client
        .post(format!("{}/posts/{}/like", app.address, draft.id))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let comment: Comment = client
        .post(format!("{}/posts/{}/comments", app.address, draft.id))
        .header("x-user-id", &reader)
        .json(&json!({ "content": "Great read" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let thread: Vec<Comment> = client
        .get(format!(
            "{}/posts/{}/comments?include_all=true",
            app.address, draft.id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].id, comment.id);

    let response = client
        .delete(format!("{}/posts/{}", app.address, draft.id))
        .header("x-user-id", &author)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/posts/{}/comments?include_all=true", app.address, draft.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_malformed_input_is_a_validation_error() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-user-id", app.author_id.to_string())
        .json(&json!({ "title": "t", "content": "c", "tag": "sports" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = client
        .put(format!("{}/me", app.address))
        .header("x-user-id", app.reader_id.to_string())
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = client
        .get(format!("{}/posts?author_id=abc", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_follow_graph() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let reader = app.reader_id.to_string();

    for expected in [201, 409] {
        let response = client
            .post(format!("{}/follows/{}", app.address, app.author_id))
            .header("x-user-id", &reader)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }

    let followers: Vec<UserSummary> = client
        .get(format!(
            "{}/follows/followers?alt_user={}",
            app.address, app.author_id
        ))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, app.reader_id);

    let response = client
        .post(format!("{}/follows/{}", app.address, app.reader_id))
        .header("x-user-id", &reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/follows/{}", app.address, app.author_id))
        .header("x-user-id", app.admin_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}
