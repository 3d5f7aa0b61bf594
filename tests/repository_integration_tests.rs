use blog_backend::{
    AppError,
    models::{CreatePostRequest, LikeTarget, Post, Role, Tag, UpdatePostRequest, User},
    policy::visibility::{CommentScope, PostQuery},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::test;

// --- Test Context and Setup ---

/// Holds the pool of the database the suite runs against.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

static SEQ: AtomicU32 = AtomicU32::new(0);

/// Inserts a user directly; account creation is not part of the repository surface.
async fn create_test_user(pool: &PgPool, role: Role) -> User {
    let n = SEQ.fetch_add(1, Ordering::SeqCst);
    let stamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let email = format!("{role}-{stamp}-{n}@test.dev");

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, role)
        VALUES ($1, $2, $3)
        RETURNING id, username, email, role, bio, job_description, created_at
        "#,
    )
    .bind(format!("{role}{n}"))
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("Failed to create test user")
}

async fn create_test_post(repo: &PostgresRepository, author: &User, published: bool) -> Post {
    repo.create_post(
        author.id,
        CreatePostRequest {
            title: "Integration".to_string(),
            content: "Body".to_string(),
            tag: Some(Tag::HealthAndWellness),
            published,
            ..Default::default()
        },
    )
    .await
    .expect("Failed to create test post")
}

// --- Tests ---

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_post_roundtrip_and_partial_update() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, Role::Author).await;

    let post = create_test_post(&repo, &author, false).await;
    assert_eq!(post.tag, Some(Tag::HealthAndWellness));
    assert_eq!(post.likes_count, 0);

    let updated = repo
        .update_post(
            post.id,
            UpdatePostRequest {
                published: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("post exists");
    assert!(updated.published);
    assert_eq!(updated.title, post.title);
    assert!(updated.updated_at >= post.updated_at);
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_list_posts_filters() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, Role::Author).await;
    create_test_post(&repo, &author, true).await;
    create_test_post(&repo, &author, false).await;

    let published = repo
        .list_posts(&PostQuery {
            published_only: true,
            author_id: Some(author.id),
            tag: Some(Tag::HealthAndWellness),
        })
        .await
        .unwrap();
    assert_eq!(published.len(), 1);

    let own = repo.list_posts(&PostQuery::owned_by(author.id)).await.unwrap();
    assert_eq!(own.len(), 2);
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_like_counter_moves_with_rows() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, Role::Author).await;
    let reader = create_test_user(&ctx.pool, Role::Reader).await;
    let post = create_test_post(&repo, &author, true).await;
    let target = LikeTarget::Post(post.id);

    assert_eq!(repo.add_like(target, reader.id).await.unwrap(), 1);

    // The unique constraint answers a duplicate even without the service pre-check.
    let duplicate = repo.add_like(target, reader.id).await;
    assert!(matches!(duplicate, Err(AppError::DuplicateLike { .. })));
    assert_eq!(repo.get_post(post.id).await.unwrap().unwrap().likes_count, 1);

    assert_eq!(repo.remove_like(target, reader.id).await.unwrap(), 0);
    assert!(matches!(
        repo.remove_like(target, reader.id).await,
        Err(AppError::LikeNotFound { .. })
    ));
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_follow_constraints() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let a = create_test_user(&ctx.pool, Role::Reader).await;
    let b = create_test_user(&ctx.pool, Role::Author).await;

    repo.follow(a.id, b.id).await.unwrap();
    assert!(matches!(
        repo.follow(a.id, b.id).await,
        Err(AppError::AlreadyFollowing { .. })
    ));
    assert!(matches!(
        repo.follow(a.id, a.id).await,
        Err(AppError::Validation(_))
    ));

    let followers = repo.followers(b.id).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, a.id);

    repo.unfollow(a.id, b.id).await.unwrap();
    assert!(matches!(
        repo.unfollow(a.id, b.id).await,
        Err(AppError::NotFollowing { .. })
    ));
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_delete_user_cascades_and_fixes_counters() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, Role::Author).await;
    let reader = create_test_user(&ctx.pool, Role::Reader).await;
    let post = create_test_post(&repo, &author, true).await;

    let comment = repo
        .create_comment(post.id, reader.id, "hi".to_string())
        .await
        .unwrap();
    repo.add_like(LikeTarget::Post(post.id), reader.id).await.unwrap();
    repo.add_like(LikeTarget::Comment(comment.id), author.id).await.unwrap();
    repo.follow(reader.id, author.id).await.unwrap();

    assert!(repo.delete_user(reader.id).await.unwrap());

    assert!(repo.get_comment(comment.id).await.unwrap().is_none());
    assert_eq!(repo.get_post(post.id).await.unwrap().unwrap().likes_count, 0);
    assert!(repo.followers(author.id).await.unwrap().is_empty());

    assert!(repo.delete_post(post.id).await.unwrap());
    assert!(repo
        .list_comments(post.id, CommentScope::All)
        .await
        .unwrap()
        .is_empty());
    assert!(!repo.delete_post(post.id).await.unwrap());
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_missing_parents_are_not_found() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let reader = create_test_user(&ctx.pool, Role::Reader).await;

    assert!(matches!(
        repo.create_comment(i64::MAX, reader.id, "lost".to_string()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        repo.create_post(i64::MAX, CreatePostRequest::default()).await,
        Err(AppError::NotFound(_))
    ));
}
