use std::{future::Future, pin::Pin};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, error::ErrorKind, query_builder::QueryBuilder};

use super::{Entity, Repository, like_entity};
use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{
        Comment, CreatePostRequest, FollowEdge, LikeTarget, Post, UpdatePostRequest,
        UpdateUserRequest, User, UserSummary,
    },
    policy::visibility::{CommentScope, PostQuery},
};

const USER_COLUMNS: &str = "id, username, email, role, bio, job_description, created_at";
const POST_COLUMNS: &str = "id, author_id, title, content, tag, published, published_at, \
                            likes_count, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, author_id, post_id, content, likes_count, created_at";
const FOLLOW_COLUMNS: &str = "id, follower_id, followed_id, created_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Every query is parameterized;
/// only table and column names from the static cascade table are ever formatted in.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The constraint a database error tripped, if any.
fn violation(e: &sqlx::Error) -> Option<ErrorKind> {
    match e {
        sqlx::Error::Database(db) => Some(db.kind()),
        _ => None,
    }
}

type CascadeFuture<'c> = Pin<Box<dyn Future<Output = Result<u64, sqlx::Error>> + Send + 'c>>;

/// cascade_delete
///
/// Deletes `ids` of `entity` after recursively deleting every dependent row named by
/// the cascade rules. Like rows give back their counts to the target's `likes_count`
/// before they go. Must run inside a transaction; returns the rows removed from `entity`.
fn cascade_delete<'c>(conn: &'c mut PgConnection, entity: Entity, ids: Vec<i64>) -> CascadeFuture<'c> {
    Box::pin(async move {
        if ids.is_empty() {
            return Ok(0);
        }

        for rule in entity.dependents() {
            let sql = format!(
                "SELECT id FROM {} WHERE {} = ANY($1)",
                rule.child.table(),
                rule.column
            );
            let child_ids = sqlx::query_scalar::<Postgres, i64>(&sql)
                .bind(ids.as_slice())
                .fetch_all(&mut *conn)
                .await?;
            cascade_delete(&mut *conn, rule.child, child_ids).await?;
        }

        if let Some((counter_table, fk)) = entity.like_counter() {
            let sql = format!(
                "UPDATE {counter_table} SET likes_count = {counter_table}.likes_count - l.n \
                 FROM (SELECT {fk} AS target_id, COUNT(*) AS n FROM {likes} \
                       WHERE id = ANY($1) GROUP BY {fk}) AS l \
                 WHERE {counter_table}.id = l.target_id",
                likes = entity.table(),
            );
            sqlx::query(&sql).bind(ids.as_slice()).execute(&mut *conn).await?;
        }

        let sql = format!("DELETE FROM {} WHERE id = ANY($1)", entity.table());
        let deleted = sqlx::query(&sql)
            .bind(ids.as_slice())
            .execute(&mut *conn)
            .await?
            .rows_affected();

        tracing::debug!(table = entity.table(), rows = deleted, "cascade delete");
        Ok(deleted)
    })
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        Ok(sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email, role FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// update_user
    ///
    /// `COALESCE` keeps every column whose field is absent from the request.
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> AppResult<Option<User>> {
        let sql = format!(
            "UPDATE users \
             SET username = COALESCE($2, username), \
                 bio = COALESCE($3, bio), \
                 job_description = COALESCE($4, job_description) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(req.username)
            .bind(req.bio)
            .bind(req.job_description)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = cascade_delete(&mut *tx, Entity::User, vec![id]).await?;
        tx.commit().await?;
        Ok(deleted > 0)
    }

    // --- POSTS ---

    /// list_posts
    ///
    /// Builds the listing from the resolved `PostQuery` with `QueryBuilder` so every
    /// optional predicate stays a bound parameter.
    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE TRUE"));

        if query.published_only {
            builder.push(" AND published = TRUE");
        }
        if let Some(author_id) = query.author_id {
            builder.push(" AND author_id = ");
            builder.push_bind(author_id);
        }
        if let Some(tag) = query.tag {
            builder.push(" AND tag = ");
            builder.push_bind(tag);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        Ok(builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, author_id: i64, req: CreatePostRequest) -> AppResult<Post> {
        let sql = format!(
            "INSERT INTO posts (author_id, title, content, tag, published, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(author_id)
            .bind(req.title)
            .bind(req.content)
            .bind(req.tag)
            .bind(req.published)
            .bind(req.published_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match violation(&e) {
                Some(ErrorKind::ForeignKeyViolation) => {
                    AppError::NotFound(ResourceRef::User(author_id))
                }
                _ => e.into(),
            })
    }

    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> AppResult<Option<Post>> {
        let sql = format!(
            "UPDATE posts \
             SET title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 tag = COALESCE($4, tag), \
                 published = COALESCE($5, published), \
                 published_at = COALESCE($6, published_at), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.content)
            .bind(req.tag)
            .bind(req.published)
            .bind(req.published_at)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = cascade_delete(&mut *tx, Entity::Post, vec![id]).await?;
        tx.commit().await?;
        Ok(deleted > 0)
    }

    // --- COMMENTS ---

    async fn get_comment(&self, id: i64) -> AppResult<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_comments(&self, post_id: i64, scope: CommentScope) -> AppResult<Vec<Comment>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = "
        ));
        builder.push_bind(post_id);

        if let Some(author_id) = scope.author_filter() {
            builder.push(" AND author_id = ");
            builder.push_bind(author_id);
        }
        builder.push(" ORDER BY created_at ASC, id ASC");

        Ok(builder
            .build_query_as::<Comment>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        content: String,
    ) -> AppResult<Comment> {
        let sql = format!(
            "INSERT INTO comments (post_id, author_id, content) VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(author_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match violation(&e) {
                Some(ErrorKind::ForeignKeyViolation) => {
                    AppError::NotFound(ResourceRef::Post(post_id))
                }
                _ => e.into(),
            })
    }

    async fn update_comment(&self, id: i64, content: String) -> AppResult<Option<Comment>> {
        let sql = format!(
            "UPDATE comments SET content = $2 WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = cascade_delete(&mut *tx, Entity::Comment, vec![id]).await?;
        tx.commit().await?;
        Ok(deleted > 0)
    }

    // --- LIKES ---

    async fn has_like(&self, target: LikeTarget, user_id: i64) -> AppResult<bool> {
        let entity = like_entity(target);
        let Some((_, fk)) = entity.like_counter() else {
            return Ok(false);
        };
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {fk} = $1 AND user_id = $2)",
            entity.table()
        );
        Ok(sqlx::query_scalar::<_, bool>(&sql)
            .bind(target.id())
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// add_like
    ///
    /// Row insert and counter increment share one transaction. The unique constraint on
    /// `(target, user_id)` is the final word on duplicates: a violation rolls back and
    /// surfaces as `DuplicateLike`.
    async fn add_like(&self, target: LikeTarget, user_id: i64) -> AppResult<i64> {
        let entity = like_entity(target);
        let Some((counter_table, fk)) = entity.like_counter() else {
            return Err(AppError::NotFound(target.resource()));
        };

        let mut tx = self.pool.begin().await?;

        let insert = format!("INSERT INTO {} ({fk}, user_id) VALUES ($1, $2)", entity.table());
        sqlx::query(&insert)
            .bind(target.id())
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match violation(&e) {
                Some(ErrorKind::UniqueViolation) => AppError::DuplicateLike { target, user_id },
                Some(ErrorKind::ForeignKeyViolation) => AppError::NotFound(target.resource()),
                _ => e.into(),
            })?;

        let increment = format!(
            "UPDATE {counter_table} SET likes_count = likes_count + 1 WHERE id = $1 \
             RETURNING likes_count"
        );
        let likes_count = sqlx::query_scalar::<Postgres, i64>(&increment)
            .bind(target.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(likes_count)
    }

    async fn remove_like(&self, target: LikeTarget, user_id: i64) -> AppResult<i64> {
        let entity = like_entity(target);
        let Some((counter_table, fk)) = entity.like_counter() else {
            return Err(AppError::LikeNotFound { target, user_id });
        };

        let mut tx = self.pool.begin().await?;

        let delete = format!("DELETE FROM {} WHERE {fk} = $1 AND user_id = $2", entity.table());
        let removed = sqlx::query(&delete)
            .bind(target.id())
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(AppError::LikeNotFound { target, user_id });
        }

        let decrement = format!(
            "UPDATE {counter_table} SET likes_count = likes_count - 1 WHERE id = $1 \
             RETURNING likes_count"
        );
        let likes_count = sqlx::query_scalar::<Postgres, i64>(&decrement)
            .bind(target.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(likes_count)
    }

    // --- FOLLOWS ---

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> AppResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?)
    }

    /// follow
    ///
    /// `UNIQUE (follower_id, followed_id)` backs the application-level check; a racing
    /// duplicate insert is reported as `AlreadyFollowing`.
    async fn follow(&self, follower_id: i64, followed_id: i64) -> AppResult<FollowEdge> {
        let sql = format!(
            "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2) \
             RETURNING {FOLLOW_COLUMNS}"
        );
        sqlx::query_as::<_, FollowEdge>(&sql)
            .bind(follower_id)
            .bind(followed_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match violation(&e) {
                Some(ErrorKind::UniqueViolation) => AppError::AlreadyFollowing {
                    follower_id,
                    followed_id,
                },
                Some(ErrorKind::ForeignKeyViolation) => {
                    AppError::NotFound(ResourceRef::User(followed_id))
                }
                Some(ErrorKind::CheckViolation) => {
                    AppError::Validation("users cannot follow themselves".to_string())
                }
                _ => e.into(),
            })
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> AppResult<()> {
        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(AppError::NotFollowing {
                follower_id,
                followed_id,
            });
        }
        Ok(())
    }

    async fn following(&self, user_id: i64) -> AppResult<Vec<UserSummary>> {
        Ok(sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.email, u.role
            FROM users u
            JOIN follows f ON f.followed_id = u.id
            WHERE f.follower_id = $1
            ORDER BY f.created_at ASC, f.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn followers(&self, user_id: i64) -> AppResult<Vec<UserSummary>> {
        Ok(sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.email, u.role
            FROM users u
            JOIN follows f ON f.follower_id = u.id
            WHERE f.followed_id = $1
            ORDER BY f.created_at ASC, f.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
