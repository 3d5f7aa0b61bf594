use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CascadeRule, Entity, Repository, like_entity};
use crate::{
    error::{AppError, AppResult, ResourceRef},
    models::{
        Comment, CreatePostRequest, FollowEdge, Like, LikeTarget, Post, Role, UpdatePostRequest,
        UpdateUserRequest, User, UserSummary,
    },
    policy::visibility::{CommentScope, PostQuery},
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    post_likes: BTreeMap<i64, Like>,
    comment_likes: BTreeMap<i64, Like>,
    follows: BTreeMap<i64, FollowEdge>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn likes(&self, target: LikeTarget) -> &BTreeMap<i64, Like> {
        match target {
            LikeTarget::Post(_) => &self.post_likes,
            LikeTarget::Comment(_) => &self.comment_likes,
        }
    }

    fn likes_mut(&mut self, target: LikeTarget) -> &mut BTreeMap<i64, Like> {
        match target {
            LikeTarget::Post(_) => &mut self.post_likes,
            LikeTarget::Comment(_) => &mut self.comment_likes,
        }
    }

    fn counter_mut(&mut self, target: LikeTarget) -> Option<&mut i64> {
        match target {
            LikeTarget::Post(id) => self.posts.get_mut(&id).map(|p| &mut p.likes_count),
            LikeTarget::Comment(id) => self.comments.get_mut(&id).map(|c| &mut c.likes_count),
        }
    }

    fn find_like(&self, target: LikeTarget, user_id: i64) -> Option<i64> {
        self.likes(target)
            .values()
            .find(|like| like.target_id == target.id() && like.user_id == user_id)
            .map(|like| like.id)
    }

    fn find_follow(&self, follower_id: i64, followed_id: i64) -> Option<i64> {
        self.follows
            .values()
            .find(|edge| edge.follower_id == follower_id && edge.followed_id == followed_id)
            .map(|edge| edge.id)
    }

    /// Ids of `rule.child` rows whose `rule.column` points into `parents`.
    fn referencing(&self, rule: &CascadeRule, parents: &[i64]) -> Vec<i64> {
        fn pick<T>(rows: &BTreeMap<i64, T>, parents: &[i64], key: impl Fn(&T) -> i64) -> Vec<i64> {
            rows.iter()
                .filter(|(_, row)| parents.contains(&key(row)))
                .map(|(id, _)| *id)
                .collect()
        }

        match (rule.child, rule.column) {
            (Entity::Post, "author_id") => pick(&self.posts, parents, |p| p.author_id),
            (Entity::Comment, "author_id") => pick(&self.comments, parents, |c| c.author_id),
            (Entity::Comment, "post_id") => pick(&self.comments, parents, |c| c.post_id),
            (Entity::PostLike, "user_id") => pick(&self.post_likes, parents, |l| l.user_id),
            (Entity::PostLike, "post_id") => pick(&self.post_likes, parents, |l| l.target_id),
            (Entity::CommentLike, "user_id") => pick(&self.comment_likes, parents, |l| l.user_id),
            (Entity::CommentLike, "comment_id") => {
                pick(&self.comment_likes, parents, |l| l.target_id)
            }
            (Entity::Follow, "follower_id") => pick(&self.follows, parents, |f| f.follower_id),
            (Entity::Follow, "followed_id") => pick(&self.follows, parents, |f| f.followed_id),
            _ => Vec::new(),
        }
    }

    /// Same walk as the Postgres repository: dependents first, like counters fixed up
    /// as their rows go, then the rows themselves.
    fn cascade_delete(&mut self, entity: Entity, ids: &[i64]) -> u64 {
        if ids.is_empty() {
            return 0;
        }

        for rule in entity.dependents() {
            let child_ids = self.referencing(rule, ids);
            self.cascade_delete(rule.child, &child_ids);
        }

        let mut deleted = 0;
        for id in ids {
            let removed = match entity {
                Entity::User => self.users.remove(id).is_some(),
                Entity::Post => self.posts.remove(id).is_some(),
                Entity::Comment => self.comments.remove(id).is_some(),
                Entity::PostLike | Entity::CommentLike => {
                    let likes = if entity == Entity::PostLike {
                        &mut self.post_likes
                    } else {
                        &mut self.comment_likes
                    };
                    match likes.remove(id) {
                        Some(like) => {
                            let target = if entity == Entity::PostLike {
                                LikeTarget::Post(like.target_id)
                            } else {
                                LikeTarget::Comment(like.target_id)
                            };
                            if let Some(count) = self.counter_mut(target) {
                                *count -= 1;
                            }
                            true
                        }
                        None => false,
                    }
                }
                Entity::Follow => self.follows.remove(id).is_some(),
            };
            if removed {
                deleted += 1;
            }
        }

        tracing::debug!(table = entity.table(), rows = deleted, "cascade delete");
        deleted
    }
}

/// InMemoryRepository
///
/// A process-local `Repository` used by the test-suite and local experiments. All tables
/// sit behind a single `RwLock`, so each write is atomic and uniqueness checks made under
/// the write guard cannot race.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    fail_writes: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every write fails with a storage error; reads still work.
    pub fn failing() -> Self {
        Self {
            tables: RwLock::default(),
            fail_writes: true,
        }
    }

    /// Registers a user directly. Account creation belongs to the external auth provider,
    /// so this is the only way rows enter `users`.
    pub async fn insert_user(&self, username: &str, email: &str, role: Role) -> User {
        let mut tables = self.tables.write().await;
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            email: email.to_string(),
            role,
            bio: None,
            job_description: None,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        user
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Storage(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().map(UserSummary::from).collect())
    }

    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> AppResult<Option<User>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = req.username {
            user.username = username;
        }
        if let Some(bio) = req.bio {
            user.bio = Some(bio);
        }
        if let Some(job_description) = req.job_description {
            user.job_description = Some(job_description);
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables.cascade_delete(Entity::User, &[id]) > 0)
    }

    // --- POSTS ---

    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| query.matches(post))
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn create_post(&self, author_id: i64, req: CreatePostRequest) -> AppResult<Post> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&author_id) {
            return Err(AppError::NotFound(ResourceRef::User(author_id)));
        }
        let now = Utc::now();
        let post = Post {
            id: tables.next_id(),
            author_id,
            title: req.title,
            content: req.content,
            tag: req.tag,
            published: req.published,
            published_at: req.published_at,
            likes_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> AppResult<Option<Post>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(content) = req.content {
            post.content = content;
        }
        if let Some(tag) = req.tag {
            post.tag = Some(tag);
        }
        if let Some(published) = req.published {
            post.published = published;
        }
        if let Some(published_at) = req.published_at {
            post.published_at = Some(published_at);
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> AppResult<bool> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables.cascade_delete(Entity::Post, &[id]) > 0)
    }

    // --- COMMENTS ---

    async fn get_comment(&self, id: i64) -> AppResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, post_id: i64, scope: CommentScope) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| scope.matches(post_id, comment))
            .cloned()
            .collect();
        comments.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        content: String,
    ) -> AppResult<Comment> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(AppError::NotFound(ResourceRef::Post(post_id)));
        }
        if !tables.users.contains_key(&author_id) {
            return Err(AppError::NotFound(ResourceRef::User(author_id)));
        }
        let comment = Comment {
            id: tables.next_id(),
            author_id,
            post_id,
            content,
            likes_count: 0,
            created_at: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, content: String) -> AppResult<Option<Comment>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.content = content;
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables.cascade_delete(Entity::Comment, &[id]) > 0)
    }

    // --- LIKES ---

    async fn has_like(&self, target: LikeTarget, user_id: i64) -> AppResult<bool> {
        Ok(self.tables.read().await.find_like(target, user_id).is_some())
    }

    async fn add_like(&self, target: LikeTarget, user_id: i64) -> AppResult<i64> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.counter_mut(target).is_none() {
            return Err(AppError::NotFound(target.resource()));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound(ResourceRef::User(user_id)));
        }
        if tables.find_like(target, user_id).is_some() {
            return Err(AppError::DuplicateLike { target, user_id });
        }

        let like = Like {
            id: tables.next_id(),
            target_id: target.id(),
            user_id,
            created_at: Utc::now(),
        };
        tables.likes_mut(target).insert(like.id, like);

        let count = tables
            .counter_mut(target)
            .ok_or(AppError::NotFound(target.resource()))?;
        *count += 1;
        tracing::debug!(table = like_entity(target).table(), %target, "like stored");
        Ok(*count)
    }

    async fn remove_like(&self, target: LikeTarget, user_id: i64) -> AppResult<i64> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(like_id) = tables.find_like(target, user_id) else {
            return Err(AppError::LikeNotFound { target, user_id });
        };
        tables.likes_mut(target).remove(&like_id);

        let count = tables
            .counter_mut(target)
            .ok_or(AppError::NotFound(target.resource()))?;
        *count -= 1;
        Ok(*count)
    }

    // --- FOLLOWS ---

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.find_follow(follower_id, followed_id).is_some())
    }

    async fn follow(&self, follower_id: i64, followed_id: i64) -> AppResult<FollowEdge> {
        self.check_writable()?;
        if follower_id == followed_id {
            return Err(AppError::Validation("users cannot follow themselves".to_string()));
        }
        let mut tables = self.tables.write().await;
        for id in [follower_id, followed_id] {
            if !tables.users.contains_key(&id) {
                return Err(AppError::NotFound(ResourceRef::User(id)));
            }
        }
        if tables.find_follow(follower_id, followed_id).is_some() {
            return Err(AppError::AlreadyFollowing {
                follower_id,
                followed_id,
            });
        }

        let edge = FollowEdge {
            id: tables.next_id(),
            follower_id,
            followed_id,
            created_at: Utc::now(),
        };
        tables.follows.insert(edge.id, edge.clone());
        Ok(edge)
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> AppResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(edge_id) = tables.find_follow(follower_id, followed_id) else {
            return Err(AppError::NotFollowing {
                follower_id,
                followed_id,
            });
        };
        tables.follows.remove(&edge_id);
        Ok(())
    }

    async fn following(&self, user_id: i64) -> AppResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|edge| edge.follower_id == user_id)
            .filter_map(|edge| tables.users.get(&edge.followed_id))
            .map(UserSummary::from)
            .collect())
    }

    async fn followers(&self, user_id: i64) -> AppResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|edge| edge.followed_id == user_id)
            .filter_map(|edge| tables.users.get(&edge.follower_id))
            .map(UserSummary::from)
            .collect())
    }
}
