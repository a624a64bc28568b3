//! Domain store facades and their in-memory implementations.
//!
//! Components reach these through the request context
//! (`ctx.service::<dyn BlogStore>()`), never through a global.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

use crate::security::{generate_token, hash_value};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type DataResult<T> = std::result::Result<T, DataError>;

// ── Posts ───────────────────────────────────────────────────────────

pub const POST_STATUS_DRAFT: &str = "draft";
pub const POST_STATUS_PUBLISHED: &str = "published";
pub const POST_STATUS_UNPUBLISHED: &str = "unpublished";
pub const POST_STATUS_TRASH: &str = "trash";

/// Stored value of an unset `published_at`.
pub const NULL_DATETIME: &str = "0000-00-00 00:00:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub status: String,
    pub image_url: String,
    pub featured: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC
    pub published_at: String,
    pub editor: String,
    pub memo: String,
    pub canonical_url: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub meta_robots: String,
}

impl Post {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            slug: slugify(title),
            summary: String::new(),
            content: String::new(),
            status: POST_STATUS_DRAFT.to_string(),
            image_url: String::new(),
            featured: "no".to_string(),
            published_at: NULL_DATETIME.to_string(),
            editor: "markdown".to_string(),
            memo: String::new(),
            canonical_url: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
            meta_robots: String::new(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == POST_STATUS_PUBLISHED
    }

    /// `published_at` for display, empty when unset.
    pub fn published_at_display(&self) -> &str {
        if self.published_at == NULL_DATETIME {
            ""
        } else {
            &self.published_at
        }
    }
}

pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub status: Option<String>,
    pub limit: usize,
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn post_find_by_id(&self, id: &str) -> DataResult<Option<Post>>;
    async fn post_update(&self, post: &Post) -> DataResult<()>;
    /// Newest `published_at` first.
    async fn post_list(&self, query: &PostQuery) -> DataResult<Vec<Post>>;
}

#[derive(Default)]
pub struct MemoryBlogStore {
    posts: RwLock<BTreeMap<String, Post>>,
    updates: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: Post) {
        self.posts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(post.id.clone(), post);
    }

    /// Number of successful `post_update` calls.
    #[cfg(test)]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make every call fail, as a lost database connection would.
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> DataResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DataError::Unavailable("blog database offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlogStore for MemoryBlogStore {
    async fn post_find_by_id(&self, id: &str) -> DataResult<Option<Post>> {
        self.check_online()?;
        Ok(self.posts.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned())
    }

    async fn post_update(&self, post: &Post) -> DataResult<()> {
        self.check_online()?;
        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
        match posts.get_mut(&post.id) {
            Some(stored) => {
                *stored = post.clone();
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(DataError::NotFound(post.id.clone())),
        }
    }

    async fn post_list(&self, query: &PostQuery) -> DataResult<Vec<Post>> {
        self.check_online()?;
        let posts = self.posts.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<Post> = posts
            .values()
            .filter(|p| query.status.as_deref().map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if query.limit > 0 {
            list.truncate(query.limit);
        }
        Ok(list)
    }
}

// ── Users ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_find_by_id(&self, id: &str) -> DataResult<Option<User>>;
    async fn user_update(&self, user: &User) -> DataResult<()>;
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn user_find_by_id(&self, id: &str) -> DataResult<Option<User>> {
        Ok(self.users.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned())
    }

    async fn user_update(&self, user: &User) -> DataResult<()> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(DataError::NotFound(user.id.clone())),
        }
    }
}

// ── Custom records ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRecord {
    pub id: String,
    pub record_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the new record id.
    async fn record_create(&self, record_type: &str, payload: serde_json::Value) -> DataResult<String>;
    async fn record_list(&self, record_type: &str) -> DataResult<Vec<CustomRecord>>;
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<CustomRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn record_create(&self, record_type: &str, payload: serde_json::Value) -> DataResult<String> {
        let record = CustomRecord {
            id: generate_token(12),
            record_type: record_type.to_string(),
            payload,
            created_at: Utc::now(),
        };
        let id = record.id.clone();
        self.records.write().unwrap_or_else(PoisonError::into_inner).push(record);
        Ok(id)
    }

    async fn record_list(&self, record_type: &str) -> DataResult<Vec<CustomRecord>> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.record_type == record_type)
            .cloned()
            .collect())
    }
}

// ── Image generation ────────────────────────────────────────────────

/// AI image collaborator used by the post editor.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the URL of a freshly generated image.
    async fn generate_image(&self, title: &str, summary: &str) -> anyhow::Result<String>;
}

/// Offline generator: points at a deterministic placeholder service.
pub struct PlaceholderImages {
    pub base_url: String,
}

impl Default for PlaceholderImages {
    fn default() -> Self {
        Self { base_url: "https://picsum.photos/seed".to_string() }
    }
}

#[async_trait]
impl ImageGenerator for PlaceholderImages {
    async fn generate_image(&self, title: &str, summary: &str) -> anyhow::Result<String> {
        if title.trim().is_empty() {
            anyhow::bail!("cannot generate an image for an untitled post");
        }
        let seed = hash_value(&format!("{}\n{}\n{}", title, summary, generate_token(8)));
        Ok(format!("{}/{}/1200/630", self.base_url, &seed[..16]))
    }
}
