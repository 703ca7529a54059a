use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::models::Post;
use crate::sample;

/// The social feed, newest entry first. Owned by whoever builds it and handed
/// to the code that needs it; readers get snapshots, writers go through the
/// methods below.
#[derive(Debug, Default)]
pub struct FeedStore {
    posts: RwLock<Vec<Post>>,
}

impl FeedStore {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: RwLock::new(posts),
        }
    }

    pub fn with_samples() -> Self {
        Self::new(sample::posts())
    }

    /// Reads the feed from `path`, or seeds it with the sample posts when the
    /// file does not exist yet.
    pub fn load_or_seed(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no saved feed, seeding samples");
            return Ok(Self::with_samples());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
        let posts: Vec<Post> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse feed file: {}", path.display()))?;
        Ok(Self::new(posts))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&*self.read()?)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write feed file: {}", path.display()))
    }

    pub fn posts(&self) -> Result<Vec<Post>> {
        Ok(self.read()?.clone())
    }

    /// Puts the post at the front of the feed.
    pub fn add(&self, post: Post) -> Result<()> {
        self.write()?.insert(0, post);
        Ok(())
    }

    pub fn by_author(&self, author_id: &str) -> Result<Vec<Post>> {
        Ok(self
            .read()?
            .iter()
            .filter(|p| p.author.id == author_id)
            .cloned()
            .collect())
    }

    pub fn toggle_like(&self, id: &str) -> Result<Post> {
        let mut posts = self.write()?;
        let slot = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("Post '{}' not found", id))?;
        let updated = slot.clone().toggle_like();
        *slot = updated.clone();
        Ok(updated)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Post>>> {
        self.posts.read().map_err(|_| anyhow!("Feed lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Post>>> {
        self.posts.write().map_err(|_| anyhow!("Feed lock poisoned"))
    }
}
