//! Bundle content fetching.
//!
//! Fetching is delegated to a [`ContentFetcher`]. The [`UnpackCache`] sits in
//! front of it so a pass that resolves the same image again does not repeat
//! the fetch.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::extension::ObjectKey;

/// State reported by a content fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackState {
    Pending,
    Unpacking,
    Unpacked,
    Failed,
    /// A state this controller does not know how to handle
    Other(String),
}

impl UnpackState {
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => UnpackState::Pending,
            "Unpacking" => UnpackState::Unpacking,
            "Unpacked" => UnpackState::Unpacked,
            "Failed" => UnpackState::Failed,
            other => UnpackState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for UnpackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnpackState::Pending => f.write_str("Pending"),
            UnpackState::Unpacking => f.write_str("Unpacking"),
            UnpackState::Unpacked => f.write_str("Unpacked"),
            UnpackState::Failed => f.write_str("Failed"),
            UnpackState::Other(s) => f.write_str(s),
        }
    }
}

/// What to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSource {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnpackResult {
    pub state: UnpackState,
    /// Handle to the unpacked content, if any
    pub content: Option<String>,
    pub message: String,
    /// Image this result was produced for
    pub image: String,
}

impl UnpackResult {
    pub fn unpacked(image: impl Into<String>, content: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            state: UnpackState::Unpacked,
            content: Some(content.into()),
            message: message.into(),
            image: image.into(),
        }
    }

    pub fn with_state(image: impl Into<String>, state: UnpackState, message: impl Into<String>) -> Self {
        Self {
            state,
            content: None,
            message: message.into(),
            image: image.into(),
        }
    }
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, key: &ObjectKey, source: &BundleSource) -> Result<UnpackResult>;
}

/// Last unpack result per extension.
///
/// Only a shortcut around repeated fetches. Losing it, for example on
/// process restart, costs one extra fetch and never changes the outcome of
/// a pass. Entries are invalidated whenever a fetch errors or fails.
#[derive(Debug, Default)]
pub struct UnpackCache {
    entries: RwLock<HashMap<ObjectKey, UnpackResult>>,
}

impl UnpackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for this extension, if it was produced for `image`
    pub async fn get(&self, key: &ObjectKey, image: &str) -> Option<UnpackResult> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|r| r.image == image)
            .cloned()
    }

    pub async fn insert(&self, key: ObjectKey, result: UnpackResult) {
        self.entries.write().await.insert(key, result);
    }

    pub async fn invalidate(&self, key: &ObjectKey) {
        if self.entries.write().await.remove(key).is_some() {
            log::debug!("invalidated unpack cache entry for {}", key);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Fetcher returning preset results by image, reporting content unpacked
/// for any image without one
#[derive(Debug, Default)]
pub struct StaticContentFetcher {
    results: RwLock<HashMap<String, Result<UnpackResult>>>,
    calls: AtomicUsize,
}

impl StaticContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_result(&self, image: impl Into<String>, result: Result<UnpackResult>) {
        self.results.write().await.insert(image.into(), result);
    }

    /// Number of fetches performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for StaticContentFetcher {
    async fn fetch(&self, key: &ObjectKey, source: &BundleSource) -> Result<UnpackResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        log::debug!("fetching {} for {}", source.image, key);
        match self.results.read().await.get(&source.image) {
            Some(result) => result.clone(),
            None => Ok(UnpackResult::unpacked(
                &source.image,
                format!("content/{}", source.name),
                format!("unpacked {:?}", source.image),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;

    #[test]
    fn test_parse_state() {
        assert_eq!(UnpackState::parse("Pending"), UnpackState::Pending);
        assert_eq!(UnpackState::parse("Unpacked"), UnpackState::Unpacked);
        assert_eq!(UnpackState::parse("Exploded"), UnpackState::Other("Exploded".into()));
        assert_eq!(UnpackState::Other("Exploded".into()).to_string(), "Exploded");
    }

    #[tokio::test]
    async fn test_cache_keyed_by_image() {
        let cache = UnpackCache::new();
        let key = ObjectKey::new("ext");
        cache
            .insert(key.clone(), UnpackResult::unpacked("img:1", "c", "ok"))
            .await;
        assert!(cache.get(&key, "img:1").await.is_some());
        assert!(cache.get(&key, "img:2").await.is_none());

        cache.invalidate(&key).await;
        assert!(cache.get(&key, "img:1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticContentFetcher::new();
        fetcher
            .set_result("img:bad", Err(ControllerError::Unpack("registry down".into())))
            .await;
        let key = ObjectKey::new("ext");

        let ok = fetcher
            .fetch(
                &key,
                &BundleSource {
                    name: "b".into(),
                    image: "img:good".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(ok.state, UnpackState::Unpacked);

        let err = fetcher
            .fetch(
                &key,
                &BundleSource {
                    name: "b".into(),
                    image: "img:bad".into(),
                },
            )
            .await;
        assert!(err.is_err());
        assert_eq!(fetcher.calls(), 2);
    }
}
