//! Extension persistence.
//!
//! Status writes use optimistic concurrency: the writer passes the resource
//! version it read, and the write fails with [`ConflictError`] if the object
//! has changed since.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::conditions::Condition;
use crate::error::{ControllerError, Result};
use crate::extension::{ClusterExtension, ExtensionSpec, ExtensionStatus, ObjectKey};

/// The object changed between read and write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("conflict writing status of {key}: expected resource version {expected}, found {actual}")]
pub struct ConflictError {
    pub key: ObjectKey,
    pub expected: u64,
    pub actual: u64,
}

#[async_trait]
pub trait ExtensionStore: Send + Sync {
    /// Current object, or `None` if it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<ClusterExtension>>;

    async fn list(&self) -> Result<Vec<ClusterExtension>>;

    async fn read_conditions(&self, key: &ObjectKey) -> Result<Vec<Condition>>;

    /// Replace the status if the object is still at `expected_version`,
    /// returning the new resource version
    async fn write_status(&self, key: &ObjectKey, status: &ExtensionStatus, expected_version: u64) -> Result<u64>;
}

/// Store holding extensions in memory
#[derive(Debug, Default)]
pub struct InMemoryExtensionStore {
    objects: RwLock<BTreeMap<ObjectKey, ClusterExtension>>,
    status_writes: AtomicUsize,
}

impl InMemoryExtensionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace an object, bumping its resource version
    pub async fn insert(&self, mut extension: ClusterExtension) -> ObjectKey {
        let key = extension.key();
        let mut objects = self.objects.write().await;
        let previous = objects.get(&key).map(|e| e.metadata.resource_version).unwrap_or(0);
        extension.metadata.resource_version = previous + 1;
        objects.insert(key.clone(), extension);
        key
    }

    /// Apply a user edit to the spec, bumping generation and resource version
    pub async fn update_spec(&self, key: &ObjectKey, edit: impl FnOnce(&mut ExtensionSpec)) -> Result<()> {
        let mut objects = self.objects.write().await;
        let extension = objects
            .get_mut(key)
            .ok_or_else(|| ControllerError::NotFound(key.to_string()))?;
        edit(&mut extension.spec);
        extension.metadata.generation += 1;
        extension.metadata.resource_version += 1;
        Ok(())
    }

    pub async fn remove(&self, key: &ObjectKey) -> Option<ClusterExtension> {
        self.objects.write().await.remove(key)
    }

    /// Number of successful status writes
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtensionStore for InMemoryExtensionStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ClusterExtension>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<ClusterExtension>> {
        Ok(self.objects.read().await.values().cloned().collect())
    }

    async fn read_conditions(&self, key: &ObjectKey) -> Result<Vec<Condition>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|e| e.status.conditions.clone())
            .unwrap_or_default())
    }

    async fn write_status(&self, key: &ObjectKey, status: &ExtensionStatus, expected_version: u64) -> Result<u64> {
        let mut objects = self.objects.write().await;
        let extension = objects
            .get_mut(key)
            .ok_or_else(|| ControllerError::NotFound(key.to_string()))?;
        if extension.metadata.resource_version != expected_version {
            return Err(ConflictError {
                key: key.clone(),
                expected: expected_version,
                actual: extension.metadata.resource_version,
            }
            .into());
        }
        extension.status = status.clone();
        extension.metadata.resource_version += 1;
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(extension.metadata.resource_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_status_bumps_version() {
        let store = InMemoryExtensionStore::new();
        let key = store.insert(ClusterExtension::new("ext", "pkg")).await;
        let ext = store.get(&key).await.unwrap().unwrap();
        assert_eq!(ext.metadata.resource_version, 1);

        let status = ExtensionStatus {
            paused: true,
            ..Default::default()
        };
        let version = store.write_status(&key, &status, 1).await.unwrap();
        assert_eq!(version, 2);
        assert!(store.get(&key).await.unwrap().unwrap().status.paused);
        assert_eq!(store.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryExtensionStore::new();
        let key = store.insert(ClusterExtension::new("ext", "pkg")).await;
        store.update_spec(&key, |spec| spec.channel = Some("beta".into())).await.unwrap();

        let err = store
            .write_status(&key, &ExtensionStatus::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Conflict(ConflictError { expected: 1, actual: 2, .. })));
        assert!(err.is_retryable());
        assert_eq!(store.status_writes(), 0);

        let ext = store.get(&key).await.unwrap().unwrap();
        assert_eq!(ext.metadata.generation, 2);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = InMemoryExtensionStore::new();
        let key = ObjectKey::new("missing");
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.read_conditions(&key).await.unwrap().is_empty());
        assert!(store.write_status(&key, &ExtensionStatus::default(), 0).await.is_err());
    }
}
