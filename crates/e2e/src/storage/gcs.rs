//! Google Cloud Storage adapter over `object_store`

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use parking_lot::Mutex;
use tokio::fs;
use tracing::debug;

use super::{ObjectDescriptor, ObjectStorage};
use crate::error::SyncResult;

/// GCS client. Credentials come from the environment
/// (`GOOGLE_APPLICATION_CREDENTIALS`, `GOOGLE_SERVICE_ACCOUNT`, ...).
/// One client per bucket, created on first use.
#[derive(Default)]
pub struct GcsStorage {
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl GcsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `store` for `bucket` instead of building a client from the environment
    pub fn with_store(self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores.lock().insert(bucket.into(), store);
        self
    }

    fn store(&self, bucket: &str) -> SyncResult<Arc<dyn ObjectStore>> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let store: Arc<dyn ObjectStore> = Arc::new(
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()?,
        );
        debug!("Created GCS client for bucket {}", bucket);
        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl ObjectStorage for GcsStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> SyncResult<Vec<ObjectDescriptor>> {
        let store = self.store(bucket)?;
        // Stored locations never carry empty segments; filter on the same form
        let prefix_path = ObjectPath::from(prefix);
        let normalized = prefix_path.to_string();
        let prefix_filter = if normalized.is_empty() { None } else { Some(&prefix_path) };

        let metas: Vec<_> = store.list(prefix_filter).try_collect().await?;

        Ok(metas
            .into_iter()
            .map(|meta| ObjectDescriptor {
                bucket: bucket.to_string(),
                key: meta.location.to_string(),
                size: Some(meta.size as u64),
            })
            .filter(|object| object.key.starts_with(&normalized))
            .collect())
    }

    async fn download_object(&self, object: &ObjectDescriptor, destination: &Path) -> SyncResult<()> {
        let store = self.store(&object.bucket)?;
        let data = store
            .get(&ObjectPath::from(object.key.as_str()))
            .await?
            .bytes()
            .await?;
        fs::write(destination, &data).await?;
        Ok(())
    }

    async fn upload_object(&self, source: &Path, bucket: &str, key: &str) -> SyncResult<()> {
        let store = self.store(bucket)?;
        let data = Bytes::from(fs::read(source).await?);
        store.put(&ObjectPath::from(key), PutPayload::from(data)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn storage() -> GcsStorage {
        GcsStorage::new().with_store("baselines", Arc::new(InMemory::new()))
    }

    #[tokio::test]
    async fn test_put_list_get() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage();
        let source = dir.path().join("home.png");
        std::fs::write(&source, b"home").unwrap();

        storage.upload_object(&source, "baselines", "demo/chromium/home.png").await.unwrap();
        storage.upload_object(&source, "baselines", "demo-e2e/home.png").await.unwrap();

        let objects = storage.list_objects("baselines", "demo").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "demo/chromium/home.png");
        assert_eq!(objects[0].size, Some(4));

        let destination = dir.path().join("copy.png");
        storage.download_object(&objects[0], &destination).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"home");
    }

    #[tokio::test]
    async fn test_listing_uses_stored_key_form() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage();
        let source = dir.path().join("home.png");
        std::fs::write(&source, b"home").unwrap();

        // The store drops empty segments on write
        storage.upload_object(&source, "baselines", "/etc//home.png").await.unwrap();

        let objects = storage.list_objects("baselines", "/etc").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "etc/home.png");
    }

    #[tokio::test]
    async fn test_missing_object_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let object = ObjectDescriptor {
            bucket: "baselines".to_string(),
            key: "demo/missing.png".to_string(),
            size: None,
        };
        assert!(storage().download_object(&object, &dir.path().join("x.png")).await.is_err());
    }
}
