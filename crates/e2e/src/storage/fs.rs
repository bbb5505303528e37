//! Filesystem-backed buckets
//!
//! A bucket is a directory under the store root and each key is a relative
//! file path inside it. Useful for offline runs and for tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use super::{ObjectDescriptor, ObjectStorage, KEY_SEPARATOR};
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone)]
pub struct FsBucketStorage {
    root: PathBuf,
}

impl FsBucketStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> SyncResult<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(SyncError::Storage(format!("invalid bucket name: {:?}", bucket)));
        }
        Ok(self.root.join(bucket))
    }

    /// Map a key to a file path, refusing keys that could escape the bucket
    fn object_path(&self, bucket: &str, key: &str) -> SyncResult<PathBuf> {
        let mut path = self.bucket_dir(bucket)?;
        for segment in key.split(KEY_SEPARATOR) {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(SyncError::Storage(format!("invalid object key: {:?}", key)));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

fn walk_keys(bucket_dir: &Path) -> SyncResult<Vec<String>> {
    let mut keys = Vec::new();

    for entry in WalkDir::new(bucket_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::Storage(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(bucket_dir)
            .map_err(|e| SyncError::Storage(e.to_string()))?;
        let segments: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        match segments {
            Some(segments) => keys.push(segments.join("/")),
            None => debug!("Skipping non UTF-8 path {}", entry.path().display()),
        }
    }

    Ok(keys)
}

#[async_trait]
impl ObjectStorage for FsBucketStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> SyncResult<Vec<ObjectDescriptor>> {
        let bucket_dir = self.bucket_dir(bucket)?;
        if !fs::try_exists(&bucket_dir).await? {
            return Err(SyncError::Storage(format!("bucket not found: {}", bucket)));
        }

        let keys = tokio::task::spawn_blocking(move || walk_keys(&bucket_dir))
            .await
            .map_err(|e| SyncError::Internal(e.to_string()))??;

        let mut objects = Vec::new();
        for key in keys.into_iter().filter(|k| k.starts_with(prefix)) {
            let size = fs::metadata(self.object_path(bucket, &key)?).await?.len();
            objects.push(ObjectDescriptor {
                bucket: bucket.to_string(),
                key,
                size: Some(size),
            });
        }

        debug!("Listed {} object(s) in {} under {:?}", objects.len(), bucket, prefix);
        Ok(objects)
    }

    async fn download_object(&self, object: &ObjectDescriptor, destination: &Path) -> SyncResult<()> {
        let source = self.object_path(&object.bucket, &object.key)?;
        fs::copy(&source, destination).await?;
        Ok(())
    }

    async fn upload_object(&self, source: &Path, bucket: &str, key: &str) -> SyncResult<()> {
        let destination = self.object_path(bucket, key)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(source, &destination).await?;
        Ok(())
    }
}
