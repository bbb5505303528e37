//! Object storage capability
//!
//! The sync engine only needs three operations from a store: list the keys
//! under a prefix, download one object to a file, and upload one file to a
//! key. Adapters are constructed at the process boundary and passed down by
//! reference.

mod fs;
mod gcs;

pub use fs::FsBucketStorage;
pub use gcs::GcsStorage;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Separator used between key segments
pub const KEY_SEPARATOR: char = '/';

/// A listed remote object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Every object in `bucket` whose key starts with `prefix`
    async fn list_objects(&self, bucket: &str, prefix: &str) -> SyncResult<Vec<ObjectDescriptor>>;

    /// Write one object's content to `destination`, replacing any existing file
    async fn download_object(&self, object: &ObjectDescriptor, destination: &Path) -> SyncResult<()>;

    /// Store the content of `source` under `key` in `bucket`
    async fn upload_object(&self, source: &Path, bucket: &str, key: &str) -> SyncResult<()>;
}
