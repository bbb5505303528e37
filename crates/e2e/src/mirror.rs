//! Mirror a local snapshot directory against a remote key prefix
//!
//! Transfers fan out concurrently (bounded) and are joined before the batch
//! returns. A failed file is logged and recorded in the [`TransferReport`]
//! but never stops its siblings. Whether recorded failures fail the batch is
//! decided by the [`BatchPolicy`].

use std::fmt;
use std::path::{Path, PathBuf};

use baseline_common::{BatchPolicy, RemoteTarget};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};
use crate::storage::{ObjectDescriptor, ObjectStorage, KEY_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => f.write_str("download"),
            Direction::Upload => f.write_str("upload"),
        }
    }
}

/// One file that could not be transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    pub key: String,
    pub local_path: PathBuf,
    pub reason: String,
}

/// Outcome of one batch transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub direction: Direction,

    /// Files a transfer was attempted for
    pub attempted: usize,

    /// Keys transferred successfully, sorted
    pub transferred: Vec<String>,

    /// Listed keys that do not map into the local directory
    pub skipped: Vec<String>,

    pub failures: Vec<TransferFailure>,
}

impl TransferReport {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            attempted: 0,
            transferred: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// No file failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of clearing the local snapshot directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearOutcome {
    /// The directory did not exist; an empty one was created
    NothingToClear,
    /// Contents were removed and the empty directory recreated
    Cleared,
}

/// Key segments of `key` below `prefix`, or `None` when the key is not
/// strictly inside the prefix folder or would not map to a plain relative path
fn relative_segments<'k>(prefix: &str, key: &'k str) -> Option<Vec<&'k str>> {
    let rest = key.strip_prefix(prefix)?;
    let rest = if prefix.is_empty() || prefix.ends_with(KEY_SEPARATOR) {
        rest
    } else {
        rest.strip_prefix(KEY_SEPARATOR)?
    };

    let segments: Vec<&str> = rest.split(KEY_SEPARATOR).collect();
    let unsafe_segment = |s: &&str| s.is_empty() || *s == "." || *s == ".." || s.contains('\\');
    if segments.iter().any(unsafe_segment) {
        return None;
    }
    Some(segments)
}

/// Key for a local file: `<prefix>/<relative path with '/' separators>`
fn object_key(prefix: &str, relative: &Path) -> Option<String> {
    let segments: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    let relative = segments?.join("/");
    let prefix = prefix.trim_end_matches(KEY_SEPARATOR);
    if prefix.is_empty() {
        Some(relative)
    } else {
        Some(format!("{}{}{}", prefix, KEY_SEPARATOR, relative))
    }
}

/// Regular files under `root`, as (absolute path, path relative to root)
fn collect_files(root: &Path) -> SyncResult<Vec<(PathBuf, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::LocalPathUnreadable {
            path: e.path().unwrap_or(root).to_path_buf(),
            reason: e.to_string(),
        })?;

        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| SyncError::Internal(e.to_string()))?
                .to_path_buf();
            files.push((entry.path().to_path_buf(), relative));
        } else if entry.file_type().is_symlink() {
            debug!("Skipping symlink {}", entry.path().display());
        }
    }

    Ok(files)
}

/// Syncs one local directory with one remote prefix, one direction at a time.
/// Holds no state between calls.
pub struct SnapshotMirror<'a> {
    storage: &'a dyn ObjectStorage,
    concurrency: usize,
    policy: BatchPolicy,
}

impl<'a> SnapshotMirror<'a> {
    pub fn new(storage: &'a dyn ObjectStorage, concurrency: usize, policy: BatchPolicy) -> Self {
        Self {
            storage,
            concurrency: concurrency.max(1),
            policy,
        }
    }

    /// Empty `local_dir`, leaving an empty directory behind.
    ///
    /// Only `local_dir` itself is removed; a symlink at that path is unlinked,
    /// not followed.
    pub async fn clear_local(&self, local_dir: &Path) -> SyncResult<ClearOutcome> {
        if !fs::try_exists(local_dir).await? {
            info!(local_dir = %local_dir.display(), "Directory does not exist, nothing to clear");
            fs::create_dir_all(local_dir).await?;
            return Ok(ClearOutcome::NothingToClear);
        }

        info!(local_dir = %local_dir.display(), "Clearing directory");
        fs::remove_dir_all(local_dir).await?;
        fs::create_dir_all(local_dir).await?;
        info!(local_dir = %local_dir.display(), "Directory cleared and recreated");

        Ok(ClearOutcome::Cleared)
    }

    /// Download every object under the remote prefix into `local_dir`.
    ///
    /// Fails outright only when listing fails (or, under the strict policy,
    /// when any file failed).
    pub async fn download_all(&self, remote: &RemoteTarget, local_dir: &Path) -> SyncResult<TransferReport> {
        info!(
            bucket = %remote.bucket,
            prefix = %remote.prefix,
            local_dir = %local_dir.display(),
            "Downloading snapshots"
        );

        let objects = self
            .storage
            .list_objects(&remote.bucket, &remote.prefix)
            .await
            .map_err(|e| match e {
                SyncError::Listing { .. } => e,
                other => SyncError::Listing {
                    bucket: remote.bucket.clone(),
                    prefix: remote.prefix.clone(),
                    reason: other.to_string(),
                },
            })?;

        let mut report = TransferReport::new(Direction::Download);
        let mut planned = Vec::with_capacity(objects.len());

        for object in objects {
            match relative_segments(&remote.prefix, &object.key) {
                Some(segments) => {
                    let mut destination = local_dir.to_path_buf();
                    destination.extend(segments);
                    planned.push((object, destination));
                }
                None => {
                    warn!(key = %object.key, prefix = %remote.prefix, "Skipping object outside snapshot folder");
                    report.skipped.push(object.key);
                }
            }
        }

        report.attempted = planned.len();
        let results: Vec<_> = stream::iter(planned)
            .map(|(object, destination)| async move {
                let result = self.download_one(&object, &destination).await;
                (object.key, destination, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (key, local_path, result) in results {
            match result {
                Ok(()) => {
                    info!(key = %key, local_path = %local_path.display(), "Downloaded file");
                    report.transferred.push(key);
                }
                Err(e) => {
                    error!(key = %key, local_path = %local_path.display(), error = %e, "Failed to download file");
                    report.failures.push(TransferFailure {
                        key,
                        local_path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.finish(report)
    }

    async fn download_one(&self, object: &ObjectDescriptor, destination: &Path) -> SyncResult<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        self.storage.download_object(object, destination).await
    }

    /// Upload every regular file under `local_dir` to the remote prefix,
    /// preserving relative paths.
    ///
    /// A missing `local_dir` fails immediately; an unreadable directory
    /// anywhere in the tree fails the whole upload before any transfer starts.
    pub async fn upload_all(&self, local_dir: &Path, remote: &RemoteTarget) -> SyncResult<TransferReport> {
        if !fs::try_exists(local_dir).await? {
            return Err(SyncError::LocalPathMissing(local_dir.to_path_buf()));
        }

        info!(
            local_dir = %local_dir.display(),
            bucket = %remote.bucket,
            prefix = %remote.prefix,
            "Uploading snapshots"
        );

        let root = local_dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || collect_files(&root))
            .await
            .map_err(|e| SyncError::Internal(e.to_string()))??;

        let mut report = TransferReport::new(Direction::Upload);
        let mut planned = Vec::with_capacity(files.len());

        for (local_path, relative) in files {
            match object_key(&remote.prefix, &relative) {
                Some(key) => planned.push((local_path, key)),
                None => {
                    error!(local_path = %local_path.display(), "Failed to upload file: path is not valid UTF-8");
                    report.failures.push(TransferFailure {
                        key: relative.to_string_lossy().into_owned(),
                        local_path,
                        reason: "path is not valid UTF-8".to_string(),
                    });
                }
            }
        }

        report.attempted = planned.len() + report.failures.len();
        let results: Vec<_> = stream::iter(planned)
            .map(|(local_path, key)| async move {
                let result = self.storage.upload_object(&local_path, &remote.bucket, &key).await;
                (key, local_path, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (key, local_path, result) in results {
            match result {
                Ok(()) => {
                    info!(local_path = %local_path.display(), key = %key, "Uploaded file");
                    report.transferred.push(key);
                }
                Err(e) => {
                    error!(local_path = %local_path.display(), key = %key, error = %e, "Failed to upload file");
                    report.failures.push(TransferFailure {
                        key,
                        local_path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.finish(report)
    }

    fn finish(&self, mut report: TransferReport) -> SyncResult<TransferReport> {
        report.transferred.sort();
        report.failures.sort_by(|a, b| a.key.cmp(&b.key));

        info!(
            direction = %report.direction,
            transferred = report.transferred.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Transfer completed"
        );

        if self.policy == BatchPolicy::Strict {
            if let Some(first) = report.failures.first() {
                return Err(SyncError::BatchFailed {
                    direction: report.direction,
                    failed: report.failures.len(),
                    first: format!("{} ({})", first.key, first.reason),
                });
            }
        }

        Ok(report)
    }
}
