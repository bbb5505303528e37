//! Error types for baseline synchronization

use std::path::PathBuf;
use thiserror::Error;

use crate::mirror::Direction;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list objects in {bucket} under {prefix:?}: {reason}")]
    Listing {
        bucket: String,
        prefix: String,
        reason: String,
    },

    #[error("Directory not found: {}", .0.display())]
    LocalPathMissing(PathBuf),

    #[error("Cannot read {}: {reason}", path.display())]
    LocalPathUnreadable { path: PathBuf, reason: String },

    #[error("{direction} failed for {failed} file(s), first: {first}")]
    BatchFailed {
        direction: Direction,
        failed: usize,
        first: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Runner not found: {0}")]
    RunnerNotFound(String),

    #[error("Runner error: {0}")]
    Runner(String),

    #[error("Unexpected failure: {0}")]
    Internal(String),

    #[error(transparent)]
    Config(#[from] baseline_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
