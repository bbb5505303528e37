//! baseline-sync engine
//!
//! Keeps a project's visual-regression baselines in object storage and
//! sequences them around a delegated E2E run:
//! - Mirrors a local snapshot directory against a bucket prefix
//! - Delegates test execution to Nx or Playwright
//! - Publishes regenerated baselines only after a successful run
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     BaselineSync                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  compare: download_all -> run_target -> result              │
//! │  reset:   clear_local  -> run_target -> upload_all          │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  SnapshotMirror              │  TargetRunner                │
//! │    └── ObjectStorage         │    ├── NxRunner              │
//! │          ├── GcsStorage      │    └── PlaywrightRunner      │
//! │          └── FsBucketStorage │                              │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```

pub mod error;
pub mod mirror;
pub mod orchestrator;
pub mod storage;
pub mod target;

pub use error::{SyncError, SyncResult};
pub use mirror::{ClearOutcome, Direction, SnapshotMirror, TransferFailure, TransferReport};
pub use orchestrator::{BaselineSync, RunSummary, SyncSettings};
pub use storage::{FsBucketStorage, GcsStorage, ObjectDescriptor, ObjectStorage};
pub use target::{NxRunner, PlaywrightRunner, RunOptions, SubResult, TargetDescriptor, TargetRunner};
