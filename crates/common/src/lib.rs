//! baseline-sync common library
//!
//! Leaf types shared by the sync engine and the CLI: execution context,
//! snapshot locations, test selection filters and configuration.

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod projects;

// Re-export commonly used types
pub use config::{BatchPolicy, RunnerKind, StorageBackend, SyncConfig};
pub use context::{sanitize_project_name, ExecutionContext, LocalTarget, Mode, RemoteTarget};
pub use error::{Error, Result};
pub use filter::{Brand, CommodityType, DeviceClass, GrepPattern, TestFilterBuilder};
pub use projects::{device_projects, DeviceProject, Viewport};

/// baseline-sync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
