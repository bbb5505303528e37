//! Execution context and the snapshot locations derived from it
//!
//! A project name is used both as a filesystem path segment and as an
//! object-store key prefix, so it is sanitized once when the context is
//! built and every derived location goes through the sanitized form.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Directory holding per-project app folders, relative to the workspace root
pub const APPS_DIR: &str = "apps";

/// Snapshot directory inside a project folder
pub const SNAPSHOT_DIR: [&str; 3] = ["test", "visual", "snapshots"];

/// Whether baselines are compared against or regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Download baselines, then compare
    #[default]
    Compare,
    /// Clear baselines, regenerate them, then publish on success
    Reset,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Compare => "compare",
            Mode::Reset => "reset",
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Mode::Reset)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a project name and strip leading `../` or `..\` sequences.
/// Leading, trailing and repeated `/` are collapsed.
///
/// Rejects empty names, names containing a NUL byte, and names whose
/// remainder contains anything other than ASCII letters, digits, `_`, `-`,
/// `@` or `/`.
pub fn sanitize_project_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::InvalidProject("project name is required".to_string()));
    }
    if name.contains('\0') {
        return Err(Error::InvalidProject("NUL byte detected".to_string()));
    }

    let mut rest = name;
    loop {
        if let Some(stripped) = rest.strip_prefix("../").or_else(|| rest.strip_prefix("..\\")) {
            rest = stripped;
            continue;
        }
        if rest == ".." {
            rest = "";
        }
        break;
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '@' | '/');
    if rest.is_empty() || !rest.chars().all(allowed) {
        return Err(Error::InvalidProject(name.escape_debug().to_string()));
    }

    // Object keys have no empty segments, so neither does the canonical name
    let canonical = rest.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/");
    if canonical.is_empty() {
        return Err(Error::InvalidProject(name.escape_debug().to_string()));
    }

    Ok(canonical)
}

/// Identity of one workflow invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    project: String,
    sanitized: String,
    configuration: Option<String>,
    mode: Mode,
}

impl ExecutionContext {
    /// Build a context, failing on an invalid project name
    pub fn new(project: impl Into<String>, configuration: Option<String>, mode: Mode) -> Result<Self> {
        let project = project.into();
        let sanitized = sanitize_project_name(&project)?;
        let configuration = configuration.filter(|c| !c.is_empty());

        Ok(Self {
            project,
            sanitized,
            configuration,
            mode,
        })
    }

    /// Project name as supplied by the caller
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Project name after sanitization
    pub fn sanitized_project(&self) -> &str {
        &self.sanitized
    }

    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Remote location of this project's baselines in `bucket`
    pub fn remote_target(&self, bucket: impl Into<String>) -> RemoteTarget {
        RemoteTarget {
            bucket: bucket.into(),
            prefix: self.sanitized.clone(),
        }
    }

    /// Local snapshot directory: `<root>/apps/<project>/test/visual/snapshots`
    pub fn local_target(&self, workspace_root: &Path) -> LocalTarget {
        let mut path = workspace_root.join(APPS_DIR);
        for segment in self.sanitized.split('/') {
            path.push(segment);
        }
        for segment in SNAPSHOT_DIR {
            path.push(segment);
        }
        LocalTarget { path }
    }
}

/// Bucket plus key prefix holding one project's baselines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTarget {
    pub bucket: String,
    pub prefix: String,
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.prefix)
    }
}

/// Local directory mirroring a [`RemoteTarget`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTarget {
    pub path: PathBuf,
}

impl LocalTarget {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("demo-e2e", "demo-e2e" ; "plain name")]
    #[test_case("@scope/app_1", "@scope/app_1" ; "scoped name")]
    #[test_case("../../etc", "etc" ; "posix traversal")]
    #[test_case("..\\..\\etc", "etc" ; "windows traversal")]
    #[test_case("../..\\apps/demo", "apps/demo" ; "mixed traversal")]
    #[test_case("/etc", "etc" ; "leading slash")]
    #[test_case("a//b/", "a/b" ; "empty segments")]
    fn test_sanitize_accepts(input: &str, expected: &str) {
        assert_eq!(sanitize_project_name(input).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("demo\0" ; "nul byte")]
    #[test_case("../.." ; "only traversal")]
    #[test_case("//" ; "only slashes")]
    #[test_case("demo app" ; "space")]
    #[test_case("demo/../etc" ; "inner traversal")]
    #[test_case("démo" ; "non ascii")]
    #[test_case("demo;rm" ; "punctuation")]
    fn test_sanitize_rejects(input: &str) {
        assert!(matches!(sanitize_project_name(input), Err(Error::InvalidProject(_))));
    }

    #[test]
    fn test_targets_derive_from_sanitized_name() {
        let ctx = ExecutionContext::new("../demo-e2e", None, Mode::Compare).unwrap();
        assert_eq!(ctx.project(), "../demo-e2e");
        assert_eq!(ctx.sanitized_project(), "demo-e2e");

        let remote = ctx.remote_target("visual-baselines");
        assert_eq!(remote.bucket, "visual-baselines");
        assert_eq!(remote.prefix, "demo-e2e");

        let local = ctx.local_target(Path::new("."));
        assert_eq!(local.path(), Path::new("./apps/demo-e2e/test/visual/snapshots"));
    }

    #[test]
    fn test_leading_slash_stays_under_apps() {
        let ctx = ExecutionContext::new("/etc", None, Mode::Compare).unwrap();
        let local = ctx.local_target(Path::new("/work"));
        assert_eq!(local.path(), Path::new("/work/apps/etc/test/visual/snapshots"));
        assert_eq!(ctx.remote_target("b").prefix, "etc");

        let ctx = ExecutionContext::new("a//b", None, Mode::Compare).unwrap();
        assert_eq!(ctx.remote_target("b").prefix, "a/b");
        assert_eq!(ctx.local_target(Path::new("/work")).path(), Path::new("/work/apps/a/b/test/visual/snapshots"));
    }

    #[test]
    fn test_empty_configuration_is_none() {
        let ctx = ExecutionContext::new("demo", Some(String::new()), Mode::Reset).unwrap();
        assert_eq!(ctx.configuration(), None);
        assert!(ctx.mode().is_reset());
    }
}
