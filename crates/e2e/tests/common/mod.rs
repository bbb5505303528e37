//! Test doubles for the storage and runner seams

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use baseline_e2e::{
    ObjectDescriptor, ObjectStorage, RunOptions, SubResult, SyncError, SyncResult, TargetDescriptor, TargetRunner,
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use walkdir::WalkDir;

/// In-memory store recording every call
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    pub fail_listing: bool,
    pub fail_keys: HashSet<String>,
    pub listings: AtomicUsize,
    pub downloads: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_key(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(&(bucket.to_string(), key.to_string())).cloned()
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.uploads.lock().iter().map(|(_, k)| k.clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> SyncResult<Vec<ObjectDescriptor>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(SyncError::Storage(format!("bucket not found: {}", bucket)));
        }
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((b, k), data)| ObjectDescriptor {
                bucket: b.clone(),
                key: k.clone(),
                size: Some(data.len() as u64),
            })
            .collect())
    }

    async fn download_object(&self, object: &ObjectDescriptor, destination: &Path) -> SyncResult<()> {
        self.downloads.lock().push(object.key.clone());
        if self.fail_keys.contains(&object.key) {
            return Err(SyncError::Storage(format!("simulated failure for {}", object.key)));
        }
        let data = self
            .object(&object.bucket, &object.key)
            .ok_or_else(|| SyncError::Storage(format!("no such object: {}", object.key)))?;
        tokio::fs::write(destination, data).await?;
        Ok(())
    }

    async fn upload_object(&self, source: &Path, bucket: &str, key: &str) -> SyncResult<()> {
        self.uploads.lock().push((source.to_path_buf(), key.to_string()));
        if self.fail_keys.contains(key) {
            return Err(SyncError::Storage(format!("simulated failure for {}", key)));
        }
        let data = tokio::fs::read(source).await?;
        self.objects.lock().insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }
}

/// Runner yielding scripted sub-results, counting how many were consumed
pub struct FakeRunner {
    results: Vec<SyncResult<SubResult>>,
    writes: Vec<(PathBuf, Vec<u8>)>,
    pub calls: Mutex<Vec<(TargetDescriptor, RunOptions)>>,
    pub consumed: Arc<AtomicUsize>,
    panics: bool,
}

impl FakeRunner {
    pub fn new(results: Vec<SyncResult<SubResult>>) -> Self {
        Self {
            results,
            writes: Vec::new(),
            calls: Mutex::new(Vec::new()),
            consumed: Arc::new(AtomicUsize::new(0)),
            panics: false,
        }
    }

    pub fn passing() -> Self {
        Self::new(vec![Ok(SubResult::passed("demo:e2e"))])
    }

    pub fn failing() -> Self {
        Self::new(vec![Ok(SubResult::failed("demo:e2e", "2 snapshots differ"))])
    }

    pub fn panicking() -> Self {
        let mut runner = Self::passing();
        runner.panics = true;
        runner
    }

    /// Files the run "generates" once its first sub-result is consumed
    pub fn writing(mut self, path: impl Into<PathBuf>, data: &[u8]) -> Self {
        self.writes.push((path.into(), data.to_vec()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }
}

impl TargetRunner for FakeRunner {
    fn run_target(&self, target: &TargetDescriptor, options: &RunOptions) -> baseline_e2e::target::SubResultStream {
        self.calls.lock().push((target.clone(), options.clone()));
        if self.panics {
            panic!("runner exploded");
        }

        let results: Vec<SyncResult<SubResult>> = self
            .results
            .iter()
            .map(|r| match r {
                Ok(sub) => Ok(sub.clone()),
                Err(e) => Err(SyncError::Runner(e.to_string())),
            })
            .collect();
        let writes = self.writes.clone();
        let consumed = Arc::clone(&self.consumed);

        stream::iter(results)
            .then(move |result| {
                let writes = writes.clone();
                let consumed = Arc::clone(&consumed);
                async move {
                    if consumed.fetch_add(1, Ordering::SeqCst) == 0 {
                        if let Err(e) = write_all(writes).await {
                            return Err(SyncError::Io(e));
                        }
                    }
                    result
                }
            })
            .boxed()
    }
}

async fn write_all(writes: Vec<(PathBuf, Vec<u8>)>) -> std::io::Result<()> {
    for (path, data) in writes {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
    }
    Ok(())
}

/// Relative path -> content for every file under `root`
pub fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            let data = std::fs::read(e.path()).unwrap();
            (relative, data)
        })
        .collect()
}

pub fn write_file(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}
