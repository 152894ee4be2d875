// Blob persistence: adapter contract plus the JSON collection format

use crate::models::Task;
use eyre::{Context, Result};
use fs2::FileExt;
use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key-value blob store the task store persists through.
///
/// `load` is called once at startup, `save` after every mutation. `save` is
/// best-effort: the store logs failures and carries on.
pub trait PersistenceAdapter {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, blob: &str) -> Result<()>;
}

/// Serialize the full collection as a JSON array, order significant.
pub fn encode(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize task collection")
}

/// Parse a previously encoded collection.
pub fn decode(blob: &str) -> Result<Vec<Task>> {
    serde_json::from_str(blob).context("Failed to parse task collection")
}

/// File-backed adapter: one JSON file under a `.todostore` subdirectory of the
/// given base path.
pub struct FileAdapter {
    dir: PathBuf,
    path: PathBuf,
}

impl FileAdapter {
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self> {
        let dir = base.as_ref().join(".todostore");
        fs::create_dir_all(&dir).context("Failed to create store directory")?;

        let path = dir.join("tasks.json");
        Ok(Self { dir, path })
    }

    /// Path of the blob file, useful for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for FileAdapter {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let blob = fs::read_to_string(&self.path).context("Failed to read task file")?;
        debug!(path = ?self.path, bytes = blob.len(), "Loaded task blob");
        Ok(Some(blob))
    }

    fn save(&self, blob: &str) -> Result<()> {
        // Serialize writers on a sidecar lock file, then swap the blob in via
        // rename so a crashed write never leaves a truncated file.
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.dir.join(".lock"))
            .context("Failed to open lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).context("Failed to create temp file")?;
        file.write_all(blob.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path).context("Failed to replace task file")?;

        // Lock is automatically released when the file is dropped
        Ok(())
    }
}

/// In-memory adapter for tests and embedding.
#[derive(Default)]
pub struct MemoryAdapter {
    blob: RefCell<Option<String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-seeded blob, as if a previous session had saved it.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: RefCell::new(Some(blob.into())),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.borrow().clone()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.blob.borrow().clone())
    }

    fn save(&self, blob: &str) -> Result<()> {
        *self.blob.borrow_mut() = Some(blob.to_string());
        Ok(())
    }
}
