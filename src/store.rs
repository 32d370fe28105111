//! Locked store (C4): exclusive-lock-scoped read-modify-write, and a
//! fallback plain atomic write.
//!
//! Grounded on the teacher's `Config::save_to_path` atomic-write shape
//! (`create_dir_all` + serialize + write); file locking itself is enriched
//! from `fs4`, which no teacher file in the retrieval pack demonstrates
//! (see DESIGN.md).

use std::fs::{self, File};
use std::path::PathBuf;

use fs4::FileExt;

use crate::error::{StoreError, StoreResult};
use crate::schema::AuthProfileStore;

/// A store bound to a directory on disk. The directory holds the store's
/// JSON file and a sibling `.lock` file used for the advisory exclusive
/// lock.
pub struct Store {
    dir: PathBuf,
    filename: String,
}

/// RAII guard for the advisory lock. Released on every exit path,
/// including panics, via `Drop`.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.filename))
    }

    fn read(&self) -> StoreResult<AuthProfileStore> {
        let path = self.path();
        if !path.exists() {
            return Ok(AuthProfileStore::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn acquire_lock(&self) -> StoreResult<LockGuard> {
        fs::create_dir_all(&self.dir)?;
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&file).map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(LockGuard { file })
    }

    /// Atomic write: serialize to a sibling temp file in the same
    /// directory, fsync, then rename over the target. A crash between the
    /// temp write and the rename leaves the original file untouched.
    fn write_atomic(&self, store: &AuthProfileStore) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path();
        let tmp_path = self.dir.join(format!("{}.tmp", self.filename));
        let content = serde_json::to_string_pretty(store)?;

        {
            let mut tmp = File::create(&tmp_path)?;
            use std::io::Write;
            tmp.write_all(content.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &target)?;
        Ok(())
    }

    /// Acquire the exclusive lock, re-read the store from disk (the
    /// in-memory copy may be stale), invoke `updater`, and write back
    /// atomically if it returns `true`. Returns the post-update store, or
    /// `None` if the updater declined to write.
    pub fn update<F>(&self, updater: F) -> StoreResult<Option<AuthProfileStore>>
    where
        F: FnOnce(&mut AuthProfileStore) -> bool,
    {
        let _lock = self.acquire_lock()?;
        let mut store = self.read()?;
        let write_needed = updater(&mut store);
        if write_needed {
            self.write_atomic(&store)?;
            Ok(Some(store))
        } else {
            Ok(None)
        }
    }

    /// Fallback write path used when locking is unavailable: a plain
    /// atomic write with no read-modify-write guarantee. Not serialized
    /// against concurrent writers — see DESIGN.md Open Question 2.
    pub fn save(&self, store: &AuthProfileStore) -> StoreResult<()> {
        self.write_atomic(store)
    }

    /// `~/.auth-failover-core`, the fallback store directory when the
    /// embedding application doesn't supply its own `agent_dir`. Callers
    /// are free to construct a `Store` with any directory they like;
    /// this only exists for the common standalone case.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".auth-failover-core")
    }
}
