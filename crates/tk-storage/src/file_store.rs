//! JSON-file backed KV store.
//!
//! The whole map lives in one file and is rewritten on every mutation via a
//! temp file + rename, so a crash leaves either the old or the new contents.

use crate::kv::KvStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tk_core::{Result, TkError};

pub struct FileKvStore {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl FileKvStore {
    /// Open the store at `path`. A missing file opens as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data: BTreeMap<String, String> = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), entries = data.len(), "opened file kv store");
        Ok(Self { path, data: RwLock::new(data) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp_path = self.path.with_extension("tmp");
        let result = (|| -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(&bytes)?;
            f.flush()?;
            f.sync_all()?;
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(TkError::Storage(format!("{}: {e}", self.path.display())));
        }
        Ok(())
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.write();
        let mut next = data.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *data = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut data = self.data.write();
        if !data.contains_key(key) {
            return Ok(());
        }
        let mut next = data.clone();
        next.remove(key);
        self.persist(&next)?;
        *data = next;
        Ok(())
    }
}
