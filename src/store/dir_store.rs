//! Directory-backed object store.
//!
//! Objects are files under `root`, one per key, with `/` in keys mapped to
//! subdirectories. Suitable for a bucket mounted through FUSE or a folder
//! that a separate tool syncs to the CDN origin. Content type and cache
//! headers are not persisted; the serving layer derives them.

use super::{ObjectMeta, ObjectStore, StoreError};
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    endpoint: String,
    bucket: String,
}

impl DirStore {
    /// `endpoint` and `bucket` only shape [`direct_url`](ObjectStore::direct_url).
    pub fn new(root: impl Into<PathBuf>, endpoint: &str, bucket: &str) -> Self {
        Self {
            root: root.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file, refusing anything that could escape `root`.
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl ObjectStore for DirStore {
    fn head(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.object_path(key)?.is_file())
    }

    fn put(&self, key: &str, body: &[u8], _meta: ObjectMeta) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(key))?;
        }
        // Write beside the target and rename, so readers never see a partial object.
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".partial");
        let tmp = path.with_file_name(tmp_name);
        std::fs::write(&tmp, body).map_err(io_error(key))?;
        std::fs::rename(&tmp, &path).map_err(io_error(key))
    }

    fn delete(&self, keys: &[String]) -> Vec<(String, StoreError)> {
        let mut failures = Vec::new();
        for key in keys {
            let result = self.object_path(key).and_then(|path| {
                match std::fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(io_error(key)(e)),
                }
            });
            if let Err(e) = result {
                failures.push((key.clone(), e));
            }
        }
        failures
    }

    fn direct_url(&self, key: &str) -> String {
        if self.endpoint.is_empty() {
            format!("file://{}", self.root.join(key).display())
        } else {
            format!("{}/{}/{}", self.endpoint, self.bucket, key)
        }
    }
}
