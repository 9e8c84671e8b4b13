//! Remote object store synchronization.
//!
//! Originals, derivatives and the manifest itself are mirrored to an object
//! store under deterministic keys:
//!
//! ```text
//! <base><originals><filename>        photos/originals/DSC_0042.jpg
//! <base><thumbnails><stem>.<ext>     photos/thumbnails/DSC_0042.webp
//! <base>photos.json                  photos/photos.json
//! ```
//!
//! The wire protocol is behind [`ObjectStore`]. [`DirStore`] mirrors objects
//! into a directory (a mounted bucket or a sync folder); tests use the
//! recording in-memory store in [`tests`].
//!
//! [`RemoteSync`] adds everything the pipeline needs on top of the raw
//! store: key construction, content types, cache headers, best-effort batch
//! deletes and public URLs. Key construction lives on [`StoreLayout`] so that
//! fallback URLs can be produced even when no store is configured.

mod dir_store;

pub use dir_store::DirStore;

use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Cache-Control for originals and derivatives. Keys change whenever content
/// does, so objects can be cached for a year.
pub const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000";
/// Cache-Control for the manifest, which is rewritten in place.
pub const MANIFEST_CACHE_CONTROL: &str = "public, max-age=720, must-revalidate";
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";
pub const MANIFEST_OBJECT: &str = "photos.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error for {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("store rejected {key}: {reason}")]
    Rejected { key: String, reason: String },
}

/// Headers stored alongside an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: &'static str,
    pub cache_control: &'static str,
}

/// Minimal object store: existence check, put, batch delete, direct URL.
///
/// `Send + Sync` so one store serves every worker.
pub trait ObjectStore: Send + Sync {
    fn head(&self, key: &str) -> Result<bool, StoreError>;

    fn put(&self, key: &str, body: &[u8], meta: ObjectMeta) -> Result<(), StoreError>;

    /// Delete a batch of keys. Returns the keys that could not be deleted.
    /// Deleting a key that does not exist is not a failure.
    fn delete(&self, keys: &[String]) -> Vec<(String, StoreError)>;

    /// URL of an object when no CDN is configured.
    fn direct_url(&self, key: &str) -> String;
}

/// Content type from a file extension, case-insensitive.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Key scheme and CDN base. Needed with or without a configured store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub base_prefix: String,
    pub original_prefix: String,
    pub thumbnail_prefix: String,
    pub cdn_url: String,
    /// Derivative file extension (`webp` or `jpg`).
    pub derivative_ext: &'static str,
}

impl StoreLayout {
    pub fn original_key(&self, filename: &str) -> String {
        format!("{}{}{}", self.base_prefix, self.original_prefix, filename)
    }

    pub fn derivative_key(&self, stem: &str) -> String {
        format!(
            "{}{}{}.{}",
            self.base_prefix, self.thumbnail_prefix, stem, self.derivative_ext
        )
    }

    pub fn manifest_key(&self) -> String {
        format!("{}{}", self.base_prefix, MANIFEST_OBJECT)
    }

    /// Best-guess derivative URL used when no derivative could be published.
    pub fn fallback_derivative_url(&self, stem: &str) -> String {
        format!(
            "{}/{}",
            self.cdn_url.trim_end_matches('/'),
            self.derivative_key(stem)
        )
    }
}

/// Outcome of a best-effort batch delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    /// Key and error message for every key that could not be deleted.
    pub failed: Vec<(String, String)>,
}

/// An [`ObjectStore`] plus the layout used to address it.
pub struct RemoteSync {
    store: Box<dyn ObjectStore>,
    layout: StoreLayout,
}

impl RemoteSync {
    pub fn new(store: Box<dyn ObjectStore>, layout: StoreLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Whether `key` exists. A failed check counts as absent.
    pub fn exists(&self, key: &str) -> bool {
        match self.store.head(key) {
            Ok(found) => found,
            Err(e) => {
                warn!(key, error = %e, "existence check failed");
                false
            }
        }
    }

    /// Upload a local file as a long-lived asset.
    pub fn upload_file(&self, path: &Path, key: &str) -> Result<(), StoreError> {
        let body = std::fs::read(path).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })?;
        self.upload_bytes(
            &body,
            key,
            ObjectMeta {
                content_type: content_type_for(path),
                cache_control: ASSET_CACHE_CONTROL,
            },
        )
    }

    pub fn upload_bytes(&self, body: &[u8], key: &str, meta: ObjectMeta) -> Result<(), StoreError> {
        self.store.put(key, body, meta)?;
        debug!(key, bytes = body.len(), "uploaded");
        Ok(())
    }

    /// Delete keys best-effort, logging each failure.
    pub fn delete(&self, keys: &[String]) -> DeleteReport {
        if keys.is_empty() {
            return DeleteReport::default();
        }
        let failures = self.store.delete(keys);
        let mut report = DeleteReport::default();
        for key in keys {
            if !failures.iter().any(|(k, _)| k == key) {
                report.deleted.push(key.clone());
            }
        }
        for (key, error) in failures {
            warn!(key = %key, error = %error, "delete failed");
            report.failed.push((key, error.to_string()));
        }
        report
    }

    /// `<cdn>/<key>` when a CDN is configured, otherwise the store's own URL.
    pub fn public_url(&self, key: &str) -> String {
        if self.layout.cdn_url.is_empty() {
            self.store.direct_url(key)
        } else {
            format!("{}/{}", self.layout.cdn_url.trim_end_matches('/'), key)
        }
    }
}
