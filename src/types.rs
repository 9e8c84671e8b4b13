//! Catalog types persisted in the manifest.
//!
//! The manifest is the contract with the front end: a JSON array of year
//! albums, each holding its photos newest first. Field names are fixed by that
//! contract, so renames here are breaking changes for every deployed site.

use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// One photo in the catalog.
///
/// `filename` is the identity of a record: captions are carried forward and
/// orphans are detected by filename, never by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub filename: String,
    /// Original image: CDN URL when mirrored, otherwise a path relative to the web root.
    pub path: String,
    /// Derivative (thumbnail) URL.
    pub thumbnail: String,
    /// Caption / alt text. Edited by hand in the manifest and preserved across runs.
    pub alt: String,
    pub year: String,
    pub month: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub exif: Metadata,
    /// Hex digest of the source file contents.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Capture instant in epoch seconds. Sort tie-breaker only.
    #[serde(skip)]
    pub timestamp: i64,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl PhotoRecord {
    /// File stem used for derivative names (`DSC_0001.jpg` → `DSC_0001`).
    pub fn stem(&self) -> &str {
        file_stem(&self.filename)
    }
}

/// Strip the last extension from a filename, keeping dotfiles intact.
pub fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[..pos],
        _ => filename,
    }
}

/// All photos captured in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearAlbum {
    pub year: String,
    pub photos: Vec<PhotoRecord>,
}

/// The persisted catalog: albums ordered by year, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub albums: Vec<YearAlbum>,
}

impl Manifest {
    pub fn photos(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.albums.iter().flat_map(|album| album.photos.iter())
    }

    pub fn photo_count(&self) -> usize {
        self.albums.iter().map(|album| album.photos.len()).sum()
    }
}
