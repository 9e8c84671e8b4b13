//! Capture metadata: extraction, normalization, and capture-date resolution.
//!
//! Two interchangeable extractors read a photo's embedded metadata:
//!
//! | Extractor | Source | Notes |
//! |---|---|---|
//! | [`NativeExtractor`] | `kamadak-exif`, in process | Raw tag values, decoded XP text tags |
//! | [`ExifToolExtractor`] | `exiftool -json` subprocess | Pre-formatted labels, fixed allow-list |
//!
//! Both funnel their raw values through [`normalize`](normalize::normalize),
//! so a manifest entry looks the same whichever one produced it. The choice is
//! made once per run ([`ExtractorKind`]) and injected into the pipeline as a
//! `Box<dyn MetadataExtractor>`.
//!
//! Extraction failures are never fatal. The pipeline logs them, falls back to
//! the filename / directory date chain in [`dating`], and stores empty metadata.

pub mod codes;
pub mod dating;
pub mod exiftool;
pub mod native;
pub mod normalize;
mod schema;

pub use dating::{CaptureDate, DateSource, resolve_capture_date};
pub use exiftool::ExifToolExtractor;
pub use native::NativeExtractor;
pub use schema::{CANONICAL_KEYS, MetaValue, Metadata};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
    #[error("failed to run {}: {source}", bin.display())]
    Spawn {
        bin: PathBuf,
        source: std::io::Error,
    },
    #[error("exiftool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },
    #[error("unparsable exiftool output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("exiftool returned no entries")]
    EmptyOutput,
}

/// Everything an extractor learns about one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub metadata: Metadata,
    /// Pixel dimensions, zero when unknown.
    pub width: u32,
    pub height: u32,
    /// Embedded capture instant, read as UTC.
    pub captured_at: Option<NaiveDateTime>,
}

/// A metadata source. `Send + Sync` so one instance serves every worker.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Extracted, ExtractError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    Native,
    #[default]
    #[serde(rename = "exiftool")]
    ExifTool,
}

impl ExtractorKind {
    /// Build the extractor this kind names.
    pub fn build(self, exiftool_bin: &Path) -> Box<dyn MetadataExtractor> {
        match self {
            Self::Native => Box::new(NativeExtractor::new()),
            Self::ExifTool => Box::new(ExifToolExtractor::new(exiftool_bin)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::ExifTool => "exiftool",
        }
    }
}
