//! Source tree scanning.
//!
//! The first step of a sync run. Enumerates candidate photos under the source
//! root and turns each into a job for the worker pool.
//!
//! ## Directory Structure
//!
//! ```text
//! gallery_images/                  # Source root
//! ├── 2019/                        # Year directory
//! │   ├── DSC_0042.jpg
//! │   └── trip/                    # Nested folders are walked too
//! │       └── DSC_0050.JPG
//! ├── 2024/
//! │   └── DSC_2024-05-01_pier.webp
//! └── notes.txt                    # Files at the root are ignored
//! ```
//!
//! The immediate subdirectory a file lives under is its *year directory*. Its
//! name is only used as the last-resort capture year when neither embedded
//! metadata nor the filename yields a date.
//!
//! ## Validation
//!
//! - The root must be readable; anything else aborts the run.
//! - Filenames are the identity of manifest records, so the same filename
//!   in two places is an error rather than a silent overwrite.
//! - Unreadable entries below a year directory are logged and skipped.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read source directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("duplicate filename {name}: {first} and {second}")]
    DuplicateFilename {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Supported image extensions, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// One candidate photo.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
    pub filename: String,
    /// Name of the top-level directory the file was found under.
    pub year_dir: String,
}

/// Enumerate every image below the year directories of `root`, sorted by path.
pub fn scan(root: &Path) -> Result<Vec<SourceFile>, ScanError> {
    let unreadable = |source| ScanError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };

    let mut year_dirs: Vec<(String, PathBuf)> = fs::read_dir(root)
        .map_err(unreadable)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            (!name.starts_with('.')).then(|| (name, e.path()))
        })
        .collect();
    year_dirs.sort();

    let mut files = Vec::new();
    for (year_dir, dir) in &year_dirs {
        collect_images(dir, year_dir, &mut files);
    }

    check_unique(&files)?;
    files.sort();
    Ok(files)
}

fn collect_images(dir: &Path, year_dir: &str, out: &mut Vec<SourceFile>) {
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        let Some(filename) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 filename");
            continue;
        };
        out.push(SourceFile {
            path: entry.path().to_path_buf(),
            filename: filename.to_string(),
            year_dir: year_dir.to_string(),
        });
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

fn check_unique(files: &[SourceFile]) -> Result<(), ScanError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for file in files {
        if let Some(first) = seen.insert(&file.filename, &file.path) {
            return Err(ScanError::DuplicateFilename {
                name: file.filename.clone(),
                first: first.to_path_buf(),
                second: file.path.clone(),
            });
        }
    }
    Ok(())
}
