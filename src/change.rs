//! Content-hash change detection.
//!
//! Reprocessing a photo means re-reading its metadata, re-encoding the
//! derivative and re-uploading both objects. This module decides when that
//! work can be skipped: the prior manifest records the SHA-256 of every
//! source file, and a file whose current hash matches is reused verbatim.
//!
//! Content hashes rather than modification times, so a fresh checkout or a
//! copy between machines does not invalidate anything. Renaming a file does:
//! records are keyed by filename.
//!
//! A record without a hash (written by an older tool, or hand-edited) never
//! matches, so it is reprocessed once and carries a hash from then on.

use crate::types::PhotoRecord;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Why a file does or does not need work this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Same content as the prior record; reuse it.
    Unchanged,
    /// No prior record under this filename.
    New,
    /// Prior record exists but its hash differs or is missing.
    Modified,
    /// Unchanged, but reprocessing was requested.
    Forced,
    /// Unchanged locally, but an object is missing from the store.
    MissingRemote,
}

impl ChangeKind {
    pub fn needs_processing(self) -> bool {
        self != Self::Unchanged
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::New => "new",
            Self::Modified => "modified",
            Self::Forced => "forced",
            Self::MissingRemote => "missing remote",
        }
    }
}

/// Classify a file by its current content hash against the prior record.
pub fn classify(hash: &str, prior: Option<&PhotoRecord>, force: bool) -> ChangeKind {
    match prior {
        None => ChangeKind::New,
        Some(record) if record.hash.is_empty() || record.hash != hash => ChangeKind::Modified,
        Some(_) if force => ChangeKind::Forced,
        Some(_) => ChangeKind::Unchanged,
    }
}

/// Per-run tally of job outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub reused: u32,
    pub processed: u32,
    pub failed: u32,
}

impl SyncStats {
    pub fn reuse(&mut self) {
        self.reused += 1;
    }

    pub fn process(&mut self) {
        self.processed += 1;
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u32 {
        self.reused + self.processed + self.failed
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reused, {} processed, {} failed ({} total)",
            self.reused,
            self.processed,
            self.failed,
            self.total()
        )
    }
}
