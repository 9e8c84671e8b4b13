//! # photosync
//!
//! An incremental build step that turns a tree of photos into the JSON catalog
//! a static gallery front end renders, while mirroring originals and
//! thumbnails to an object store.
//!
//! # Architecture: One Idempotent Pass
//!
//! ```text
//! gallery_images/  ──scan──▶  jobs  ──pool──▶  records  ──manifest──▶  photos.json
//!                                      │                                   │
//!                                      └── originals + thumbnails ──▶ store ◀┘
//! ```
//!
//! Every run rebuilds the catalog from scratch, but only photos whose content
//! hash changed are actually reprocessed; everything else is copied from the
//! previous catalog. A re-run over an unchanged tree therefore uploads nothing
//! and leaves the catalog byte-for-byte alone.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Enumerates photos under the year directories, rejects duplicate filenames |
//! | [`change`] | SHA-256 content hashing and unchanged / new / modified classification |
//! | [`metadata`] | EXIF extraction (in-process or `exiftool`), normalization, capture dating |
//! | [`imaging`] | Thumbnail generation: decode, width-capped resize, WebP/JPEG encode |
//! | [`store`] | Object store trait, key layout, uploads, batch deletes, public URLs |
//! | [`pool`] | Bounded rayon worker pool for per-photo jobs |
//! | [`manifest`] | Prior catalog loading, year grouping and ordering, diffing, atomic writes |
//! | [`sync`] | The pipeline tying the above together, plus the dry-run plan |
//! | [`config`] | `photosync.toml` loading, validation, merging, environment overlay |
//! | [`types`] | Catalog types persisted in `photos.json` |
//! | [`output`] | CLI output formatting for sync progress and check results |
//!
//! # Design Decisions
//!
//! ## Filenames Are Identities
//!
//! Records are matched across runs by filename, not path. Moving a photo
//! between folders keeps its caption; two photos sharing a filename is an
//! error, caught before anything is processed.
//!
//! ## Content Hashes Over Timestamps
//!
//! Modification times do not survive a fresh checkout or a copy between
//! machines. Hashing every file costs a read per photo per run, which is
//! small next to decoding and re-encoding.
//!
//! ## Failures Degrade, They Don't Abort
//!
//! A failed upload falls back to a local path, a failed thumbnail to its
//! expected CDN URL, failed extraction to the filename or directory date. Only
//! problems that would make the catalog wrong as a whole (unreadable source
//! root, duplicate filenames, an unreadable catalog, invalid configuration)
//! stop a run.

pub mod change;
pub mod config;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod pool;
pub mod scan;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
