//! Manifest loading, assembly, diffing and persistence.
//!
//! The manifest is read once at the start of a run to seed change detection
//! and caption carry-forward, and rebuilt from scratch at the end from the
//! per-file records. Writing is conditional: when the rebuilt catalog is
//! structurally equal to the file on disk nothing is touched, which keeps
//! re-runs free of churn (no backup, no rewrite, no republish).
//!
//! When the catalog did change:
//!
//! ```text
//! photos.json                       -> photos.json.20240501_101500.bak   (old content)
//! photos.json.tmp  (new content)    -> photos.json                        (rename)
//! ```
//!
//! The backup is best-effort; the rename is what guarantees readers never see
//! a half-written manifest.

use crate::metadata::dating::parse_exif_datetime;
use crate::types::{Manifest, PhotoRecord, YearAlbum};
use chrono::Local;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read manifest {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write manifest {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Timestamp layout of backup file suffixes.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// The manifest as it was before this run.
#[derive(Debug, Default)]
pub struct PriorManifest {
    /// Raw file content, when the file existed.
    pub content: Option<Vec<u8>>,
    /// Records keyed by filename. Empty if the file was absent or unparsable.
    pub records: HashMap<String, PhotoRecord>,
}

impl PriorManifest {
    pub fn get(&self, filename: &str) -> Option<&PhotoRecord> {
        self.records.get(filename)
    }
}

/// Load the previous manifest.
///
/// A missing file is an empty history. A file that exists but cannot be read
/// is an error. A file that does not parse is logged and treated as empty, but
/// its content is kept so it still gets backed up before being replaced.
pub fn load_prior(path: &Path) -> Result<PriorManifest, ManifestError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PriorManifest::default()),
        Err(source) => {
            return Err(ManifestError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records = match serde_json::from_slice::<Manifest>(&content) {
        Ok(manifest) => index_records(manifest),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "existing manifest unreadable, starting fresh");
            HashMap::new()
        }
    };

    Ok(PriorManifest {
        content: Some(content),
        records,
    })
}

fn index_records(manifest: Manifest) -> HashMap<String, PhotoRecord> {
    let mut records = HashMap::new();
    for mut record in manifest.albums.into_iter().flat_map(|album| album.photos) {
        if let Some(taken) = capture_instant(&record) {
            record.timestamp = taken.and_utc().timestamp();
        }
        if let Some(previous) = records.insert(record.filename.clone(), record) {
            warn!(
                filename = %previous.filename,
                "manifest lists filename twice, keeping the later record"
            );
        }
    }
    records
}

/// Capture instant recorded in a record's metadata, in the order extraction
/// prefers: `DateTimeOriginal`, then `CreateDate`.
fn capture_instant(record: &PhotoRecord) -> Option<chrono::NaiveDateTime> {
    [&record.exif.date_time_original, &record.exif.create_date]
        .into_iter()
        .filter_map(|raw| raw.as_deref())
        .find_map(parse_exif_datetime)
}

/// Newest first: date, then capture instant, then filename, all descending.
fn newest_first(a: &PhotoRecord, b: &PhotoRecord) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| b.filename.cmp(&a.filename))
}

/// Group records into year albums, newest year first, each sorted newest first.
pub fn build_albums(records: Vec<PhotoRecord>) -> Manifest {
    let mut by_year: BTreeMap<String, Vec<PhotoRecord>> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year.clone()).or_default().push(record);
    }

    let albums = by_year
        .into_iter()
        .rev()
        .map(|(year, mut photos)| {
            photos.sort_by(newest_first);
            YearAlbum { year, photos }
        })
        .collect();

    Manifest { albums }
}

/// Prior filenames that are not in `present`, sorted.
pub fn find_orphans<'a, 'b>(
    prior: &'a HashMap<String, PhotoRecord>,
    present: impl IntoIterator<Item = &'b str>,
) -> Vec<&'a str> {
    let present: BTreeSet<&str> = present.into_iter().collect();
    let mut orphans: Vec<&str> = prior
        .keys()
        .map(String::as_str)
        .filter(|name| !present.contains(name))
        .collect();
    orphans.sort_unstable();
    orphans
}

/// Filenames added, removed and updated relative to the prior records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManifestDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Present in both, with any persisted field different.
    pub updated: Vec<String>,
}

impl ManifestDiff {
    pub fn compute(prior: &HashMap<String, PhotoRecord>, current: &Manifest) -> Self {
        let mut diff = Self::default();
        for record in current.photos() {
            match prior.get(&record.filename) {
                None => diff.added.push(record.filename.clone()),
                Some(old) if old != record => diff.updated.push(record.filename.clone()),
                Some(_) => {}
            }
        }
        diff.removed = find_orphans(prior, current.photos().map(|p| p.filename.as_str()))
            .into_iter()
            .map(str::to_string)
            .collect();
        diff.added.sort();
        diff.updated.sort();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Compact JSON, the on-disk and published form.
pub fn to_json(manifest: &Manifest) -> Result<Vec<u8>, ManifestError> {
    Ok(serde_json::to_vec(manifest)?)
}

/// Whether two manifest serializations describe the same JSON value.
/// Unparsable input is never equal to anything.
pub fn structurally_equal(old: &[u8], new: &[u8]) -> bool {
    match (
        serde_json::from_slice::<serde_json::Value>(old),
        serde_json::from_slice::<serde_json::Value>(new),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `<manifest>.<YYYYMMDD_HHMMSS>.bak` beside the manifest.
pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{stamp}.bak"));
    path.with_file_name(name)
}

/// What [`persist`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Unchanged,
    Written { backup: Option<PathBuf> },
}

/// Write `new_content` to `path` unless it equals `prior` structurally.
///
/// When prior content exists it is backed up first; a failed backup is logged
/// and does not stop the write.
pub fn persist(
    path: &Path,
    prior: Option<&[u8]>,
    new_content: &[u8],
) -> Result<PersistOutcome, ManifestError> {
    if prior.is_some_and(|old| structurally_equal(old, new_content)) {
        return Ok(PersistOutcome::Unchanged);
    }

    let backup = prior.and_then(|old| {
        let target = backup_path(path, &Local::now().format(BACKUP_STAMP_FORMAT).to_string());
        match std::fs::write(&target, old) {
            Ok(()) => Some(target),
            Err(e) => {
                warn!(path = %target.display(), error = %e, "manifest backup failed");
                None
            }
        }
    });

    write_atomic(path, new_content)?;
    Ok(PersistOutcome::Written { backup })
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ManifestError> {
    let write_error = |source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, content).map_err(write_error)?;
    std::fs::rename(&tmp, path).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::record;
    use std::fs;
    use tempfile::TempDir;

    fn backups(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".bak"))
            .collect();
        found.sort();
        found
    }

    // =========================================================================
    // load_prior
    // =========================================================================

    #[test]
    fn missing_manifest_is_empty_history() {
        let tmp = TempDir::new().unwrap();
        let prior = load_prior(&tmp.path().join("photos.json")).unwrap();
        assert!(prior.content.is_none());
        assert!(prior.records.is_empty());
    }

    #[test]
    fn unparsable_manifest_keeps_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.json");
        fs::write(&path, b"{ not a manifest").unwrap();

        let prior = load_prior(&path).unwrap();
        assert_eq!(prior.content.as_deref(), Some(&b"{ not a manifest"[..]));
        assert!(prior.records.is_empty());
    }

    #[test]
    fn unreadable_manifest_is_error() {
        let tmp = TempDir::new().unwrap();
        // A directory in place of the file cannot be read as one.
        let path = tmp.path().join("photos.json");
        fs::create_dir(&path).unwrap();
        assert!(matches!(load_prior(&path), Err(ManifestError::Read { .. })));
    }

    #[test]
    fn loads_records_and_restores_timestamp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.json");
        let mut a = record("a.jpg", "2024-05-01");
        a.exif.date_time_original = Some("2024:05:01 10:00:00".into());
        a.alt = "Pier".into();
        let b = record("b.jpg", "2023-01-01");
        let manifest = build_albums(vec![a, b]);
        fs::write(&path, to_json(&manifest).unwrap()).unwrap();

        let prior = load_prior(&path).unwrap();
        assert_eq!(prior.records.len(), 2);
        let a = prior.get("a.jpg").unwrap();
        assert_eq!(a.timestamp, 1_714_557_600);
        assert_eq!(a.alt, "Pier");
        assert_eq!(prior.get("b.jpg").unwrap().timestamp, 0);
    }

    #[test]
    fn timestamp_falls_back_to_create_date() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.json");
        let mut a = record("a.jpg", "2024-05-01");
        a.exif.create_date = Some("2024:05:01 10:00:00".into());
        let mut b = record("b.jpg", "2024-05-01");
        b.exif.date_time_original = Some("not a date".into());
        b.exif.create_date = Some("2024:05:01 08:00:00".into());
        fs::write(&path, to_json(&build_albums(vec![a, b])).unwrap()).unwrap();

        let prior = load_prior(&path).unwrap();
        assert_eq!(prior.get("a.jpg").unwrap().timestamp, 1_714_557_600);
        assert_eq!(prior.get("b.jpg").unwrap().timestamp, 1_714_550_400);
    }

    #[test]
    fn repeated_filename_keeps_later_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.json");
        let mut first = record("a.jpg", "2024-05-01");
        first.alt = "first".into();
        let mut second = record("a.jpg", "2019-01-01");
        second.alt = "second".into();
        let manifest = Manifest {
            albums: vec![
                YearAlbum {
                    year: "2024".into(),
                    photos: vec![first],
                },
                YearAlbum {
                    year: "2019".into(),
                    photos: vec![second],
                },
            ],
        };
        fs::write(&path, to_json(&manifest).unwrap()).unwrap();

        let prior = load_prior(&path).unwrap();
        assert_eq!(prior.records.len(), 1);
        assert_eq!(prior.get("a.jpg").unwrap().alt, "second");
    }

    // =========================================================================
    // build_albums
    // =========================================================================

    #[test]
    fn years_descending() {
        let manifest = build_albums(vec![
            record("a.jpg", "2019-01-01"),
            record("b.jpg", "2024-01-01"),
            record("c.jpg", "2021-01-01"),
        ]);
        let years: Vec<&str> = manifest.albums.iter().map(|a| a.year.as_str()).collect();
        assert_eq!(years, vec!["2024", "2021", "2019"]);
    }

    #[test]
    fn photos_sorted_by_date_instant_filename() {
        let mut early = record("z.jpg", "2024-05-01");
        early.timestamp = 100;
        let mut late = record("a.jpg", "2024-05-01");
        late.timestamp = 200;
        let tie_b = record("b.jpg", "2024-03-01");
        let tie_c = record("c.jpg", "2024-03-01");
        let newest = record("m.jpg", "2024-12-31");

        let manifest = build_albums(vec![early, tie_b, late, newest, tie_c]);
        let order: Vec<&str> = manifest.photos().map(|p| p.filename.as_str()).collect();
        assert_eq!(order, vec!["m.jpg", "a.jpg", "z.jpg", "c.jpg", "b.jpg"]);
    }

    #[test]
    fn empty_records_empty_manifest() {
        let manifest = build_albums(Vec::new());
        assert!(manifest.albums.is_empty());
        assert_eq!(to_json(&manifest).unwrap(), b"[]");
    }

    // =========================================================================
    // orphans and diff
    // =========================================================================

    fn prior_of(records: Vec<PhotoRecord>) -> HashMap<String, PhotoRecord> {
        records
            .into_iter()
            .map(|r| (r.filename.clone(), r))
            .collect()
    }

    #[test]
    fn orphans_are_prior_minus_current() {
        let prior = prior_of(vec![
            record("keep.jpg", "2024-01-01"),
            record("gone2.jpg", "2024-01-01"),
            record("gone1.jpg", "2023-01-01"),
        ]);
        assert_eq!(
            find_orphans(&prior, ["keep.jpg", "new.jpg"]),
            vec!["gone1.jpg", "gone2.jpg"]
        );
    }

    #[test]
    fn diff_classifies_filenames() {
        let prior = prior_of(vec![
            record("same.jpg", "2024-01-01"),
            record("edited.jpg", "2024-01-01"),
            record("gone.jpg", "2024-01-01"),
        ]);
        let mut edited = record("edited.jpg", "2024-01-01");
        edited.hash = "new".into();
        let current = build_albums(vec![
            record("same.jpg", "2024-01-01"),
            edited,
            record("fresh.jpg", "2024-02-01"),
        ]);

        let diff = ManifestDiff::compute(&prior, &current);
        assert_eq!(diff.added, vec!["fresh.jpg"]);
        assert_eq!(diff.removed, vec!["gone.jpg"]);
        assert_eq!(diff.updated, vec!["edited.jpg"]);
        assert!(!diff.is_empty());
    }

    #[test]
    fn identical_records_empty_diff() {
        let prior = prior_of(vec![record("a.jpg", "2024-01-01")]);
        let current = build_albums(vec![record("a.jpg", "2024-01-01")]);
        assert!(ManifestDiff::compute(&prior, &current).is_empty());
    }

    // =========================================================================
    // structural comparison
    // =========================================================================

    #[test]
    fn whitespace_and_key_order_ignored() {
        assert!(structurally_equal(
            br#"[{"year":"2024","photos":[]}]"#,
            b"[ { \"photos\" : [], \"year\" : \"2024\" } ]"
        ));
        assert!(!structurally_equal(
            br#"[{"year":"2024","photos":[]}]"#,
            br#"[{"year":"2023","photos":[]}]"#
        ));
        assert!(!structurally_equal(b"garbage", b"[]"));
    }

    // =========================================================================
    // persist
    // =========================================================================

    #[test]
    fn first_write_has_no_backup() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site/photos.json");

        let outcome = persist(&path, None, b"[]").unwrap();
        assert_eq!(outcome, PersistOutcome::Written { backup: None });
        assert_eq!(fs::read(&path).unwrap(), b"[]");
        assert!(!tmp.path().join("site/photos.json.tmp").exists());
    }

    #[test]
    fn unchanged_content_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.json");
        fs::write(&path, b"[ ]").unwrap();

        let outcome = persist(&path, Some(b"[ ]"), b"[]").unwrap();
        assert_eq!(outcome, PersistOutcome::Unchanged);
        assert_eq!(fs::read(&path).unwrap(), b"[ ]");
        assert!(backups(tmp.path()).is_empty());
    }

    #[test]
    fn changed_content_backed_up_then_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photos.json");
        let old = br#"[{"year":"2023","photos":[]}]"#;
        fs::write(&path, old).unwrap();

        let outcome = persist(&path, Some(old), br#"[{"year":"2024","photos":[]}]"#).unwrap();
        let PersistOutcome::Written {
            backup: Some(backup),
        } = outcome
        else {
            panic!("expected a backup, got {outcome:?}");
        };
        assert_eq!(fs::read(&backup).unwrap(), old);
        assert_eq!(backups(tmp.path()), vec![backup.clone()]);
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("photos.json."), "{name}");
        // photos.json.YYYYMMDD_HHMMSS.bak
        assert_eq!(name.len(), "photos.json.".len() + 15 + ".bak".len());
        assert_eq!(
            fs::read(&path).unwrap(),
            br#"[{"year":"2024","photos":[]}]"#
        );
    }

    #[test]
    fn backup_path_format() {
        assert_eq!(
            backup_path(Path::new("web/photos.json"), "20240501_101500"),
            PathBuf::from("web/photos.json.20240501_101500.bak")
        );
    }
}
