//! The sync pipeline.
//!
//! One run, start to finish:
//!
//! 1. Scan the source tree and load the prior manifest.
//! 2. Fan the files out to the worker pool. Each worker hashes its file and
//!    either reuses the prior record or rebuilds it: upload the original,
//!    generate and upload the derivative, extract metadata, resolve the date.
//! 3. Group and sort the records, delete the store objects of photos that
//!    disappeared, and write + republish the manifest if it changed.
//!
//! Per-file failures never abort the run. A file that cannot be hashed is left
//! out of this run's manifest; every other failure degrades to a fallback
//! value and is logged.
//!
//! Progress is reported as [`SyncEvent`]s over an optional channel, the way
//! the CLI's printer thread consumes them.

use crate::change::{ChangeKind, SyncStats, classify, hash_file};
use crate::config::Config;
use crate::imaging::{DerivativeBackend, DerivativeParams, RustBackend};
use crate::manifest::{
    self, ManifestDiff, ManifestError, PersistOutcome, PriorManifest, build_albums, find_orphans,
};
use crate::metadata::{Extracted, MetadataExtractor, resolve_capture_date};
use crate::pool::{self, PoolError};
use crate::scan::{self, ScanError, SourceFile};
use crate::store::{
    ASSET_CACHE_CONTROL, DeleteReport, DirStore, MANIFEST_CACHE_CONTROL, MANIFEST_CONTENT_TYPE,
    ObjectMeta, RemoteSync, StoreLayout,
};
use crate::types::{Manifest, PhotoRecord, file_stem};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub source_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub web_root: PathBuf,
    pub derivative: DerivativeParams,
    pub max_workers: usize,
    /// Probe the store for unchanged files and rebuild those with missing objects.
    pub verify_remote: bool,
    /// Rebuild every record regardless of its hash.
    pub force: bool,
}

impl SyncOptions {
    pub fn from_config(config: &Config, force: bool) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            manifest_path: config.manifest_path.clone(),
            web_root: config.web_root.clone(),
            derivative: config.derivative_params(),
            max_workers: config.processing.max_workers,
            verify_remote: config.processing.verify_remote,
            force,
        }
    }
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started {
        files: usize,
        workers: usize,
    },
    Reused {
        filename: String,
    },
    Processed {
        filename: String,
        change: ChangeKind,
        date: String,
    },
    Failed {
        filename: String,
        error: String,
    },
    OrphanRemoved {
        filename: String,
    },
    ManifestUnchanged,
    ManifestWritten {
        path: PathBuf,
        backup: Option<PathBuf>,
        published: bool,
    },
}

/// Result of a completed run.
#[derive(Debug)]
pub struct SyncReport {
    pub manifest: Manifest,
    pub stats: SyncStats,
    pub diff: ManifestDiff,
    /// Filenames dropped because their source disappeared.
    pub orphans: Vec<String>,
    pub deletes: DeleteReport,
    pub outcome: PersistOutcome,
    /// Whether the manifest was uploaded to the store.
    pub published: bool,
}

/// Dry-run classification of the source tree.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncPlan {
    pub changes: Vec<(String, ChangeKind)>,
    pub orphaned: Vec<String>,
    /// Files that could not be hashed, with the error.
    pub failed: Vec<(String, String)>,
}

impl SyncPlan {
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|(_, k)| *k == kind).count()
    }
}

enum JobOutcome {
    Reused(PhotoRecord),
    Processed(PhotoRecord),
    Failed,
}

/// A configured sync run.
pub struct Pipeline {
    options: SyncOptions,
    extractor: Box<dyn MetadataExtractor>,
    backend: Box<dyn DerivativeBackend>,
    layout: StoreLayout,
    remote: Option<RemoteSync>,
}

impl Pipeline {
    /// `layout` is used for keys and fallback URLs even when `remote` is `None`.
    pub fn new(
        options: SyncOptions,
        extractor: Box<dyn MetadataExtractor>,
        backend: Box<dyn DerivativeBackend>,
        layout: StoreLayout,
        remote: Option<RemoteSync>,
    ) -> Self {
        Self {
            options,
            extractor,
            backend,
            layout,
            remote,
        }
    }

    /// Production wiring: configured extractor, pure-Rust imaging, and a
    /// [`DirStore`] when `store.mirror_dir` is set.
    pub fn from_config(config: &Config, force: bool) -> Self {
        let layout = config.store_layout();
        let remote = config.store.mirror_dir.as_ref().map(|dir| {
            let store = DirStore::new(dir, &config.store.endpoint, &config.store.bucket);
            RemoteSync::new(Box::new(store), layout.clone())
        });
        Self::new(
            SyncOptions::from_config(config, force),
            config.metadata.extractor.build(&config.metadata.exiftool_bin),
            Box::new(RustBackend::new()),
            layout,
            remote,
        )
    }

    pub fn has_store(&self) -> bool {
        self.remote.is_some()
    }

    /// Run the full pipeline.
    pub fn run(&self, events: Option<Sender<SyncEvent>>) -> Result<SyncReport, SyncError> {
        let emit = |event: SyncEvent| {
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
        };

        let files = scan::scan(&self.options.source_dir)?;
        let prior = manifest::load_prior(&self.options.manifest_path)?;
        info!(
            files = files.len(),
            prior = prior.records.len(),
            "starting sync"
        );
        emit(SyncEvent::Started {
            files: files.len(),
            workers: pool::worker_count(self.options.max_workers, files.len()),
        });

        let outcomes = pool::run(&files, self.options.max_workers, |file| {
            self.sync_file(file, &prior, &emit)
        })?;
        self.finish(&files, &prior, outcomes, &emit)
    }

    /// Tally job outcomes, reconcile orphans, then persist and publish.
    fn finish(
        &self,
        files: &[SourceFile],
        prior: &PriorManifest,
        outcomes: Vec<JobOutcome>,
        emit: &(dyn Fn(SyncEvent) + Sync),
    ) -> Result<SyncReport, SyncError> {
        let mut stats = SyncStats::default();
        let mut records = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                JobOutcome::Reused(record) => {
                    stats.reuse();
                    records.push(record);
                }
                JobOutcome::Processed(record) => {
                    stats.process();
                    records.push(record);
                }
                JobOutcome::Failed => stats.fail(),
            }
        }

        let manifest = build_albums(records);
        let diff = ManifestDiff::compute(&prior.records, &manifest);

        // Orphans are judged against the scan, not the records: a file that
        // merely failed this run keeps its objects.
        let orphans: Vec<String> =
            find_orphans(&prior.records, files.iter().map(|f| f.filename.as_str()))
                .into_iter()
                .map(str::to_string)
                .collect();
        for filename in &orphans {
            emit(SyncEvent::OrphanRemoved {
                filename: filename.clone(),
            });
        }
        let deletes = self.delete_orphans(&orphans);

        let content = manifest::to_json(&manifest)?;
        let outcome = manifest::persist(
            &self.options.manifest_path,
            prior.content.as_deref(),
            &content,
        )?;

        let published = match &outcome {
            PersistOutcome::Unchanged => {
                emit(SyncEvent::ManifestUnchanged);
                false
            }
            PersistOutcome::Written { backup } => {
                let published = self.publish_manifest(&content);
                emit(SyncEvent::ManifestWritten {
                    path: self.options.manifest_path.clone(),
                    backup: backup.clone(),
                    published,
                });
                published
            }
        };

        info!(%stats, "sync finished");
        Ok(SyncReport {
            manifest,
            stats,
            diff,
            orphans,
            deletes,
            outcome,
            published,
        })
    }

    /// Scan, hash and classify without extracting, uploading or writing.
    pub fn plan(&self) -> Result<SyncPlan, SyncError> {
        let files = scan::scan(&self.options.source_dir)?;
        let prior = manifest::load_prior(&self.options.manifest_path)?;

        let verdicts = pool::run(&files, self.options.max_workers, |file| {
            hash_file(&file.path)
                .map(|hash| self.classify(file, &hash, &prior))
                .map_err(|e| e.to_string())
        })?;

        let mut plan = SyncPlan::default();
        for (file, verdict) in files.iter().zip(verdicts) {
            match verdict {
                Ok(kind) => plan.changes.push((file.filename.clone(), kind)),
                Err(error) => plan.failed.push((file.filename.clone(), error)),
            }
        }
        plan.orphaned = find_orphans(&prior.records, files.iter().map(|f| f.filename.as_str()))
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(plan)
    }

    fn classify(&self, file: &SourceFile, hash: &str, prior: &PriorManifest) -> ChangeKind {
        let kind = classify(hash, prior.get(&file.filename), self.options.force);
        if kind != ChangeKind::Unchanged || !self.options.verify_remote {
            return kind;
        }
        match &self.remote {
            Some(remote)
                if !remote.exists(&self.layout.original_key(&file.filename))
                    || !remote.exists(&self.layout.derivative_key(file_stem(&file.filename))) =>
            {
                ChangeKind::MissingRemote
            }
            _ => kind,
        }
    }

    fn sync_file(
        &self,
        file: &SourceFile,
        prior: &PriorManifest,
        emit: &(dyn Fn(SyncEvent) + Sync),
    ) -> JobOutcome {
        let hash = match hash_file(&file.path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "cannot hash file, skipping");
                emit(SyncEvent::Failed {
                    filename: file.filename.clone(),
                    error: e.to_string(),
                });
                return JobOutcome::Failed;
            }
        };

        let change = self.classify(file, &hash, prior);
        let previous = prior.get(&file.filename);
        if !change.needs_processing()
            && let Some(record) = previous
        {
            debug!(file = %file.filename, "unchanged");
            emit(SyncEvent::Reused {
                filename: file.filename.clone(),
            });
            return JobOutcome::Reused(record.clone());
        }

        let record = self.build_record(file, hash, previous);
        emit(SyncEvent::Processed {
            filename: file.filename.clone(),
            change,
            date: record.date.clone(),
        });
        JobOutcome::Processed(record)
    }

    fn build_record(
        &self,
        file: &SourceFile,
        hash: String,
        previous: Option<&PhotoRecord>,
    ) -> PhotoRecord {
        let (path, thumbnail) = self.publish_assets(file);

        let extracted = match self.extractor.extract(&file.path) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(file = %file.filename, error = %e, "metadata extraction failed");
                Extracted::default()
            }
        };
        let date = resolve_capture_date(extracted.captured_at, &file.filename, &file.year_dir);

        PhotoRecord {
            filename: file.filename.clone(),
            path,
            thumbnail,
            alt: previous.map(|p| p.alt.clone()).unwrap_or_default(),
            year: date.year,
            month: date.month,
            date: date.date,
            width: extracted.width,
            height: extracted.height,
            exif: extracted.metadata,
            hash,
            timestamp: date.timestamp,
        }
    }

    /// Upload the original and its derivative. Returns the (original,
    /// derivative) references, falling back per object on failure.
    fn publish_assets(&self, file: &SourceFile) -> (String, String) {
        let stem = file_stem(&file.filename);
        let local = web_path(&file.path, &self.options.web_root);
        let fallback_thumbnail = self.layout.fallback_derivative_url(stem);

        let Some(remote) = &self.remote else {
            return (local, fallback_thumbnail);
        };

        let original_key = self.layout.original_key(&file.filename);
        let path = match remote.upload_file(&file.path, &original_key) {
            Ok(()) => remote.public_url(&original_key),
            Err(e) => {
                warn!(file = %file.filename, error = %e, "original upload failed, using local path");
                local
            }
        };

        let params = &self.options.derivative;
        let thumbnail = match self.backend.generate(&file.path, params) {
            Ok(bytes) => {
                let key = self.layout.derivative_key(stem);
                let meta = ObjectMeta {
                    content_type: params.format.content_type(),
                    cache_control: ASSET_CACHE_CONTROL,
                };
                match remote.upload_bytes(&bytes, &key, meta) {
                    Ok(()) => remote.public_url(&key),
                    Err(e) => {
                        warn!(file = %file.filename, error = %e, "derivative upload failed");
                        fallback_thumbnail
                    }
                }
            }
            Err(e) => {
                warn!(file = %file.filename, error = %e, "derivative generation failed");
                fallback_thumbnail
            }
        };

        (path, thumbnail)
    }

    fn delete_orphans(&self, orphans: &[String]) -> DeleteReport {
        let Some(remote) = &self.remote else {
            return DeleteReport::default();
        };
        let keys: Vec<String> = orphans
            .iter()
            .flat_map(|name| {
                [
                    self.layout.original_key(name),
                    self.layout.derivative_key(file_stem(name)),
                ]
            })
            .collect();
        if !keys.is_empty() {
            info!(count = keys.len(), "deleting orphaned objects");
        }
        remote.delete(&keys)
    }

    fn publish_manifest(&self, content: &[u8]) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };
        let meta = ObjectMeta {
            content_type: MANIFEST_CONTENT_TYPE,
            cache_control: MANIFEST_CACHE_CONTROL,
        };
        match remote.upload_bytes(content, &self.layout.manifest_key(), meta) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "manifest upload failed");
                false
            }
        }
    }
}

/// `path` relative to `web_root` with forward slashes. Paths outside the web
/// root are kept whole.
fn web_path(path: &Path, web_root: &Path) -> String {
    path.strip_prefix(web_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
