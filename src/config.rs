//! Configuration module.
//!
//! Handles loading, validating, and merging `photosync.toml`. Stock defaults
//! are serialized to a TOML value, the user file is merged on top key by key,
//! and the result is deserialized with unknown keys rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "web/photography/gallery_images"   # Year directories live here
//! manifest_path = "web/photography/photos.json"   # Catalog read and written each run
//! web_root = "web/photography"                     # Local paths are relative to this
//!
//! [derivatives]
//! max_width = 800         # Wider sources are scaled down, never up
//! quality = 85            # 1-100
//! format = "webp"         # or "jpeg"
//!
//! [metadata]
//! extractor = "exiftool"  # or "native"
//! exiftool_bin = "exiftool"
//!
//! [processing]
//! max_workers = 10
//! verify_remote = false   # Re-upload unchanged photos whose objects are missing
//!
//! [store]
//! mirror_dir = "/mnt/bucket"   # Unset = no store, local paths only
//! endpoint = ""
//! bucket = ""
//! region = ""
//! access_key_id = ""       # Prefer the environment for keys
//! secret_access_key = ""
//! cdn_url = ""
//! base_prefix = "photos/"
//! original_prefix = "originals/"
//! thumbnail_prefix = "thumbnails/"
//! ```
//!
//! ## Environment
//!
//! Store settings can also come from the environment, which wins over the
//! file. A `.env` (or `scripts/.env`) is loaded first without overriding
//! variables that are already set. See [`Config::apply_env`].
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DerivativeFormat, DerivativeParams, Quality};
use crate::metadata::ExtractorKind;
use crate::store::StoreLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "photosync.toml";

/// Where `.env` files are looked for, first match wins.
pub const DOTENV_CANDIDATES: &[&str] = &[".env", "scripts/.env"];

/// Environment variables for each store setting, highest priority first.
pub const ENV_STORE_DIR: &[&str] = &["PHOTOSYNC_STORE_DIR"];
pub const ENV_ENDPOINT: &[&str] = &["NUXT_PROVIDER_S3_ENDPOINT", "R2_ENDPOINT"];
pub const ENV_BUCKET: &[&str] = &["NUXT_PROVIDER_S3_BUCKET", "R2_BUCKET"];
pub const ENV_REGION: &[&str] = &["NUXT_PROVIDER_S3_REGION", "R2_REGION"];
pub const ENV_ACCESS_KEY_ID: &[&str] = &["NUXT_PROVIDER_S3_ACCESS_KEY_ID", "R2_ACCESS_KEY_ID"];
pub const ENV_SECRET_ACCESS_KEY: &[&str] =
    &["NUXT_PROVIDER_S3_SECRET_ACCESS_KEY", "R2_SECRET_ACCESS_KEY"];
pub const ENV_CDN_URL: &[&str] = &["NUXT_PROVIDER_S3_CDN_URL", "R2_CDN_URL"];
pub const ENV_BASE_PREFIX: &[&str] = &["NUXT_PROVIDER_S3_BASE_PREFIX", "R2_BASE_PREFIX"];
pub const ENV_ORIGINAL_PREFIX: &[&str] =
    &["NUXT_PROVIDER_S3_ORIGINAL_PREFIX", "R2_ORIGINAL_PREFIX"];
pub const ENV_THUMBNAIL_PREFIX: &[&str] = &[
    "NUXT_PROVIDER_S3_PREFIX_THUMBNAIL_BASE",
    "R2_THUMBNAIL_PREFIX",
];

/// Tool configuration loaded from `photosync.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the year directories.
    pub source_dir: PathBuf,
    /// Manifest file read and written each run.
    pub manifest_path: PathBuf,
    /// Base for local paths recorded when an original is not mirrored.
    pub web_root: PathBuf,
    pub derivatives: DerivativesConfig,
    pub metadata: MetadataConfig,
    pub processing: ProcessingConfig,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("web/photography/gallery_images"),
            manifest_path: PathBuf::from("web/photography/photos.json"),
            web_root: PathBuf::from("web/photography"),
            derivatives: DerivativesConfig::default(),
            metadata: MetadataConfig::default(),
            processing: ProcessingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Derivative (thumbnail) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Width cap in pixels.
    pub max_width: u32,
    /// Lossy encoding quality (1-100).
    pub quality: u32,
    pub format: DerivativeFormat,
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            quality: 85,
            format: DerivativeFormat::WebP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub extractor: ExtractorKind,
    /// Command name or path of the `exiftool` binary.
    pub exiftool_bin: PathBuf,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::ExifTool,
            exiftool_bin: PathBuf::from("exiftool"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound on worker threads; runs with fewer jobs use fewer.
    pub max_workers: usize,
    /// Probe the store for unchanged photos and re-upload missing objects.
    pub verify_remote: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            verify_remote: false,
        }
    }
}

/// Object store settings. Without `mirror_dir` no store is used.
///
/// `region` and the access keys are resolved for store clients that sign
/// requests. The directory store has no wire protocol and ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<PathBuf>,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub cdn_url: String,
    pub base_prefix: String,
    pub original_prefix: String,
    pub thumbnail_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mirror_dir: None,
            endpoint: String::new(),
            bucket: String::new(),
            region: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            cdn_url: String::new(),
            base_prefix: "photos/".to_string(),
            original_prefix: "originals/".to_string(),
            thumbnail_prefix: "thumbnails/".to_string(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.derivatives.quality) {
            return Err(ConfigError::Validation(
                "derivatives.quality must be 1-100".into(),
            ));
        }
        if self.derivatives.max_width == 0 {
            return Err(ConfigError::Validation(
                "derivatives.max_width must be non-zero".into(),
            ));
        }
        if self.processing.max_workers == 0 {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        if self.source_dir.as_os_str().is_empty() || self.manifest_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "source_dir and manifest_path must be set".into(),
            ));
        }
        for (name, prefix) in [
            ("store.base_prefix", &self.store.base_prefix),
            ("store.original_prefix", &self.store.original_prefix),
            ("store.thumbnail_prefix", &self.store.thumbnail_prefix),
        ] {
            if prefix.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{name} must be relative, got {prefix:?}"
                )));
            }
        }
        Ok(())
    }

    /// Overlay store settings from the environment.
    ///
    /// Each setting takes the first non-empty variable in its list, else the
    /// configured value, else the stock default. `lookup` is `std::env::var`
    /// in the binary and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
        };
        let defaults = StoreConfig::default();
        let store = &mut self.store;

        if let Some(dir) = first(ENV_STORE_DIR) {
            store.mirror_dir = Some(PathBuf::from(dir));
        }
        resolve(&mut store.endpoint, first(ENV_ENDPOINT), &defaults.endpoint);
        resolve(&mut store.bucket, first(ENV_BUCKET), &defaults.bucket);
        resolve(&mut store.region, first(ENV_REGION), &defaults.region);
        resolve(
            &mut store.access_key_id,
            first(ENV_ACCESS_KEY_ID),
            &defaults.access_key_id,
        );
        resolve(
            &mut store.secret_access_key,
            first(ENV_SECRET_ACCESS_KEY),
            &defaults.secret_access_key,
        );
        resolve(&mut store.cdn_url, first(ENV_CDN_URL), &defaults.cdn_url);
        resolve(
            &mut store.base_prefix,
            first(ENV_BASE_PREFIX),
            &defaults.base_prefix,
        );
        resolve(
            &mut store.original_prefix,
            first(ENV_ORIGINAL_PREFIX),
            &defaults.original_prefix,
        );
        resolve(
            &mut store.thumbnail_prefix,
            first(ENV_THUMBNAIL_PREFIX),
            &defaults.thumbnail_prefix,
        );
    }

    pub fn derivative_params(&self) -> DerivativeParams {
        DerivativeParams {
            max_width: self.derivatives.max_width,
            quality: Quality::new(self.derivatives.quality),
            format: self.derivatives.format,
        }
    }

    pub fn store_layout(&self) -> StoreLayout {
        StoreLayout {
            base_prefix: self.store.base_prefix.clone(),
            original_prefix: self.store.original_prefix.clone(),
            thumbnail_prefix: self.store.thumbnail_prefix.clone(),
            cdn_url: self.store.cdn_url.clone(),
            derivative_ext: self.derivatives.format.extension(),
        }
    }
}

fn resolve(slot: &mut String, env: Option<String>, default: &str) {
    match env {
        Some(value) => *slot = value,
        None if slot.is_empty() => *slot = default.to_string(),
        None => {}
    }
}

/// Load the first `.env` file found. Variables already set are kept.
pub fn load_dotenv() -> Option<PathBuf> {
    DOTENV_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .and_then(|p| dotenv::from_path(p).ok().map(|()| p.to_path_buf()))
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `photosync.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photosync configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Root of the year directories (gallery_images/2024/DSC_0001.jpg).
source_dir = "web/photography/gallery_images"

# Catalog read at the start and rewritten at the end of every run.
manifest_path = "web/photography/photos.json"

# Photos that are not mirrored are referenced by their path relative to this.
web_root = "web/photography"

# ---------------------------------------------------------------------------
# Derivatives (thumbnails)
# ---------------------------------------------------------------------------
[derivatives]
# Wider sources are scaled down to this width. Narrower ones keep their size.
max_width = 800

# Lossy encoding quality (1 = worst, 100 = best).
quality = 85

# "webp" or "jpeg".
format = "webp"

# ---------------------------------------------------------------------------
# Metadata extraction
# ---------------------------------------------------------------------------
[metadata]
# "exiftool" runs the external exiftool command; "native" reads EXIF in-process.
extractor = "exiftool"
exiftool_bin = "exiftool"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Runs with fewer photos use fewer.
max_workers = 10

# Check the store for unchanged photos and re-upload anything missing.
verify_remote = false

# ---------------------------------------------------------------------------
# Object store
# ---------------------------------------------------------------------------
# Environment variables override these (first non-empty wins):
#   mirror_dir        PHOTOSYNC_STORE_DIR
#   endpoint          NUXT_PROVIDER_S3_ENDPOINT, R2_ENDPOINT
#   bucket            NUXT_PROVIDER_S3_BUCKET, R2_BUCKET
#   region            NUXT_PROVIDER_S3_REGION, R2_REGION
#   access_key_id     NUXT_PROVIDER_S3_ACCESS_KEY_ID, R2_ACCESS_KEY_ID
#   secret_access_key NUXT_PROVIDER_S3_SECRET_ACCESS_KEY, R2_SECRET_ACCESS_KEY
#   cdn_url           NUXT_PROVIDER_S3_CDN_URL, R2_CDN_URL
#   base_prefix       NUXT_PROVIDER_S3_BASE_PREFIX, R2_BASE_PREFIX
#   original_prefix   NUXT_PROVIDER_S3_ORIGINAL_PREFIX, R2_ORIGINAL_PREFIX
#   thumbnail_prefix  NUXT_PROVIDER_S3_PREFIX_THUMBNAIL_BASE, R2_THUMBNAIL_PREFIX
[store]
# Directory the objects are mirrored into (a mounted bucket or a sync folder).
# Leave unset to run without a store.
# mirror_dir = "/mnt/bucket"

# Used for public URLs when no CDN is configured: <endpoint>/<bucket>/<key>.
endpoint = ""
bucket = ""

# Request signing for store clients that talk to a remote endpoint. Prefer the
# environment over this file for the keys. The directory store ignores these.
region = ""
access_key_id = ""
secret_access_key = ""

# Public base URL: <cdn_url>/<key>.
cdn_url = ""

base_prefix = "photos/"
original_prefix = "originals/"
thumbnail_prefix = "thumbnails/"
"##
}
