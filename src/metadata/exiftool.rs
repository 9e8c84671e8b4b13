//! Metadata through the external `exiftool` command.
//!
//! Runs `exiftool -json -charset utf8 <file>` and reads the first (only)
//! object of the array it prints. exiftool already renders most values as
//! labels and formatted strings; normalization accepts both forms, so the
//! result has the same shape as the native reader's.

use super::dating::parse_exif_datetime;
use super::normalize::{RawTags, normalize};
use super::schema::{CANONICAL_KEYS, MetaValue};
use super::{ExtractError, Extracted, MetadataExtractor};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Fields kept from exiftool's output. Everything else is dropped.
pub const ALLOWED_FIELDS: [&str; 24] = [
    "Aperture",
    "CreateDate",
    "DateTimeOriginal",
    "ExposureMode",
    "ExposureProgram",
    "ExposureTime",
    "FNumber",
    "Flash",
    "FocalLength",
    "FocalLengthIn35mmFormat",
    "ISO",
    "Keywords",
    "Lens",
    "LensModel",
    "Make",
    "MeteringMode",
    "Model",
    "OffsetTime",
    "OffsetTimeOriginal",
    "Rating",
    "SceneCaptureType",
    "ShutterSpeed",
    "Subject",
    "WhiteBalance",
];

/// exiftool's name for a field → the raw tag normalization reads.
fn raw_name(field: &str) -> &str {
    match field {
        "ISO" => "ISOSpeedRatings",
        "Keywords" => "XPKeywords",
        "Subject" => "XPSubject",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct ExifToolExtractor {
    bin: PathBuf,
}

impl ExifToolExtractor {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

impl MetadataExtractor for ExifToolExtractor {
    fn extract(&self, path: &Path) -> Result<Extracted, ExtractError> {
        let output = Command::new(&self.bin)
            .args(["-json", "-charset", "utf8"])
            .arg(path)
            .output()
            .map_err(|source| ExtractError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ExtractError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_exiftool_output(&output.stdout)
    }
}

/// Interpret exiftool's `-json` output for a single file.
pub fn parse_exiftool_output(stdout: &[u8]) -> Result<Extracted, ExtractError> {
    let entries: Vec<Map<String, Value>> = serde_json::from_slice(stdout)?;
    let entry = entries.into_iter().next().ok_or(ExtractError::EmptyOutput)?;

    let dimension = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    };
    let width = dimension("ImageWidth");
    let height = dimension("ImageHeight");

    let captured_at = ["DateTimeOriginal", "CreateDate"]
        .iter()
        .filter_map(|key| entry.get(*key).and_then(Value::as_str))
        .find_map(parse_exif_datetime);

    let mut raw = RawTags::new();
    let mut passthrough = Vec::new();
    for field in ALLOWED_FIELDS {
        let Some(value) = entry.get(field).and_then(MetaValue::from_json) else {
            continue;
        };
        if CANONICAL_KEYS.contains(&field) || raw_name(field) != field {
            raw.insert(raw_name(field).to_string(), value.to_text());
        } else {
            passthrough.push((field, value));
        }
    }

    let mut metadata = normalize(&raw);
    for (field, value) in passthrough {
        metadata.extra.insert(field.to_string(), value);
    }

    Ok(Extracted {
        metadata,
        width,
        height,
        captured_at,
    })
}
