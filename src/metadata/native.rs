//! In-process EXIF reader built on `kamadak-exif`.
//!
//! Each tag of interest is rendered to the same textual form an EXIF dump
//! would show (`"28/10"`, `"23/1 7/1 2122/100"`, `"3"`, `"NIKON"`) and handed
//! to [`normalize`](super::normalize::normalize). The Windows XP text tags are
//! UTF-16LE byte arrays and get decoded to plain strings first.

use super::dating::parse_exif_datetime;
use super::normalize::{RawTags, normalize};
use super::{ExtractError, Extracted, MetadataExtractor};
use exif::{Context, Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tags read verbatim, with the name normalization looks them up by.
const TEXT_TAGS: &[(Tag, &str)] = &[
    (Tag::FNumber, "FNumber"),
    (Tag::ExposureTime, "ExposureTime"),
    (Tag::FocalLength, "FocalLength"),
    (Tag::FocalLengthIn35mmFilm, "FocalLengthIn35mmFilm"),
    (Tag::PhotographicSensitivity, "ISOSpeedRatings"),
    (Tag::RecommendedExposureIndex, "RecommendedExposureIndex"),
    (Tag::LensModel, "LensModel"),
    (Tag::Make, "Make"),
    (Tag::Model, "Model"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
    (Tag::GPSLatitude, "GPSLatitude"),
    (Tag::GPSLatitudeRef, "GPSLatitudeRef"),
    (Tag::GPSLongitude, "GPSLongitude"),
    (Tag::GPSLongitudeRef, "GPSLongitudeRef"),
    (Tag::GPSAltitude, "GPSAltitude"),
    (Tag::GPSAltitudeRef, "GPSAltitudeRef"),
    (Tag::ExposureMode, "ExposureMode"),
    (Tag::ExposureProgram, "ExposureProgram"),
    (Tag::MeteringMode, "MeteringMode"),
    (Tag::WhiteBalance, "WhiteBalance"),
    (Tag::SceneCaptureType, "SceneCaptureType"),
    (Tag::Flash, "Flash"),
    (Tag::Software, "Software"),
    (Tag::Artist, "Artist"),
    (Tag::Copyright, "Copyright"),
];

pub const XP_TITLE: Tag = Tag(Context::Tiff, 0x9c9b);
pub const XP_COMMENT: Tag = Tag(Context::Tiff, 0x9c9c);
pub const XP_AUTHOR: Tag = Tag(Context::Tiff, 0x9c9d);
pub const XP_KEYWORDS: Tag = Tag(Context::Tiff, 0x9c9e);
pub const XP_SUBJECT: Tag = Tag(Context::Tiff, 0x9c9f);

const XP_TAGS: &[(Tag, &str)] = &[
    (XP_TITLE, "XPTitle"),
    (XP_COMMENT, "XPComment"),
    (XP_AUTHOR, "XPAuthor"),
    (XP_KEYWORDS, "XPKeywords"),
    (XP_SUBJECT, "XPSubject"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for NativeExtractor {
    fn extract(&self, path: &Path) -> Result<Extracted, ExtractError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            // No EXIF block at all: an untagged image, not a failure.
            Err(exif::Error::NotFound(_) | exif::Error::BlankValue(_)) => {
                let (width, height) = image::image_dimensions(path).unwrap_or((0, 0));
                return Ok(Extracted {
                    width,
                    height,
                    ..Extracted::default()
                });
            }
            Err(e) => return Err(e.into()),
        };

        let raw = raw_tags(&exif);
        let captured_at = raw
            .get("DateTimeOriginal")
            .and_then(|v| parse_exif_datetime(v));

        let mut width = pixel_dimension(&exif, Tag::PixelXDimension);
        let mut height = pixel_dimension(&exif, Tag::PixelYDimension);
        if (width == 0 || height == 0)
            && let Ok((w, h)) = image::image_dimensions(path)
        {
            width = w;
            height = h;
        }

        Ok(Extracted {
            metadata: normalize(&raw),
            width,
            height,
            captured_at,
        })
    }
}

/// Collect every tag normalization understands from the primary image.
pub fn raw_tags(exif: &Exif) -> RawTags {
    let mut raw = RawTags::new();
    for (tag, name) in TEXT_TAGS {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            let rendered = render_value(&field.value);
            if !rendered.is_empty() {
                raw.insert(name.to_string(), rendered);
            }
        }
    }
    for (tag, name) in XP_TAGS {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            let decoded = match &field.value {
                Value::Byte(bytes) | Value::Undefined(bytes, _) => decode_ucs2(bytes),
                _ => String::new(),
            };
            if !decoded.is_empty() {
                raw.insert(name.to_string(), decoded);
            }
        }
    }
    raw
}

fn pixel_dimension(exif: &Exif, tag: Tag) -> u32 {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(0)
}

fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a tag value as text: rationals as `n/d`, integers in decimal,
/// multiple components separated by spaces, ASCII with NULs trimmed.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .unwrap_or_default(),
        Value::Byte(v) => join(v),
        Value::Short(v) => join(v),
        Value::Long(v) => join(v),
        Value::SByte(v) => join(v),
        Value::SShort(v) => join(v),
        Value::SLong(v) => join(v),
        Value::Float(v) => join(v),
        Value::Double(v) => join(v),
        Value::Rational(v) => join(v.iter().map(|r| format!("{}/{}", r.num, r.denom))),
        Value::SRational(v) => join(v.iter().map(|r| format!("{}/{}", r.num, r.denom))),
        Value::Undefined(bytes, _) => String::from_utf8_lossy(bytes)
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string(),
        Value::Unknown(..) => String::new(),
    }
}

/// Decode a Windows XP text tag: UTF-16LE, NUL-terminated.
/// An odd byte length is not valid UTF-16 and decodes to an empty string.
pub fn decode_ucs2(bytes: &[u8]) -> String {
    if bytes.len() % 2 != 0 {
        return String::new();
    }
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    while units.last() == Some(&0) {
        units.pop();
    }
    String::from_utf16_lossy(&units)
}
