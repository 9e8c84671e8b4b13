//! Shared test utilities.
//!
//! Synthetic source images (plain JPEGs and JPEGs with an EXIF block), record
//! builders, and manifest lookups that panic with a useful message.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = write_source(tmp.path(), "2024", "a.jpg");
//! write_jpeg_with_exif(&path, 64, 48, &ExifSpec {
//!     date_time_original: Some("2024:05:01 10:00:00"),
//!     ..ExifSpec::default()
//! });
//! ```

use crate::metadata::Metadata;
use crate::metadata::native::XP_TITLE;
use crate::types::{Manifest, PhotoRecord};
use exif::{Field, In, Rational, Tag, Value};
use image::{ImageEncoder, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

// =========================================================================
// Records
// =========================================================================

/// A minimal record dated `date` (`YYYY-MM-DD`), with year and month derived.
pub fn record(filename: &str, date: &str) -> PhotoRecord {
    PhotoRecord {
        filename: filename.to_string(),
        path: format!("gallery_images/{}/{filename}", &date[..4]),
        thumbnail: format!("https://cdn.example.com/photos/thumbnails/{filename}.webp"),
        alt: String::new(),
        year: date[..4].to_string(),
        month: date[5..7].to_string(),
        date: date.to_string(),
        width: 0,
        height: 0,
        exif: Metadata::default(),
        hash: String::new(),
        timestamp: 0,
    }
}

/// Find a photo by filename anywhere in the manifest. Panics if not found.
pub fn find_photo<'a>(manifest: &'a Manifest, filename: &str) -> &'a PhotoRecord {
    manifest
        .photos()
        .find(|p| p.filename == filename)
        .unwrap_or_else(|| {
            let names: Vec<&str> = manifest.photos().map(|p| p.filename.as_str()).collect();
            panic!("photo '{filename}' not found. Available: {names:?}")
        })
}

/// Album years in manifest order.
pub fn album_years(manifest: &Manifest) -> Vec<&str> {
    manifest.albums.iter().map(|a| a.year.as_str()).collect()
}

// =========================================================================
// Synthetic images
// =========================================================================

fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a small valid JPEG without any EXIF.
pub fn write_plain_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_jpeg(width, height)).unwrap();
}

/// Create `<root>/<year>/<filename>` as a small plain JPEG and return its path.
pub fn write_source(root: &Path, year: &str, filename: &str) -> PathBuf {
    let dir = root.join(year);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(filename);
    write_plain_jpeg(&path, 32, 24);
    path
}

/// EXIF tags to embed in a synthetic JPEG. Unset fields are omitted.
#[derive(Debug, Default, Clone)]
pub struct ExifSpec {
    pub date_time_original: Option<&'static str>,
    pub f_number: Option<(u32, u32)>,
    pub exposure_time: Option<(u32, u32)>,
    pub exposure_mode: Option<u16>,
    pub flash: Option<u16>,
    /// (degrees, minutes, seconds, reference letter)
    pub gps_latitude: Option<((u32, u32), (u32, u32), (u32, u32), &'static str)>,
    pub make: Option<&'static str>,
    pub xp_title: Option<&'static str>,
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn rational((num, denom): (u32, u32)) -> Rational {
    Rational { num, denom }
}

fn exif_block(spec: &ExifSpec) -> Vec<u8> {
    let mut fields = Vec::new();
    if let Some(dt) = spec.date_time_original {
        fields.push(field(Tag::DateTimeOriginal, ascii(dt)));
    }
    if let Some(f) = spec.f_number {
        fields.push(field(Tag::FNumber, Value::Rational(vec![rational(f)])));
    }
    if let Some(t) = spec.exposure_time {
        fields.push(field(Tag::ExposureTime, Value::Rational(vec![rational(t)])));
    }
    if let Some(mode) = spec.exposure_mode {
        fields.push(field(Tag::ExposureMode, Value::Short(vec![mode])));
    }
    if let Some(flash) = spec.flash {
        fields.push(field(Tag::Flash, Value::Short(vec![flash])));
    }
    if let Some((d, m, s, reference)) = spec.gps_latitude {
        fields.push(field(
            Tag::GPSLatitude,
            Value::Rational(vec![rational(d), rational(m), rational(s)]),
        ));
        fields.push(field(Tag::GPSLatitudeRef, ascii(reference)));
    }
    if let Some(make) = spec.make {
        fields.push(field(Tag::Make, ascii(make)));
    }
    if let Some(title) = spec.xp_title {
        let bytes = title
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|u| u.to_le_bytes())
            .collect();
        fields.push(field(XP_TITLE, Value::Byte(bytes)));
    }

    let mut writer = exif::experimental::Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    tiff.into_inner()
}

/// Write a JPEG carrying an APP1 EXIF segment built from `spec`.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, spec: &ExifSpec) {
    let jpeg = encode_jpeg(width, height);
    let tiff = exif_block(spec);

    let segment_len = u16::try_from(2 + 6 + tiff.len()).unwrap();
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}
