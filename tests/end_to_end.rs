//! End-to-end sync with the production collaborators: the in-process EXIF
//! reader, the pure-Rust thumbnail encoder and a directory-backed store.
//!
//! Run with: cargo test --test end_to_end

use exif::{Field, In, Rational, Tag, Value};
use image::{ImageEncoder, RgbImage};
use photosync::config::Config;
use photosync::manifest::PersistOutcome;
use photosync::metadata::ExtractorKind;
use photosync::metadata::codes::ExposureMode;
use photosync::sync::Pipeline;
use photosync::types::Manifest;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 90]));
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// A JPEG with DateTimeOriginal, FNumber, ExposureTime, ExposureMode and a
/// northern GPS latitude.
fn jpeg_with_exif(width: u32, height: u32) -> Vec<u8> {
    let field = |tag, value| Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    };
    let rational = |num, denom| Rational { num, denom };
    let fields = [
        field(
            Tag::DateTimeOriginal,
            Value::Ascii(vec![b"2024:05:01 10:00:00".to_vec()]),
        ),
        field(Tag::FNumber, Value::Rational(vec![rational(4, 1)])),
        field(Tag::ExposureTime, Value::Rational(vec![rational(1, 200)])),
        field(Tag::ExposureMode, Value::Short(vec![0])),
        field(
            Tag::GPSLatitude,
            Value::Rational(vec![rational(47, 1), rational(22, 1), rational(0, 1)]),
        ),
        field(Tag::GPSLatitudeRef, Value::Ascii(vec![b"N".to_vec()])),
    ];
    let mut writer = exif::experimental::Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let plain = jpeg(width, height);
    let mut out = plain[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&u16::try_from(8 + tiff.len()).unwrap().to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&plain[2..]);
    out
}

struct Site {
    tmp: TempDir,
}

impl Site {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }

    fn write(&self, rel: &str, bytes: &[u8]) {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn config(&self) -> Config {
        let mut config = Config {
            source_dir: self.path("web/gallery_images"),
            manifest_path: self.path("web/photos.json"),
            web_root: self.path("web"),
            ..Config::default()
        };
        config.metadata.extractor = ExtractorKind::Native;
        config.processing.max_workers = 2;
        config.store.mirror_dir = Some(self.path("bucket"));
        config.store.cdn_url = "https://cdn.example.com".into();
        config.validate().unwrap();
        config
    }

    fn manifest(&self) -> Manifest {
        serde_json::from_slice(&std::fs::read(self.path("web/photos.json")).unwrap()).unwrap()
    }

    fn bucket_has(&self, key: &str) -> bool {
        self.path("bucket").join(Path::new(key)).is_file()
    }
}

#[test]
fn exif_dated_photo_lands_in_its_year() {
    let site = Site::new();
    site.write("web/gallery_images/2019/harbour.jpg", &jpeg_with_exif(40, 30));

    let report = Pipeline::from_config(&site.config(), false)
        .run(None)
        .unwrap();
    assert_eq!(report.stats.processed, 1);

    let manifest = site.manifest();
    assert_eq!(manifest.albums.len(), 1);
    assert_eq!(manifest.albums[0].year, "2024");
    let photo = &manifest.albums[0].photos[0];
    assert_eq!(photo.date, "2024-05-01");
    assert_eq!(photo.month, "05");
    assert_eq!((photo.width, photo.height), (40, 30));
    assert_eq!(photo.path, "https://cdn.example.com/photos/originals/harbour.jpg");
    assert_eq!(
        photo.thumbnail,
        "https://cdn.example.com/photos/thumbnails/harbour.webp"
    );

    assert_eq!(photo.exif.f_number, Some(4.0));
    assert_eq!(photo.exif.shutter_speed.as_deref(), Some("1/200"));
    assert_eq!(photo.exif.exposure_mode, Some(ExposureMode::Auto));
    assert_eq!(photo.exif.gps_latitude_ref.as_deref(), Some("North"));

    assert!(site.bucket_has("photos/originals/harbour.jpg"));
    assert!(site.bucket_has("photos/thumbnails/harbour.webp"));
    assert!(site.bucket_has("photos/photos.json"));

    let thumb = std::fs::read(site.path("bucket/photos/thumbnails/harbour.webp")).unwrap();
    assert_eq!(&thumb[..4], b"RIFF");
    assert_eq!(&thumb[8..12], b"WEBP");
}

#[test]
fn rerun_is_idempotent_and_deletions_reconcile() {
    let site = Site::new();
    site.write("web/gallery_images/2022/DSC_2022-03-04_x.jpg", &jpeg(20, 20));
    site.write("web/gallery_images/2022/y.png", &png(20, 20));

    Pipeline::from_config(&site.config(), false)
        .run(None)
        .unwrap();
    let first = std::fs::read(site.path("web/photos.json")).unwrap();

    let second = Pipeline::from_config(&site.config(), false)
        .run(None)
        .unwrap();
    assert_eq!(second.stats.reused, 2);
    assert_eq!(second.outcome, PersistOutcome::Unchanged);
    assert_eq!(std::fs::read(site.path("web/photos.json")).unwrap(), first);

    std::fs::remove_file(site.path("web/gallery_images/2022/y.png")).unwrap();
    let third = Pipeline::from_config(&site.config(), false)
        .run(None)
        .unwrap();
    assert_eq!(third.orphans, vec!["y.png"]);
    assert!(!site.bucket_has("photos/originals/y.png"));
    assert!(!site.bucket_has("photos/thumbnails/y.webp"));
    assert!(site.bucket_has("photos/originals/DSC_2022-03-04_x.jpg"));

    let manifest = site.manifest();
    assert_eq!(manifest.photo_count(), 1);
    assert_eq!(manifest.albums[0].photos[0].date, "2022-03-04");
}
