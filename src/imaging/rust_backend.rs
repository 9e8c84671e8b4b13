//! Pure Rust derivative backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `CatmullRom` |
//! | Encode → WebP (lossy) | `webp::Encoder` (libwebp) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, DerivativeBackend};
use super::calculations::fit_width;
use super::params::{DerivativeFormat, DerivativeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Shrink to `max_width` when wider; otherwise hand the image back untouched.
fn shrink(img: DynamicImage, max_width: u32) -> DynamicImage {
    match fit_width((img.width(), img.height()), max_width) {
        Some((w, h)) => img.resize_exact(w, h, FilterType::CatmullRom),
        None => img,
    }
}

fn encode_webp(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let encoded = encoder.encode(quality as f32);
    if encoded.is_empty() {
        return Err(BackendError::ProcessingFailed(
            "WebP encode produced no data".into(),
        ));
    }
    Ok(encoded.to_vec())
}

fn encode_jpeg(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(buf.into_inner())
}

impl DerivativeBackend for RustBackend {
    fn generate(&self, source: &Path, params: &DerivativeParams) -> Result<Vec<u8>, BackendError> {
        let img = shrink(load_image(source)?, params.max_width);
        let quality = params.quality.value();
        match params.format {
            DerivativeFormat::WebP => encode_webp(&img, quality),
            DerivativeFormat::Jpeg => encode_jpeg(&img, quality),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::write_plain_jpeg;

    fn params(max_width: u32, format: DerivativeFormat) -> DerivativeParams {
        DerivativeParams {
            max_width,
            quality: Quality::new(85),
            format,
        }
    }

    fn decoded_size(bytes: &[u8]) -> (u32, u32) {
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn webp_derivative_is_scaled_to_max_width() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_plain_jpeg(&source, 400, 300);

        let bytes = RustBackend::new()
            .generate(&source, &params(200, DerivativeFormat::WebP))
            .unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        assert_eq!(decoded_size(&bytes), (200, 150));
    }

    #[test]
    fn small_source_is_not_upscaled() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("small.jpg");
        write_plain_jpeg(&source, 120, 90);

        let bytes = RustBackend::new()
            .generate(&source, &params(800, DerivativeFormat::WebP))
            .unwrap();
        assert_eq!(decoded_size(&bytes), (120, 90));
    }

    #[test]
    fn jpeg_fallback_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_plain_jpeg(&source, 300, 200);

        let bytes = RustBackend::new()
            .generate(&source, &params(150, DerivativeFormat::Jpeg))
            .unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(decoded_size(&bytes), (150, 100));
    }

    #[test]
    fn png_source_with_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("alpha.png");
        image::RgbaImage::from_pixel(40, 20, image::Rgba([10, 20, 30, 128]))
            .save(&source)
            .unwrap();

        let bytes = RustBackend::new()
            .generate(&source, &params(20, DerivativeFormat::WebP))
            .unwrap();
        assert_eq!(decoded_size(&bytes), (20, 10));
    }

    #[test]
    fn undecodable_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"not an image").unwrap();

        let result = RustBackend::new().generate(&source, &params(800, DerivativeFormat::WebP));
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn nonexistent_source_is_io_error() {
        let result = RustBackend::new().generate(
            Path::new("/nonexistent/image.jpg"),
            &params(800, DerivativeFormat::WebP),
        );
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
