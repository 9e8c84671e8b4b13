//! Parameter types for derivative generation.
//!
//! These describe *what* to produce, not *how*. The backend does the pixel
//! work; the pipeline only ever builds a [`DerivativeParams`] from config.
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 85), clamped on construction.
//! - [`DerivativeFormat`]: output encoding, which also fixes the file extension
//!   and the content type the derivative is uploaded with.
//! - [`DerivativeParams`]: the full recipe: width cap, quality, format.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeFormat {
    #[default]
    WebP,
    Jpeg,
}

impl DerivativeFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Jpeg => "jpg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Recipe for one derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeParams {
    /// Images wider than this are scaled down to it; narrower ones keep their size.
    pub max_width: u32,
    pub quality: Quality,
    pub format: DerivativeFormat,
}

impl Default for DerivativeParams {
    fn default() -> Self {
        Self {
            max_width: 800,
            quality: Quality::default(),
            format: DerivativeFormat::default(),
        }
    }
}
