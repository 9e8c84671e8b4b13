//! Derivative (thumbnail) generation. Pure Rust apart from the libwebp encoder.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` |
//! | **Resize** | `resize_exact` + Catmull-Rom, width capped, never upscaled |
//! | **Encode** | lossy WebP (`webp`) or baseline JPEG (`image`) |
//!
//! The module is split into:
//! - **Calculations**: pure dimension math (unit testable)
//! - **Parameters**: what derivative to produce
//! - **Backend**: [`DerivativeBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DerivativeBackend};
pub use calculations::fit_width;
pub use params::{DerivativeFormat, DerivativeParams, Quality};
pub use rust_backend::RustBackend;
