//! Derivative backend trait and shared error type.
//!
//! The [`DerivativeBackend`] trait is the single operation the pipeline needs
//! from an image library: turn a source file into encoded derivative bytes.
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend); tests use the
//! recording [`MockBackend`](tests::MockBackend).

use super::params::DerivativeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Produces encoded derivative images.
///
/// `Sync` so a single backend can be shared by every worker.
pub trait DerivativeBackend: Sync {
    /// Decode `source`, shrink it to fit `params.max_width`, and encode it in
    /// `params.format`. Returns the encoded bytes.
    fn generate(&self, source: &Path, params: &DerivativeParams) -> Result<Vec<u8>, BackendError>;
}
