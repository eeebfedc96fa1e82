//! Error types for folio-recog

use thiserror::Error;

/// Errors that can occur during dewarping operations
///
/// Pages that cannot be modeled are not errors: they are represented as
/// model states and rendered unchanged.
#[derive(Debug, Error)]
pub enum RecogError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] folio_core::Error),

    /// Morphology library error
    #[error("morph error: {0}")]
    Morph(#[from] folio_morph::MorphError),

    /// Region library error
    #[error("region error: {0}")]
    Region(#[from] folio_region::RegionError),

    /// Unsupported pixel depth for this operation
    #[error("unsupported depth: expected {expected}, got {actual}")]
    UnsupportedDepth { expected: &'static str, actual: u32 },

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Page number outside the supported range
    #[error("invalid page number {page}: must be <= {max}")]
    InvalidPageNumber { page: u32, max: u32 },

    /// A model does not share the collection's sampling or reduction factor
    #[error("parameter mismatch: {0}")]
    ParameterMismatch(String),

    /// Rendering requested before reference resolution
    #[error("models not ready: resolve references before rendering")]
    ModelsNotReady,

    /// I/O error while reading or writing models
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized data has a different version
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    /// Serialized data is malformed
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type for dewarping operations
pub type RecogResult<T> = Result<T, RecogError>;
