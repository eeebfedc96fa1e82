//! Error types for the test framework

use thiserror::Error;

/// Errors that can occur while preparing regression test data
#[derive(Debug, Error)]
pub enum TestError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] folio_core::Error),

    /// Synthetic page parameters do not describe a drawable page
    #[error("invalid page layout: {0}")]
    InvalidLayout(String),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
