//! Folio - Document page dewarping for Rust
//!
//! Builds geometric correction models for scanned pages of bound books
//! from the curvature of their text lines, shares models between pages of
//! a document, and applies them.
//!
//! - Raster and float images, point fits ([`folio_core`], re-exported at the root)
//! - Binary brick morphology ([`morph`])
//! - Connected components and seed fill ([`region`])
//! - Dewarping and column counting ([`recog`])
//!
//! # Example
//!
//! ```
//! use folio::{Pix, PixelDepth};
//! use folio::recog::dewarp::{Dewarpa, DewarpaOptions};
//!
//! let pix = Pix::new(640, 480, PixelDepth::Bit1).unwrap();
//! let mut dewa = Dewarpa::new(DewarpaOptions::default()).unwrap();
//! dewa.build_and_insert(&pix, 0).unwrap();
//! dewa.resolve_references().unwrap();
//!
//! // a blank page has no model and passes through unchanged
//! let result = dewa.apply_disparity(&pix, 0).unwrap();
//! assert!(!result.was_corrected());
//! ```

// Re-export core types (primary data structures used everywhere)
pub use folio_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use folio_morph as morph;
pub use folio_recog as recog;
pub use folio_region as region;
