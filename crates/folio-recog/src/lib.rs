//! folio-recog - Page dewarping
//!
//! This crate builds geometric correction models for scanned book pages
//! from the curvature of their text lines, and applies them:
//!
//! - **Dewarping** ([`dewarp`]): disparity models for single pages,
//!   multi-page model collections with reference models, rendering
//! - **Page segmentation** ([`pageseg`]): text column counting
//!
//! # Quick Start
//!
//! ```no_run
//! use folio_recog::dewarp::{Dewarpa, DewarpaOptions};
//! use folio_core::{Pix, PixelDepth};
//!
//! # fn main() -> folio_recog::RecogResult<()> {
//! let pages: Vec<Pix> = vec![Pix::new(2000, 2800, PixelDepth::Bit1)?];
//!
//! let mut dewa = Dewarpa::new(DewarpaOptions::default())?;
//! for (i, pix) in pages.iter().enumerate() {
//!     dewa.build_and_insert(pix, i as u32)?;
//! }
//! dewa.resolve_references()?;
//! let result = dewa.apply_disparity(&pages[0], 0)?;
//! println!("corrected: {}", result.was_corrected());
//! # Ok(())
//! # }
//! ```

pub mod dewarp;
mod error;
pub mod pageseg;

pub use error::{RecogError, RecogResult};

pub use dewarp::{Dewarp, DewarpResult, Dewarpa, DewarpaOptions};
pub use pageseg::{ColumnCountOptions, ColumnCounter, ProjectionColumnCounter};

// Re-export core for convenience
pub use folio_core;
