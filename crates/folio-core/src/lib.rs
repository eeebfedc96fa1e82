//! folio-core - Basic data structures for page dewarping
//!
//! This crate provides the fundamental data structures used throughout
//! the folio workspace:
//!
//! - [`Pix`] / [`PixMut`] - The raster image container (immutable / mutable)
//! - [`FPix`] - Floating-point grid, used for sampled and full-resolution
//!   disparity arrays
//! - [`Pta`] - Point arrays with least-squares curve fitting

pub mod error;
pub mod fpix;
pub mod pix;
pub mod pta;

pub use error::{Error, Result};
pub use fpix::FPix;
pub use pix::{Pix, PixMut, PixelDepth};
pub use pta::{NoisyQuadraticFit, Pta, QuadraticFit, apply_quadratic_fit};
