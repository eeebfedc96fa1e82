//! folio-morph - Binary morphology for page images
//!
//! Brick (rectangular) structuring elements only:
//!
//! - Dilation, erosion, opening and closing of 1 bpp images
//! - Pixel-wise set operations between binary images
//!
//! These are the building blocks of textline detection, which solidifies
//! words into horizontal bars and strips tall non-text components.

pub mod binary;
mod error;

pub use binary::{close_brick, dilate_brick, erode_brick, open_brick, subtract, union};
pub use error::{MorphError, MorphResult};
