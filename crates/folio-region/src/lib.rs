//! folio-region - Region processing for page images
//!
//! This crate provides:
//!
//! - **Connected component analysis** - Labeling connected regions of a
//!   binary image, with bounding boxes and pixel counts
//! - **Seed fill** - Binary morphological reconstruction
//!
//! # Examples
//!
//! ```
//! use folio_region::{find_connected_components, ConnectivityType};
//! use folio_core::{Pix, PixelDepth};
//!
//! let pix = Pix::new(100, 100, PixelDepth::Bit1).unwrap();
//! let mut pix_mut = pix.try_into_mut().unwrap();
//! pix_mut.set_pixel(10, 10, 1).unwrap();
//! pix_mut.set_pixel(11, 10, 1).unwrap();
//! pix_mut.set_pixel(50, 50, 1).unwrap();
//! let pix: folio_core::Pix = pix_mut.into();
//!
//! let components = find_connected_components(&pix, ConnectivityType::FourWay).unwrap();
//! assert_eq!(components.len(), 2);
//! ```

pub mod conncomp;
pub mod error;
pub mod seedfill;

pub use conncomp::{
    BoundingBox, ComponentLabels, ConnectedComponent, ConnectivityType, find_connected_components,
    label_connected_components,
};
pub use error::{RegionError, RegionResult};
pub use seedfill::{remove_seeded_components, seedfill_binary};
