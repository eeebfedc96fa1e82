//! Raster pages
//!
//! [`Pix`] is the page image consumed by textline detection, model
//! building and rendering. Rows are packed into 32-bit words, MSB first,
//! and every row starts on a word boundary. 32 bpp pixels hold RGBA with
//! red in the top byte.
//!
//! A `Pix` shares its buffer through an `Arc`, so clones are cheap. Pixel
//! writes go through [`PixMut`], obtained with [`Pix::to_mut`] (always
//! copies) or [`Pix::try_into_mut`] (only when unshared), and converted
//! back with `Into<Pix>`.

mod access;
pub mod convert;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Bits per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PixelDepth {
    /// Binary, 1 is foreground (ink)
    Bit1 = 1,
    Bit2 = 2,
    Bit4 = 4,
    /// Gray
    Bit8 = 8,
    Bit16 = 16,
    /// RGBA
    Bit32 = 32,
}

impl PixelDepth {
    /// Depth for a raw bit count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDepth`] unless `bits` is 1, 2, 4, 8, 16 or 32.
    pub fn from_bits(bits: u32) -> Result<Self> {
        Ok(match bits {
            1 => Self::Bit1,
            2 => Self::Bit2,
            4 => Self::Bit4,
            8 => Self::Bit8,
            16 => Self::Bit16,
            32 => Self::Bit32,
            _ => return Err(Error::InvalidDepth(bits)),
        })
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Largest pixel value at this depth
    pub fn max_value(self) -> u32 {
        if self == Self::Bit32 {
            u32::MAX
        } else {
            (1u32 << self.bits()) - 1
        }
    }
}

#[derive(Debug, Clone)]
struct Raster {
    width: u32,
    height: u32,
    depth: PixelDepth,
    /// 32-bit words per row
    wpl: u32,
    /// Resolution in ppi, 0 when unknown
    xres: i32,
    yres: i32,
    data: Vec<u32>,
}

/// Shared, read-only page image
///
/// ```
/// use folio_core::{Pix, PixelDepth};
///
/// let page = Pix::new(2000, 2800, PixelDepth::Bit1).unwrap();
/// assert_eq!((page.width(), page.height()), (2000, 2800));
/// assert_eq!(page.wpl(), 63);
/// ```
#[derive(Debug, Clone)]
pub struct Pix {
    inner: Arc<Raster>,
}

impl Pix {
    /// Zero-filled image.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`] for a zero width or height, or a row too
    /// wide to address.
    pub fn new(width: u32, height: u32, depth: PixelDepth) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let wpl = u32::try_from((u64::from(width) * u64::from(depth.bits())).div_ceil(32))
            .map_err(|_| Error::InvalidDimension { width, height })?;
        Ok(Pix {
            inner: Arc::new(Raster {
                width,
                height,
                depth,
                wpl,
                xres: 0,
                yres: 0,
                data: vec![0; wpl as usize * height as usize],
            }),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    pub fn depth(&self) -> PixelDepth {
        self.inner.depth
    }

    #[inline]
    pub fn wpl(&self) -> u32 {
        self.inner.wpl
    }

    #[inline]
    pub fn xres(&self) -> i32 {
        self.inner.xres
    }

    #[inline]
    pub fn yres(&self) -> i32 {
        self.inner.yres
    }

    /// Packed words, `wpl` per row
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.inner.data
    }

    /// True when width, height and depth match.
    pub fn sizes_equal(&self, other: &Pix) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.depth() == other.depth()
    }

    /// Pixel-wise equality. Row padding is not compared.
    pub fn equals(&self, other: &Pix) -> bool {
        self.sizes_equal(other)
            && (0..self.height()).all(|y| {
                (0..self.width())
                    .all(|x| self.get_pixel_unchecked(x, y) == other.get_pixel_unchecked(x, y))
            })
    }

    /// Copy that shares nothing with `self`.
    pub fn deep_clone(&self) -> Self {
        Pix {
            inner: Arc::new(Raster::clone(&self.inner)),
        }
    }

    /// Take the buffer for writing if no other `Pix` shares it.
    pub fn try_into_mut(self) -> std::result::Result<PixMut, Self> {
        Arc::try_unwrap(self.inner)
            .map(|inner| PixMut { inner })
            .map_err(|inner| Pix { inner })
    }

    /// Writable copy.
    pub fn to_mut(&self) -> PixMut {
        PixMut {
            inner: Raster::clone(&self.inner),
        }
    }
}

/// Writable page image
#[derive(Debug)]
pub struct PixMut {
    inner: Raster,
}

impl PixMut {
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    pub fn depth(&self) -> PixelDepth {
        self.inner.depth
    }

    #[inline]
    pub fn wpl(&self) -> u32 {
        self.inner.wpl
    }

    pub fn set_resolution(&mut self, xres: i32, yres: i32) {
        self.inner.xres = xres;
        self.inner.yres = yres;
    }

    pub fn copy_resolution_from(&mut self, src: &Pix) {
        self.set_resolution(src.xres(), src.yres());
    }

    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.inner.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.inner.data
    }

    /// Fill every pixel with `val`, masked to the depth.
    ///
    /// Used for the background of rendered pages.
    pub fn set_all_arbitrary(&mut self, val: u32) {
        let depth = self.inner.depth;
        let val = val & depth.max_value();
        let bits = depth.bits();
        let word = (0..32 / bits).fold(0u32, |acc, _| acc.checked_shl(bits).unwrap_or(0) | val);
        self.inner.data.fill(word);
    }
}

impl From<PixMut> for Pix {
    fn from(pix: PixMut) -> Self {
        Pix {
            inner: Arc::new(pix.inner),
        }
    }
}
