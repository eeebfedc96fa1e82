//! Depth conversion
//!
//! Just enough conversion to get any supported page image down to the
//! 1 bpp form that textline detection and column counting expect.

use super::{Pix, PixelDepth};
use crate::error::{Error, Result};

impl Pix {
    /// Convert to 8 bpp grayscale.
    ///
    /// 1 bpp maps foreground to 0 and background to 255; 32 bpp uses
    /// integer luminance weights (0.3, 0.6, 0.1).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDepth`] for 2, 4 and 16 bpp input.
    pub fn convert_to_gray(&self) -> Result<Pix> {
        let (w, h) = (self.width(), self.height());
        match self.depth() {
            PixelDepth::Bit8 => Ok(self.clone()),
            PixelDepth::Bit1 => {
                let mut out = Pix::new(w, h, PixelDepth::Bit8)?.to_mut();
                out.copy_resolution_from(self);
                for y in 0..h {
                    for x in 0..w {
                        let v = if self.get_pixel_unchecked(x, y) != 0 { 0 } else { 255 };
                        out.set_pixel_unchecked(x, y, v);
                    }
                }
                Ok(out.into())
            }
            PixelDepth::Bit32 => {
                let mut out = Pix::new(w, h, PixelDepth::Bit8)?.to_mut();
                out.copy_resolution_from(self);
                for y in 0..h {
                    for x in 0..w {
                        let p = self.get_pixel_unchecked(x, y);
                        let (r, g, b) = ((p >> 24) & 0xff, (p >> 16) & 0xff, (p >> 8) & 0xff);
                        out.set_pixel_unchecked(x, y, (3 * r + 6 * g + b) / 10);
                    }
                }
                Ok(out.into())
            }
            d => Err(Error::UnsupportedDepth(d.bits())),
        }
    }

    /// Threshold to 1 bpp.
    ///
    /// Gray values strictly below `thresh` become foreground (1).
    /// A 1 bpp image is returned unchanged (shared).
    pub fn threshold_to_binary(&self, thresh: u32) -> Result<Pix> {
        if self.depth() == PixelDepth::Bit1 {
            return Ok(self.clone());
        }
        let gray = self.convert_to_gray()?;
        let (w, h) = (gray.width(), gray.height());
        let mut out = Pix::new(w, h, PixelDepth::Bit1)?.to_mut();
        out.copy_resolution_from(self);
        for y in 0..h {
            for x in 0..w {
                if gray.get_pixel_unchecked(x, y) < thresh {
                    out.set_pixel_unchecked(x, y, 1);
                }
            }
        }
        Ok(out.into())
    }

    /// Reduce a 1 bpp image by 2x in each direction.
    ///
    /// A destination pixel is foreground if any pixel of its 2x2 source
    /// block is foreground. Odd trailing rows and columns are dropped.
    pub fn reduce_binary_2x(&self) -> Result<Pix> {
        if self.depth() != PixelDepth::Bit1 {
            return Err(Error::UnsupportedDepth(self.depth().bits()));
        }
        let (wd, hd) = (self.width() / 2, self.height() / 2);
        let mut out = Pix::new(wd, hd, PixelDepth::Bit1)?.to_mut();
        out.set_resolution(self.xres() / 2, self.yres() / 2);
        for y in 0..hd {
            for x in 0..wd {
                let any = (0..2).any(|dy| {
                    (0..2).any(|dx| self.get_pixel_unchecked(2 * x + dx, 2 * y + dy) != 0)
                });
                if any {
                    out.set_pixel_unchecked(x, y, 1);
                }
            }
        }
        Ok(out.into())
    }
}
