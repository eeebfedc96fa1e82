//! Pixel access
//!
//! Get and set individual pixels of any supported depth. Pixels are
//! packed MSB first within each 32-bit word.

use super::{Pix, PixMut, PixelDepth};
use crate::error::{Error, Result};

#[inline]
fn locate(x: u32, depth: PixelDepth) -> (usize, u32, u32) {
    let bits = depth.bits();
    let bit_offset = x * bits;
    let word = (bit_offset / 32) as usize;
    let shift = 32 - bits - (bit_offset % 32);
    (word, shift, depth.max_value())
}

#[inline]
fn read(data: &[u32], wpl: u32, depth: PixelDepth, x: u32, y: u32) -> u32 {
    let (word, shift, mask) = locate(x, depth);
    let idx = (y * wpl) as usize + word;
    (data[idx] >> shift) & mask
}

#[inline]
fn write(data: &mut [u32], wpl: u32, depth: PixelDepth, x: u32, y: u32, val: u32) {
    let (word, shift, mask) = locate(x, depth);
    let idx = (y * wpl) as usize + word;
    if depth == PixelDepth::Bit32 {
        data[idx] = val;
    } else {
        data[idx] = (data[idx] & !(mask << shift)) | ((val & mask) << shift);
    }
}

impl Pix {
    /// Get the pixel value at (x, y).
    ///
    /// Returns `None` if the coordinates are outside the image.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.get_pixel_unchecked(x, y))
    }

    /// Get the pixel value at (x, y) without a bounds check on x.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`; an `x` beyond the width reads padding or
    /// the next row.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u32 {
        read(self.data(), self.wpl(), self.depth(), x, y)
    }

    /// Get the RGB components of a 32 bpp pixel.
    pub fn get_rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if self.depth() != PixelDepth::Bit32 {
            return None;
        }
        let p = self.get_pixel(x, y)?;
        Some(((p >> 24) as u8, (p >> 16) as u8, (p >> 8) as u8))
    }
}

impl PixMut {
    /// Get the pixel value at (x, y).
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(read(self.data(), self.wpl(), self.depth(), x, y))
    }

    /// Set the pixel value at (x, y).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the coordinates are outside the image.
    pub fn set_pixel(&mut self, x: u32, y: u32, val: u32) -> Result<()> {
        if x >= self.width() || y >= self.height() {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * (self.width() as usize) + x as usize,
                len: (self.width() as usize) * (self.height() as usize),
            });
        }
        self.set_pixel_unchecked(x, y, val);
        Ok(())
    }

    /// Set the pixel value at (x, y) without a bounds check on x.
    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, val: u32) {
        let (wpl, depth) = (self.wpl(), self.depth());
        write(self.data_mut(), wpl, depth, x, y, val);
    }

    /// Set a 32 bpp pixel from RGB components (alpha = 255).
    pub fn set_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) -> Result<()> {
        if self.depth() != PixelDepth::Bit32 {
            return Err(Error::UnsupportedDepth(self.depth().bits()));
        }
        let val = (u32::from(r) << 24) | (u32::from(g) << 16) | (u32::from(b) << 8) | 0xff;
        self.set_pixel(x, y, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_all_depths() {
        for bits in [1u32, 2, 4, 8, 16, 32] {
            let depth = PixelDepth::from_bits(bits).unwrap();
            let mut pm = Pix::new(37, 5, depth).unwrap().to_mut();
            let val = depth.max_value();
            pm.set_pixel(36, 4, val).unwrap();
            pm.set_pixel(1, 0, val).unwrap();
            let pix: Pix = pm.into();
            assert_eq!(pix.get_pixel(36, 4), Some(val), "depth {bits}");
            assert_eq!(pix.get_pixel(1, 0), Some(val), "depth {bits}");
            assert_eq!(pix.get_pixel(0, 0), Some(0), "depth {bits}");
            assert_eq!(pix.get_pixel(35, 4), Some(0), "depth {bits}");
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let pix = Pix::new(10, 10, PixelDepth::Bit8).unwrap();
        assert_eq!(pix.get_pixel(10, 0), None);
        let mut pm = pix.to_mut();
        assert!(pm.set_pixel(0, 10, 1).is_err());
    }

    #[test]
    fn test_rgb() {
        let mut pm = Pix::new(4, 4, PixelDepth::Bit32).unwrap().to_mut();
        pm.set_rgb(2, 3, 10, 20, 30).unwrap();
        let pix: Pix = pm.into();
        assert_eq!(pix.get_rgb(2, 3), Some((10, 20, 30)));
    }
}
