//! Float grids
//!
//! [`FPix`] is a dense row-major grid of `f32`. Sampled disparity arrays
//! and their full-resolution expansions are both `FPix`; the text format
//! used to persist them lives in [`serial`].
//!
//! ```
//! use folio_core::FPix;
//!
//! let mut grid = FPix::new(9, 7).unwrap();
//! grid.set_pixel(8, 6, -2.5).unwrap();
//! let full = grid.scale_by_integer(30).unwrap();
//! assert_eq!(full.dimensions(), (241, 181));
//! assert_eq!(full.get_pixel(240, 180).unwrap(), -2.5);
//! ```

pub mod serial;

use crate::error::{Error, Result};

/// Row-major `f32` grid without padding
///
/// Value (x, y) lives at `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FPix {
    width: u32,
    height: u32,
    data: Vec<f32>,
    /// Resolution in ppi, 0 when unknown
    xres: i32,
    yres: i32,
}

impl FPix {
    /// Zero-filled grid.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`] for a zero width or height.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_with_value(width, height, 0.0)
    }

    /// Grid filled with `value`.
    pub fn new_with_value(width: u32, height: u32, value: f32) -> Result<Self> {
        Self::from_data(width, height, vec![value; width as usize * height as usize])
    }

    /// Wrap row-major values.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`] for a zero side, [`Error::InvalidParameter`]
    /// when `data` does not hold exactly `width * height` values.
    pub fn from_data(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "{width}x{height} grid needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(FPix {
            width,
            height,
            data,
            xres: 0,
            yres: 0,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// (width, height)
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// (xres, yres)
    #[inline]
    pub fn resolution(&self) -> (i32, i32) {
        (self.xres, self.yres)
    }

    #[inline]
    pub fn set_resolution(&mut self, xres: i32, yres: i32) {
        self.xres = xres;
        self.yres = yres;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Result<usize> {
        let idx = y as usize * self.width as usize + x as usize;
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: idx,
                len: self.data.len(),
            });
        }
        Ok(idx)
    }

    /// Value at (x, y).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] outside the grid.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<f32> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Store `value` at (x, y).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] outside the grid.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: f32) -> Result<()> {
        let i = self.index(x, y)?;
        self.data[i] = value;
        Ok(())
    }

    /// Value at (x, y); panics past the end of the data.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, value: f32) {
        let w = self.width as usize;
        self.data[y as usize * w + x as usize] = value;
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Values of row `y`; panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[f32] {
        let w = self.width as usize;
        &self.data[y as usize * w..(y as usize + 1) * w]
    }

    /// Pixel-wise sum of two images of equal size
    pub fn add(&self, other: &FPix) -> Result<FPix> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::IncompatibleSizes(
                self.width,
                self.height,
                other.width,
                other.height,
            ));
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + b)
            .collect();
        let mut out = FPix::from_data(self.width, self.height, data)?;
        out.set_resolution(self.xres, self.yres);
        Ok(out)
    }

    /// Multiply every pixel by a constant
    pub fn mul_constant(&mut self, value: f32) {
        self.data.iter_mut().for_each(|v| *v *= value);
    }

    /// Minimum pixel value
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Maximum pixel value
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Scale up by an integer factor using bilinear interpolation
    ///
    /// The output has size `factor * (w - 1) + 1` by `factor * (h - 1) + 1`,
    /// so its corners coincide with the input corners and every input
    /// sample lands exactly on output pixel `(factor * x, factor * y)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `factor` is 0.
    pub fn scale_by_integer(&self, factor: u32) -> Result<FPix> {
        if factor == 0 {
            return Err(Error::InvalidParameter("factor must be > 0".into()));
        }
        let (ws, hs) = self.dimensions();
        let wd = factor * (ws - 1) + 1;
        let hd = factor * (hs - 1) + 1;
        let mut out = FPix::new(wd, hd)?;
        out.set_resolution(self.xres * factor as i32, self.yres * factor as i32);

        let split = |d: u32, n: u32| -> (u32, f32) {
            let i = d / factor;
            let r = d % factor;
            if i >= n - 1 || r == 0 {
                (i.min(n - 1), 0.0)
            } else {
                (i, r as f32 / factor as f32)
            }
        };

        for yd in 0..hd {
            let (i, fy) = split(yd, hs);
            for xd in 0..wd {
                let (j, fx) = split(xd, ws);
                let v00 = self.get_pixel_unchecked(j, i);
                let val = match (fx > 0.0, fy > 0.0) {
                    (false, false) => v00,
                    (true, false) => {
                        let v10 = self.get_pixel_unchecked(j + 1, i);
                        v00 + fx * (v10 - v00)
                    }
                    (false, true) => {
                        let v01 = self.get_pixel_unchecked(j, i + 1);
                        v00 + fy * (v01 - v00)
                    }
                    (true, true) => {
                        let v10 = self.get_pixel_unchecked(j + 1, i);
                        let v01 = self.get_pixel_unchecked(j, i + 1);
                        let v11 = self.get_pixel_unchecked(j + 1, i + 1);
                        let top = v00 + fx * (v10 - v00);
                        let bot = v01 + fx * (v11 - v01);
                        top + fy * (bot - top)
                    }
                };
                out.set_pixel_unchecked(xd, yd, val);
            }
        }
        Ok(out)
    }

    /// Add a border whose values continue the edge slope linearly
    ///
    /// Each new pixel on the left/right continues the difference between
    /// the two outermost columns of its row; top/bottom pixels do the same
    /// along columns (including the new left/right border). With a single
    /// column or row the edge value is replicated.
    pub fn add_slope_border(&self, left: u32, right: u32, top: u32, bot: u32) -> Result<FPix> {
        let (ws, hs) = self.dimensions();
        let wd = ws + left + right;
        let hd = hs + top + bot;
        let mut out = FPix::new(wd, hd)?;
        out.set_resolution(self.xres, self.yres);

        for y in 0..hs {
            for x in 0..ws {
                out.set_pixel_unchecked(x + left, y + top, self.get_pixel_unchecked(x, y));
            }
        }

        for y in top..top + hs {
            let v0 = out.get_pixel_unchecked(left, y);
            let slope = if ws > 1 { v0 - out.get_pixel_unchecked(left + 1, y) } else { 0.0 };
            for x in 0..left {
                out.set_pixel_unchecked(x, y, v0 + (left - x) as f32 * slope);
            }
            let xe = left + ws - 1;
            let ve = out.get_pixel_unchecked(xe, y);
            let slope = if ws > 1 { ve - out.get_pixel_unchecked(xe - 1, y) } else { 0.0 };
            for x in xe + 1..wd {
                out.set_pixel_unchecked(x, y, ve + (x - xe) as f32 * slope);
            }
        }

        for x in 0..wd {
            let v0 = out.get_pixel_unchecked(x, top);
            let slope = if hs > 1 { v0 - out.get_pixel_unchecked(x, top + 1) } else { 0.0 };
            for y in 0..top {
                out.set_pixel_unchecked(x, y, v0 + (top - y) as f32 * slope);
            }
            let ye = top + hs - 1;
            let ve = out.get_pixel_unchecked(x, ye);
            let slope = if hs > 1 { ve - out.get_pixel_unchecked(x, ye - 1) } else { 0.0 };
            for y in ye + 1..hd {
                out.set_pixel_unchecked(x, y, ve + (y - ye) as f32 * slope);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fpix_creation() {
        let fpix = FPix::new(100, 200).unwrap();
        assert_eq!(fpix.dimensions(), (100, 200));
        assert_eq!(fpix.data().len(), 20000);
        assert!(FPix::new(0, 10).is_err());
    }

    #[test]
    fn test_from_data_length_check() {
        assert!(FPix::from_data(2, 2, vec![0.0; 3]).is_err());
        let fpix = FPix::from_data(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(fpix.get_pixel(1, 1).unwrap(), 4.0);
        assert_eq!(fpix.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_add_requires_same_size() {
        let a = FPix::new_with_value(3, 3, 1.0).unwrap();
        let b = FPix::new_with_value(3, 3, 2.0).unwrap();
        assert_eq!(a.add(&b).unwrap().get_pixel(2, 2).unwrap(), 3.0);
        let c = FPix::new(3, 4).unwrap();
        assert!(a.add(&c).is_err());
    }

    #[test]
    fn test_scale_by_integer_size_and_samples() {
        let sampled = FPix::from_data(3, 2, vec![0.0, 3.0, 9.0, 1.0, 4.0, -2.0]).unwrap();
        let scaled = sampled.scale_by_integer(4).unwrap();
        assert_eq!(scaled.dimensions(), (9, 5));
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(
                    scaled.get_pixel(4 * x, 4 * y).unwrap(),
                    sampled.get_pixel(x, y).unwrap()
                );
            }
        }
        // midway between 0.0 and 3.0
        assert!((scaled.get_pixel(2, 0).unwrap() - 1.5).abs() < 1e-6);
        // center of the first cell
        assert!((scaled.get_pixel(2, 2).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_single_column() {
        let sampled = FPix::from_data(1, 2, vec![2.0, 6.0]).unwrap();
        let scaled = sampled.scale_by_integer(2).unwrap();
        assert_eq!(scaled.dimensions(), (1, 3));
        assert_eq!(scaled.get_pixel(0, 1).unwrap(), 4.0);
    }

    #[test]
    fn test_slope_border_is_linear() {
        let fpix = FPix::from_data(3, 1, vec![1.0, 2.0, 3.0]).unwrap();
        let out = fpix.add_slope_border(2, 3, 0, 0).unwrap();
        assert_eq!(out.row(0), &[-1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_slope_border_vertical() {
        let fpix = FPix::from_data(1, 2, vec![5.0, 3.0]).unwrap();
        let out = fpix.add_slope_border(0, 0, 1, 2).unwrap();
        assert_eq!(out.data(), &[7.0, 5.0, 3.0, 1.0, -1.0]);
    }
}
