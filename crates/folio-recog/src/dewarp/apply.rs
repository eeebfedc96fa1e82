//! Dewarp application - applying disparity arrays to images
//!
//! Pixels are moved by nearest-neighbor lookup:
//!
//! ```text
//! vertical:   dest(x, y) = src(x, y + v(x, y))
//! horizontal: dest(x, y) = src(x + h(x, y), y)
//! ```
//!
//! Destination pixels whose source falls outside the image are filled
//! with the bring-in gray value.

use crate::{RecogError, RecogResult};
use folio_core::{FPix, Pix, PixelDepth};

/// Moves pixels according to a full-resolution disparity field
pub trait Resampler: Send + Sync {
    /// Apply a vertical disparity field
    fn apply_vertical(&self, pix: &Pix, field: &FPix, gray_in: u8) -> RecogResult<Pix>;

    /// Apply a horizontal disparity field
    fn apply_horizontal(&self, pix: &Pix, field: &FPix, gray_in: u8) -> RecogResult<Pix>;
}

/// Nearest-neighbor [`Resampler`] for 1, 8 and 32 bpp images
#[derive(Debug, Clone, Copy, Default)]
pub struct SampledResampler;

impl Resampler for SampledResampler {
    fn apply_vertical(&self, pix: &Pix, field: &FPix, gray_in: u8) -> RecogResult<Pix> {
        remap(pix, field, gray_in, true)
    }

    fn apply_horizontal(&self, pix: &Pix, field: &FPix, gray_in: u8) -> RecogResult<Pix> {
        remap(pix, field, gray_in, false)
    }
}

/// Pixel value used for bring-in pixels at the given depth
///
/// For 1 bpp, a light gray (>= 128) brings in background (0).
pub fn fill_value(depth: PixelDepth, gray_in: u8) -> RecogResult<u32> {
    let g = u32::from(gray_in);
    match depth {
        PixelDepth::Bit1 => Ok(u32::from(gray_in < 128)),
        PixelDepth::Bit8 => Ok(g),
        PixelDepth::Bit32 => Ok((g << 24) | (g << 16) | (g << 8) | 0xff),
        d => Err(RecogError::UnsupportedDepth {
            expected: "1, 8 or 32 bpp",
            actual: d.bits(),
        }),
    }
}

fn remap(pix: &Pix, field: &FPix, gray_in: u8, vertical: bool) -> RecogResult<Pix> {
    let fill = fill_value(pix.depth(), gray_in)?;
    let (w, h) = (pix.width(), pix.height());
    if field.width() < w || field.height() < h {
        return Err(RecogError::InvalidParameter(format!(
            "disparity field {}x{} smaller than image {w}x{h}",
            field.width(),
            field.height()
        )));
    }

    let mut out = Pix::new(w, h, pix.depth())?.to_mut();
    out.copy_resolution_from(pix);
    let (wi, hi) = (i64::from(w), i64::from(h));
    for y in 0..h {
        for x in 0..w {
            let d = field.get_pixel_unchecked(x, y);
            let val = if vertical {
                let ys = (y as f32 + d).round() as i64;
                if (0..hi).contains(&ys) {
                    pix.get_pixel_unchecked(x, ys as u32)
                } else {
                    fill
                }
            } else {
                let xs = (x as f32 + d).round() as i64;
                if (0..wi).contains(&xs) {
                    pix.get_pixel_unchecked(xs as u32, y)
                } else {
                    fill
                }
            };
            out.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Pix {
        let mut pm = Pix::new(w, h, PixelDepth::Bit8).unwrap().to_mut();
        for y in 0..h {
            for x in 0..w {
                pm.set_pixel_unchecked(x, y, 10 * y + x);
            }
        }
        pm.into()
    }

    #[test]
    fn test_zero_field_is_identity() {
        let pix = gradient(8, 6);
        let field = FPix::new(8, 6).unwrap();
        let out = SampledResampler.apply_vertical(&pix, &field, 255).unwrap();
        assert!(out.equals(&pix));
        let out = SampledResampler.apply_horizontal(&pix, &field, 255).unwrap();
        assert!(out.equals(&pix));
    }

    #[test]
    fn test_vertical_shift_and_fill() {
        let pix = gradient(8, 6);
        let field = FPix::new_with_value(10, 10, 2.0).unwrap();
        let out = SampledResampler.apply_vertical(&pix, &field, 200).unwrap();
        assert_eq!(out.get_pixel(3, 0), pix.get_pixel(3, 2));
        assert_eq!(out.get_pixel(3, 3), pix.get_pixel(3, 5));
        assert_eq!(out.get_pixel(3, 4), Some(200));
    }

    #[test]
    fn test_horizontal_shift() {
        let pix = gradient(8, 6);
        let field = FPix::new_with_value(8, 6, -1.0).unwrap();
        let out = SampledResampler.apply_horizontal(&pix, &field, 255).unwrap();
        assert_eq!(out.get_pixel(0, 2), Some(255));
        assert_eq!(out.get_pixel(5, 2), pix.get_pixel(4, 2));
    }

    #[test]
    fn test_binary_fill_is_background() {
        let mut pm = Pix::new(4, 4, PixelDepth::Bit1).unwrap().to_mut();
        pm.set_all_arbitrary(1);
        let pix: Pix = pm.into();
        let field = FPix::new_with_value(4, 4, 3.0).unwrap();
        let out = SampledResampler.apply_vertical(&pix, &field, 255).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(1));
        assert_eq!(out.get_pixel(0, 1), Some(0));
    }

    #[test]
    fn test_field_too_small() {
        let pix = gradient(8, 6);
        let field = FPix::new(7, 6).unwrap();
        assert!(SampledResampler.apply_vertical(&pix, &field, 255).is_err());
    }

    #[test]
    fn test_unsupported_depth() {
        let pix = Pix::new(4, 4, PixelDepth::Bit4).unwrap();
        let field = FPix::new(4, 4).unwrap();
        assert!(SampledResampler.apply_vertical(&pix, &field, 255).is_err());
    }
}
