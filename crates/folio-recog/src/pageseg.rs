//! Page segmentation
//!
//! Text column counting from the vertical projection profile.
//!
//! Words are first joined into solid bars with a horizontal closing, so
//! inter-word spaces do not show up in the profile. A gutter is then an
//! interior run of columns whose foreground count stays below a fraction
//! of the profile peak, wide enough and bounded by text on both sides.

use crate::{RecogError, RecogResult};
use folio_core::{Pix, PixelDepth};
use folio_morph::close_brick;
use log::debug;

/// Options for text column counting
#[derive(Debug, Clone)]
pub struct ColumnCountOptions {
    /// Profile values at or below `delta_fract * peak` belong to a gutter
    /// (default: 0.3)
    pub delta_fract: f32,
    /// Fraction of the page clipped from each side before projecting
    /// (default: 0.1)
    pub clip_fract: f32,
    /// Horizontal closing size used to join words (default: 15)
    pub word_close: u32,
    /// Minimum gutter width as a fraction of the page width (default: 0.02)
    pub min_gutter_fract: f32,
    /// Threshold used to binarize 8 and 32 bpp input (default: 128)
    pub threshold: u32,
}

impl Default for ColumnCountOptions {
    fn default() -> Self {
        Self {
            delta_fract: 0.3,
            clip_fract: 0.1,
            word_close: 15,
            min_gutter_fract: 0.02,
            threshold: 128,
        }
    }
}

impl ColumnCountOptions {
    /// Set the gutter threshold fraction
    pub fn with_delta_fract(mut self, fract: f32) -> Self {
        self.delta_fract = fract;
        self
    }

    /// Set the clip fraction
    pub fn with_clip_fract(mut self, fract: f32) -> Self {
        self.clip_fract = fract;
        self
    }

    /// Set the word-joining closing size
    pub fn with_word_close(mut self, size: u32) -> Self {
        self.word_close = size;
        self
    }

    fn validate(&self) -> RecogResult<()> {
        if !(0.0..1.0).contains(&self.delta_fract) {
            return Err(RecogError::InvalidParameter(format!(
                "delta_fract {} not in [0, 1)",
                self.delta_fract
            )));
        }
        if !(0.0..0.5).contains(&self.clip_fract) {
            return Err(RecogError::InvalidParameter(format!(
                "clip_fract {} not in [0, 0.5)",
                self.clip_fract
            )));
        }
        if self.word_close == 0 {
            return Err(RecogError::InvalidParameter("word_close must be > 0".into()));
        }
        Ok(())
    }
}

/// Detects the number of text columns on a page
pub trait ColumnCounter: Send + Sync {
    /// Number of text columns, 0 for a page without text
    fn count_columns(&self, pix: &Pix) -> RecogResult<u32>;
}

/// [`ColumnCounter`] based on [`count_text_columns`]
#[derive(Debug, Clone, Default)]
pub struct ProjectionColumnCounter {
    pub options: ColumnCountOptions,
}

impl ProjectionColumnCounter {
    pub fn new(options: ColumnCountOptions) -> Self {
        Self { options }
    }
}

impl ColumnCounter for ProjectionColumnCounter {
    fn count_columns(&self, pix: &Pix) -> RecogResult<u32> {
        count_text_columns(pix, &self.options)
    }
}

/// Count the text columns of a page image
///
/// # Arguments
/// * `pix` - Page image, 1, 8 or 32 bpp
/// * `options` - Counting options
///
/// # Returns
/// The number of columns; 0 if no text is found in the clipped region
pub fn count_text_columns(pix: &Pix, options: &ColumnCountOptions) -> RecogResult<u32> {
    options.validate()?;
    let binary = match pix.depth() {
        PixelDepth::Bit1 => pix.clone(),
        PixelDepth::Bit8 | PixelDepth::Bit32 => pix.threshold_to_binary(options.threshold)?,
        d => {
            return Err(RecogError::UnsupportedDepth {
                expected: "1, 8 or 32 bpp",
                actual: d.bits(),
            });
        }
    };
    let joined = close_brick(&binary, options.word_close, 1)?;

    let (w, h) = (joined.width(), joined.height());
    let x0 = (options.clip_fract * w as f32) as u32;
    let x1 = w - x0;
    let y0 = (options.clip_fract * h as f32) as u32;
    let y1 = h - y0;

    let profile: Vec<u32> = (x0..x1)
        .map(|x| (y0..y1).map(|y| joined.get_pixel_unchecked(x, y)).sum())
        .collect();
    let peak = profile.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        return Ok(0);
    }

    let thresh = options.delta_fract * peak as f32;
    let is_text = |v: u32| v as f32 > thresh;
    let (Some(first), Some(last)) = (
        profile.iter().position(|&v| is_text(v)),
        profile.iter().rposition(|&v| is_text(v)),
    ) else {
        return Ok(0);
    };

    let min_gutter = ((options.min_gutter_fract * w as f32) as usize).max(1);
    let mut gutters = 0;
    let mut run = 0usize;
    for &v in &profile[first..=last] {
        if is_text(v) {
            if run >= min_gutter {
                gutters += 1;
            }
            run = 0;
        } else {
            run += 1;
        }
    }

    debug!(
        "column count: peak {peak}, text from {} to {}, {gutters} gutter(s)",
        first + x0 as usize,
        last + x0 as usize
    );
    Ok(gutters + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(w: u32, h: u32, spans: &[(u32, u32)]) -> Pix {
        let mut pm = Pix::new(w, h, PixelDepth::Bit1).unwrap().to_mut();
        for y in (20..h - 20).filter(|y| y % 20 < 8) {
            for &(xa, xb) in spans {
                for x in xa..xb {
                    pm.set_pixel(x, y, 1).unwrap();
                }
            }
        }
        pm.into()
    }

    #[test]
    fn test_blank_page_has_no_columns() {
        let pix = Pix::new(300, 300, PixelDepth::Bit1).unwrap();
        let n = count_text_columns(&pix, &ColumnCountOptions::default()).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_one_and_two_columns() {
        let opts = ColumnCountOptions::default();
        let one = bars(400, 300, &[(20, 380)]);
        assert_eq!(count_text_columns(&one, &opts).unwrap(), 1);
        let two = bars(400, 300, &[(20, 170), (230, 380)]);
        assert_eq!(count_text_columns(&two, &opts).unwrap(), 2);
    }

    #[test]
    fn test_narrow_gap_is_not_a_gutter() {
        // a 4 pixel gap is closed by the word-joining step
        let pix = bars(400, 300, &[(20, 198), (202, 380)]);
        let n = count_text_columns(&pix, &ColumnCountOptions::default()).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_invalid_options() {
        let pix = bars(400, 300, &[(20, 380)]);
        let opts = ColumnCountOptions::default().with_clip_fract(0.6);
        assert!(count_text_columns(&pix, &opts).is_err());
    }
}
