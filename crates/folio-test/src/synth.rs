//! Synthetic page generators
//!
//! Draws binary "pages" whose text lines are solid bars broken into words.
//! Lines can bow (the quadratic sag of a page curling off a book spine),
//! the text block can drift sideways down the page (keystone), and the
//! block can be split into two columns.
//!
//! Line `i` of `n` has center
//!
//! ```text
//! y(x) = base_i + sag_i * ((x - w/2) / (w/2))^2
//! sag_i = sag * (1 + sag_growth * i / (n - 1))
//! ```
//!
//! so a positive `sag` bends line ends downward, and its curvature in
//! `y = a x^2 + ...` form is `a = sag_i / (w/2)^2`.

use crate::error::{TestError, TestResult};
use folio_core::{Pix, PixelDepth};

/// Layout of a synthetic page
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Page width in pixels
    pub width: u32,
    /// Page height in pixels
    pub height: u32,
    /// Number of text lines
    pub nlines: u32,
    /// Center y of the first line
    pub top: u32,
    /// Distance from the last line center to the bottom of the page
    pub bottom: u32,
    /// Left margin at mid-page height
    pub left: u32,
    /// Right margin at mid-page height
    pub right: u32,
    /// Line thickness
    pub thickness: u32,
    /// Bow of the first line at the page edges, in pixels
    pub sag: f32,
    /// Relative extra bow of the last line (0 = all lines bow equally)
    pub sag_growth: f32,
    /// Sideways drift of the text block per pixel of y
    pub skew: f32,
    /// 1 or 2
    pub columns: u32,
    /// Gap between the two columns
    pub gutter: u32,
    /// Word length
    pub word: u32,
    /// Space between words
    pub space: u32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1300,
            nlines: 20,
            top: 100,
            bottom: 100,
            left: 80,
            right: 80,
            thickness: 9,
            sag: 0.0,
            sag_growth: 0.0,
            skew: 0.0,
            columns: 1,
            gutter: 100,
            word: 60,
            space: 10,
        }
    }
}

impl PageLayout {
    /// Flat single-column page with default geometry
    pub fn flat() -> Self {
        Self::default()
    }

    /// Single-column page whose lines bow by `sag` pixels, more so lower down
    pub fn curved(sag: f32) -> Self {
        Self {
            sag,
            sag_growth: 1.0,
            ..Self::default()
        }
    }

    pub fn with_lines(mut self, nlines: u32) -> Self {
        self.nlines = nlines;
        self
    }

    pub fn with_skew(mut self, skew: f32) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Base (mid-page) y of line `i`
    pub fn line_base(&self, i: u32) -> f32 {
        if self.nlines <= 1 {
            return self.top as f32;
        }
        let span = (self.height - self.top - self.bottom) as f32;
        self.top as f32 + span * i as f32 / (self.nlines - 1) as f32
    }

    /// Bow of line `i` at the page edges
    pub fn line_sag(&self, i: u32) -> f32 {
        if self.nlines <= 1 {
            return self.sag;
        }
        self.sag * (1.0 + self.sag_growth * i as f32 / (self.nlines - 1) as f32)
    }

    /// Center y of line `i` at column `x`
    pub fn line_center(&self, i: u32, x: f32) -> f32 {
        let half = self.width as f32 / 2.0;
        let t = (x - half) / half;
        self.line_base(i) + self.line_sag(i) * t * t
    }

    /// Horizontal extents of the text on a line whose base is at `y`
    pub fn segments(&self, y: f32) -> Vec<(u32, u32)> {
        let drift = self.skew * (y - self.height as f32 / 2.0);
        let x0 = (self.left as f32 + drift).round().max(0.0) as u32;
        let x1 = ((self.width - self.right) as f32 + drift)
            .round()
            .min((self.width - 1) as f32) as u32;
        if self.columns < 2 {
            return vec![(x0, x1)];
        }
        let mid = (x0 + x1) / 2;
        let g = self.gutter / 2;
        vec![(x0, mid - g), (mid + g, x1)]
    }

    fn check(&self) -> TestResult<()> {
        if self.width < 200 || self.height < 200 {
            return Err(TestError::InvalidLayout(format!(
                "page {}x{} too small",
                self.width, self.height
            )));
        }
        if self.top + self.bottom >= self.height || self.left + self.right >= self.width {
            return Err(TestError::InvalidLayout("margins exceed page".into()));
        }
        if self.columns == 0 || self.columns > 2 || self.word == 0 {
            return Err(TestError::InvalidLayout(format!(
                "columns = {}, word = {}",
                self.columns, self.word
            )));
        }
        if self.columns == 2 && self.gutter >= self.width - self.left - self.right {
            return Err(TestError::InvalidLayout("gutter exceeds text block".into()));
        }
        Ok(())
    }
}

/// Draw a 1 bpp page with the given layout
pub fn render_page(layout: &PageLayout) -> TestResult<Pix> {
    layout.check()?;
    let (w, h) = (layout.width, layout.height);
    let mut pm = Pix::new(w, h, PixelDepth::Bit1)?.to_mut();
    pm.set_resolution(300, 300);
    let half = (layout.thickness / 2) as f32;
    let pitch = layout.word + layout.space;

    for i in 0..layout.nlines {
        for (x0, x1) in layout.segments(layout.line_base(i)) {
            for x in x0..=x1 {
                // the last word always reaches the segment end
                let in_word = (x - x0) % pitch < layout.word || x1 - x < layout.word;
                if !in_word {
                    continue;
                }
                let yc = layout.line_center(i, x as f32);
                let ya = (yc - half).round().max(0.0) as u32;
                let yb = (yc + half).round().min((h - 1) as f32) as u32;
                for y in ya..=yb {
                    pm.set_pixel_unchecked(x, y, 1);
                }
            }
        }
    }
    Ok(pm.into())
}

/// Draw a page and convert it to 8 bpp (black text on white)
pub fn render_gray_page(layout: &PageLayout) -> TestResult<Pix> {
    Ok(render_page(layout)?.convert_to_gray()?)
}

/// Blank 1 bpp page
pub fn blank_page(width: u32, height: u32) -> TestResult<Pix> {
    Ok(Pix::new(width, height, PixelDepth::Bit1)?)
}

/// Grid pattern for checking pixel moves: one-pixel lines every `step`
/// pixels in both directions.
pub fn grid_page(width: u32, height: u32, step: u32) -> TestResult<Pix> {
    if step == 0 {
        return Err(TestError::InvalidLayout("step must be positive".into()));
    }
    let mut pm = Pix::new(width, height, PixelDepth::Bit1)?.to_mut();
    for y in 0..height {
        for x in 0..width {
            if x % step == 0 || y % step == 0 {
                pm.set_pixel_unchecked(x, y, 1);
            }
        }
    }
    Ok(pm.into())
}
