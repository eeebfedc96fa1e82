//! Disparity fields
//!
//! A disparity field is a coarse grid of pixel displacements sampled every
//! `sampling` pixels (at model resolution), together with an optional
//! full-resolution expansion.
//!
//! Sample `(j, i)` sits at model pixel `(j * sampling, i * sampling)`. The
//! grid has `nx = (w + 2 * sampling - 2) / sampling` columns, which is the
//! smallest count whose last sample reaches or passes column `w - 1`
//! (likewise for rows).
//!
//! Expansion is bilinear between samples. A reduced model (`redfactor == 2`)
//! is expanded by `sampling * redfactor` and its values are multiplied by
//! `redfactor`, so it applies directly to the full-resolution page. When the
//! expanded grid is still smaller than the target it is extended on the
//! right and bottom by continuing the edge slope.

use crate::RecogResult;
use folio_core::FPix;
use std::sync::Arc;

/// What a disparity field displaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisparityKind {
    /// Shift in y: `dest(x, y) = src(x, y + v(x, y))`
    Vertical,
    /// Shift in x: `dest(x, y) = src(x + h(x, y), y)`
    Horizontal,
    /// Additional shift in x from surface foreshortening, applied with
    /// the horizontal field
    Slope,
}

impl DisparityKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DisparityKind::Vertical => "vertical",
            DisparityKind::Horizontal => "horizontal",
            DisparityKind::Slope => "slope",
        }
    }
}

/// Number of samples needed to cover `size` pixels at the given stride
pub fn sample_count(size: u32, sampling: u32) -> u32 {
    (size + 2 * sampling - 2) / sampling
}

/// Sampled disparity array with its optional full-resolution expansion
#[derive(Debug, Clone)]
pub struct DisparityField {
    kind: DisparityKind,
    sampling: u32,
    redfactor: u32,
    sampled: FPix,
    full: Option<Arc<FPix>>,
}

impl DisparityField {
    /// Wrap a sampled grid
    pub fn new(kind: DisparityKind, sampling: u32, redfactor: u32, sampled: FPix) -> Self {
        Self {
            kind,
            sampling,
            redfactor,
            sampled,
            full: None,
        }
    }

    pub fn kind(&self) -> DisparityKind {
        self.kind
    }

    pub fn sampling(&self) -> u32 {
        self.sampling
    }

    pub fn redfactor(&self) -> u32 {
        self.redfactor
    }

    /// The sampled grid
    pub fn sampled(&self) -> &FPix {
        &self.sampled
    }

    /// `(nx, ny)` of the sampled grid
    pub fn sample_dimensions(&self) -> (u32, u32) {
        self.sampled.dimensions()
    }

    /// The stored full-resolution grid, if populated
    pub fn full(&self) -> Option<&FPix> {
        self.full.as_deref()
    }

    /// Stored full-resolution grid, shared, if it covers `width x height`
    pub(crate) fn full_covering(&self, width: u32, height: u32) -> Option<Arc<FPix>> {
        self.full
            .as_ref()
            .filter(|f| f.width() >= width && f.height() >= height)
            .cloned()
    }

    /// Largest absolute sampled value
    pub fn max_abs(&self) -> f32 {
        self.sampled.data().iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }

    /// Expand the sampled grid to cover `width x height` full-resolution pixels
    ///
    /// The result is never smaller than the target; it may be larger.
    pub fn expand(&self, width: u32, height: u32) -> RecogResult<FPix> {
        let factor = self.sampling * self.redfactor;
        let mut full = self.sampled.scale_by_integer(factor)?;
        if self.redfactor != 1 {
            full.mul_constant(self.redfactor as f32);
        }
        let (fw, fh) = full.dimensions();
        if fw < width || fh < height {
            full = full.add_slope_border(0, width.saturating_sub(fw), 0, height.saturating_sub(fh))?;
        }
        Ok(full)
    }

    /// Compute and store the full-resolution grid
    ///
    /// Does nothing if a stored grid already covers the target.
    pub fn populate(&mut self, width: u32, height: u32) -> RecogResult<()> {
        if self.full_covering(width, height).is_none() {
            self.full = Some(Arc::new(self.expand(width, height)?));
        }
        Ok(())
    }

    /// Drop the stored full-resolution grid
    pub fn clear_full(&mut self) {
        self.full = None;
    }
}
