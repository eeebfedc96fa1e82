//! Dewarp type definitions
//!
//! Configuration, thresholds, model states and results shared by the
//! builder, the collection and the renderer.

use crate::{RecogError, RecogResult};
use folio_core::{Pix, Pta};

/// Serialization version for `Dewarp` and `Dewarpa`
pub const DEWARP_VERSION_NUMBER: u32 = 4;

/// Largest page number accepted by a collection
pub const MAX_PAGE_NUMBER: u32 = 10000;

/// Default sampling interval, in pixels at model resolution
pub const DEFAULT_SAMPLING: u32 = 30;
/// Smallest allowed sampling interval
pub const MIN_SAMPLING: u32 = 8;
/// Default minimum number of long lines for a model
pub const DEFAULT_MIN_LINES: u32 = 15;
/// Smallest allowed `min_lines`
pub const MIN_MIN_LINES: u32 = 4;
/// Default maximum page distance to a reference model
pub const DEFAULT_MAX_REF_DIST: u32 = 16;
/// Default number of full-resolution field sets kept in the render cache
pub const DEFAULT_CACHE_SIZE: usize = 2;

/// Default maximum line curvature (micro-units)
pub const DEFAULT_MAX_LINECURV: i32 = 150;
/// Default minimum curvature difference between lines (micro-units)
pub const DEFAULT_MIN_DIFF_LINECURV: i32 = 0;
/// Default maximum curvature difference between lines (micro-units)
pub const DEFAULT_MAX_DIFF_LINECURV: i32 = 170;
/// Default maximum edge curvature (micro-units)
pub const DEFAULT_MAX_EDGECURV: i32 = 50;
/// Default maximum left/right edge curvature difference (micro-units)
pub const DEFAULT_MAX_DIFF_EDGECURV: i32 = 40;
/// Default maximum edge slope (milli-units)
pub const DEFAULT_MAX_EDGESLOPE: i32 = 80;
/// Largest value any threshold may take
pub const MAX_THRESHOLD: i32 = 10_000;

/// Plausibility thresholds for built models
///
/// Curvatures are in micro-units (`1e6 * a` for `y = a x^2 + b x + c`),
/// slopes in milli-units (`1000 * dx/dy`). Integer units keep thresholds
/// exact across serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvatureThresholds {
    pub max_linecurv: i32,
    pub min_diff_linecurv: i32,
    pub max_diff_linecurv: i32,
    pub max_edgecurv: i32,
    pub max_diff_edgecurv: i32,
    pub max_edgeslope: i32,
}

impl Default for CurvatureThresholds {
    fn default() -> Self {
        Self {
            max_linecurv: DEFAULT_MAX_LINECURV,
            min_diff_linecurv: DEFAULT_MIN_DIFF_LINECURV,
            max_diff_linecurv: DEFAULT_MAX_DIFF_LINECURV,
            max_edgecurv: DEFAULT_MAX_EDGECURV,
            max_diff_edgecurv: DEFAULT_MAX_DIFF_EDGECURV,
            max_edgeslope: DEFAULT_MAX_EDGESLOPE,
        }
    }
}

impl CurvatureThresholds {
    /// Reject out-of-range values.
    pub fn validate(&self) -> RecogResult<()> {
        let named = [
            ("max_linecurv", self.max_linecurv),
            ("min_diff_linecurv", self.min_diff_linecurv),
            ("max_diff_linecurv", self.max_diff_linecurv),
            ("max_edgecurv", self.max_edgecurv),
            ("max_diff_edgecurv", self.max_diff_edgecurv),
            ("max_edgeslope", self.max_edgeslope),
        ];
        for (name, value) in named {
            if !(0..=MAX_THRESHOLD).contains(&value) {
                return Err(RecogError::InvalidParameter(format!(
                    "{name} = {value} not in [0, {MAX_THRESHOLD}]"
                )));
            }
        }
        if self.min_diff_linecurv > self.max_diff_linecurv {
            return Err(RecogError::InvalidParameter(format!(
                "min_diff_linecurv {} > max_diff_linecurv {}",
                self.min_diff_linecurv, self.max_diff_linecurv
            )));
        }
        Ok(())
    }
}

/// Options for a model collection
///
/// The `with_*` methods only record values; [`super::Dewarpa::new`]
/// rejects out-of-range ones.
#[derive(Debug, Clone)]
pub struct DewarpaOptions {
    /// Sampling interval for disparity arrays (default: 30, minimum: 8)
    ///
    /// Larger values are faster but less accurate.
    pub sampling: u32,

    /// Reduction factor of the images models are built from (1 or 2, default: 1)
    ///
    /// With 2, pages are reduced 2x before textline detection and the
    /// disparity is scaled back up when rendering at full resolution.
    pub reduction_factor: u32,

    /// Minimum number of long text lines for a model (default: 15, minimum: 4)
    pub min_lines: u32,

    /// Maximum page distance to a reference model (default: 16)
    pub max_ref_dist: u32,

    /// Whether to apply horizontal correction when valid (default: true)
    pub use_both: bool,

    /// Whether to skip horizontal correction on multi-column pages (default: false)
    pub check_columns: bool,

    /// Number of full-resolution field sets cached for rendering (default: 2)
    ///
    /// 0 disables the cache.
    pub cache_size: usize,

    /// Gray value for pixels brought in from outside (0-255, default: 255)
    pub gray_in: u8,

    /// Model plausibility thresholds
    pub thresholds: CurvatureThresholds,
}

impl Default for DewarpaOptions {
    fn default() -> Self {
        Self {
            sampling: DEFAULT_SAMPLING,
            reduction_factor: 1,
            min_lines: DEFAULT_MIN_LINES,
            max_ref_dist: DEFAULT_MAX_REF_DIST,
            use_both: true,
            check_columns: false,
            cache_size: DEFAULT_CACHE_SIZE,
            gray_in: 255,
            thresholds: CurvatureThresholds::default(),
        }
    }
}

impl DewarpaOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling interval
    pub fn with_sampling(mut self, sampling: u32) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the reduction factor
    pub fn with_reduction_factor(mut self, factor: u32) -> Self {
        self.reduction_factor = factor;
        self
    }

    /// Set the minimum number of lines
    pub fn with_min_lines(mut self, min_lines: u32) -> Self {
        self.min_lines = min_lines;
        self
    }

    /// Set the maximum reference distance
    pub fn with_max_ref_dist(mut self, dist: u32) -> Self {
        self.max_ref_dist = dist;
        self
    }

    /// Set whether to use both vertical and horizontal disparity
    pub fn with_use_both(mut self, use_both: bool) -> Self {
        self.use_both = use_both;
        self
    }

    /// Set whether to check for multiple text columns
    pub fn with_check_columns(mut self, check: bool) -> Self {
        self.check_columns = check;
        self
    }

    /// Set the render cache size
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the gray value for outside pixels
    pub fn with_gray_in(mut self, gray_in: u8) -> Self {
        self.gray_in = gray_in;
        self
    }

    /// Set the plausibility thresholds
    pub fn with_thresholds(mut self, thresholds: CurvatureThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> RecogResult<()> {
        if self.sampling < MIN_SAMPLING {
            return Err(RecogError::InvalidParameter(format!(
                "sampling {} < {MIN_SAMPLING}",
                self.sampling
            )));
        }
        if self.reduction_factor != 1 && self.reduction_factor != 2 {
            return Err(RecogError::InvalidParameter(format!(
                "reduction factor {} not 1 or 2",
                self.reduction_factor
            )));
        }
        if self.min_lines < MIN_MIN_LINES {
            return Err(RecogError::InvalidParameter(format!(
                "min_lines {} < {MIN_MIN_LINES}",
                self.min_lines
            )));
        }
        if self.max_ref_dist > MAX_PAGE_NUMBER {
            return Err(RecogError::InvalidParameter(format!(
                "max_ref_dist {} > {MAX_PAGE_NUMBER}",
                self.max_ref_dist
            )));
        }
        self.thresholds.validate()
    }
}

/// Build and validity state of one disparity array
///
/// Mirrors [`super::DisparityModel`] without the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelState {
    /// Not built, or the build failed
    Absent,
    /// Built, not yet checked
    Built,
    /// Built, fails the plausibility thresholds
    Invalid,
    /// Built and usable for rendering
    Valid,
}

impl ModelState {
    /// `true` for every state holding an array
    pub fn success(self) -> bool {
        self != ModelState::Absent
    }

    /// `true` only for [`ModelState::Valid`]
    pub fn valid(self) -> bool {
        self == ModelState::Valid
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ModelState::Absent => "absent",
            ModelState::Built => "built",
            ModelState::Invalid => "invalid",
            ModelState::Valid => "valid",
        }
    }
}

/// Text line representation
///
/// A text line is represented as a series of (x, y) points
/// tracing the center of the text.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Points along the center of the text line
    pub points: Vec<(f32, f32)>,
}

impl TextLine {
    /// Create a new text line from points
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }

    /// Get the number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the line is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get the horizontal extent (max_x - min_x)
    pub fn horizontal_extent(&self) -> f32 {
        match self.x_range() {
            Some((lo, hi)) => hi - lo,
            None => 0.0,
        }
    }

    /// Smallest and largest x of the line
    pub fn x_range(&self) -> Option<(f32, f32)> {
        if self.points.is_empty() {
            return None;
        }
        let lo = self.points.iter().map(|p| p.0).fold(f32::MAX, f32::min);
        let hi = self.points.iter().map(|p| p.0).fold(f32::MIN, f32::max);
        Some((lo, hi))
    }

    /// Get the y-coordinate at the middle x-position
    pub fn mid_y(&self) -> Option<f32> {
        self.points.get(self.points.len() / 2).map(|p| p.1)
    }

    /// Leftmost and rightmost points
    pub fn endpoints(&self) -> Option<((f32, f32), (f32, f32))> {
        let left = self.points.iter().copied().min_by(|a, b| a.0.total_cmp(&b.0))?;
        let right = self.points.iter().copied().max_by(|a, b| a.0.total_cmp(&b.0))?;
        Some((left, right))
    }

    /// Points as a point array
    pub fn to_pta(&self) -> Pta {
        self.points.iter().copied().collect()
    }
}

/// Counts of model states over a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    /// Pages in `0..=max_page` with neither a model nor a reference
    pub no_model: u32,
    /// Pages with a built vertical array
    pub v_success: u32,
    /// Pages with a valid vertical array
    pub v_valid: u32,
    /// Pages with a built horizontal array
    pub h_success: u32,
    /// Pages with a valid horizontal array
    pub h_valid: u32,
    /// Pages redirected to a reference model
    pub references: u32,
}

/// State of one page in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStatus {
    pub vertical: ModelState,
    pub horizontal: ModelState,
    /// Whether a slope field was built
    pub slope: bool,
    /// Donor page, for a reference record
    pub reference: Option<u32>,
}

/// Result of rendering one page
#[derive(Debug)]
pub struct DewarpResult {
    /// The rendered image; the input itself when nothing was applied
    pub pix: Pix,

    /// Page whose model was used, if any
    pub model_page: Option<u32>,

    /// Whether vertical correction was applied
    pub v_applied: bool,

    /// Whether horizontal correction was applied
    pub h_applied: bool,
}

impl DewarpResult {
    /// Create a new dewarp result
    pub fn new(pix: Pix, model_page: Option<u32>, v_applied: bool, h_applied: bool) -> Self {
        Self {
            pix,
            model_page,
            v_applied,
            h_applied,
        }
    }

    /// Pass-through result for a page without a usable model
    pub fn unchanged(pix: &Pix) -> Self {
        Self::new(pix.clone(), None, false, false)
    }

    /// Check if any correction was applied
    pub fn was_corrected(&self) -> bool {
        self.v_applied || self.h_applied
    }
}
