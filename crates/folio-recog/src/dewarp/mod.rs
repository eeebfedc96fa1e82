//! Dewarping - Page distortion correction
//!
//! Corrects the curvature of text lines in scanned pages of bound books
//! and documents that don't lie flat on the scanner.
//!
//! # Overview
//!
//! 1. [`Dewarp::build`] finds the long text lines of a binary page and
//!    derives sampled disparity fields from them: vertical (line
//!    curvature), horizontal (slanted text edges) and slope
//!    (foreshortening).
//! 2. [`validate`] marks each field valid or invalid against the
//!    [`CurvatureThresholds`].
//! 3. A [`Dewarpa`] collects the models of a document. Once all pages are
//!    built, [`Dewarpa::resolve_references`] lets pages without a valid
//!    model use the model of the nearest page of the same parity.
//! 4. [`Dewarpa::apply_disparity`] expands the fields of the page's model
//!    to full resolution and moves the pixels.
//!
//! # Example
//!
//! ```no_run
//! use folio_recog::dewarp::{Dewarpa, DewarpaOptions};
//! use folio_core::{Pix, PixelDepth};
//!
//! # fn main() -> folio_recog::RecogResult<()> {
//! # let pages = vec![Pix::new(2000, 2800, PixelDepth::Bit1)?; 4];
//! let options = DewarpaOptions::new()
//!     .with_max_ref_dist(4)
//!     .with_check_columns(true);
//! let mut dewa = Dewarpa::new(options)?;
//! for (i, pix) in pages.iter().enumerate() {
//!     dewa.build_and_insert(pix, i as u32)?;
//! }
//! dewa.resolve_references()?;
//!
//! for (i, pix) in pages.iter().enumerate() {
//!     let result = dewa.apply_disparity(pix, i as u32)?;
//!     println!("page {i}: corrected {}", result.was_corrected());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Pages that cannot be modeled are not errors: they are reported through
//! [`ModelState`] and rendered unchanged.

mod apply;
mod cache;
mod dewarpa;
mod field;
mod model;
mod serial;
mod textline;
mod types;
mod validity;

pub use apply::{Resampler, SampledResampler, fill_value};
pub use dewarpa::Dewarpa;
pub use field::{DisparityField, DisparityKind, sample_count};
pub use model::{Dewarp, DisparityModel, FLUSH_TOLERANCE, MIN_EDGE_POINTS, ModelParams};
pub use textline::{
    LONG_LINE_FRACTION, MIN_LINE_SPAN_FRACTION, MorphTextlineFinder, TextlineFinder,
    find_textline_centers, is_line_coverage_valid, remove_short_lines, sort_lines_by_y,
};
pub use types::{
    CurvatureThresholds, DEFAULT_CACHE_SIZE, DEFAULT_MAX_DIFF_EDGECURV, DEFAULT_MAX_DIFF_LINECURV,
    DEFAULT_MAX_EDGECURV, DEFAULT_MAX_EDGESLOPE, DEFAULT_MAX_LINECURV, DEFAULT_MAX_REF_DIST,
    DEFAULT_MIN_DIFF_LINECURV, DEFAULT_MIN_LINES, DEFAULT_SAMPLING, DEWARP_VERSION_NUMBER,
    DewarpResult, DewarpaOptions, MAX_PAGE_NUMBER, MAX_THRESHOLD, MIN_MIN_LINES, MIN_SAMPLING,
    ModelState, ModelStats, PageStatus, TextLine,
};
pub use validity::validate;

use crate::RecogResult;
use folio_core::Pix;
use log::debug;

/// Gray threshold used to binarize 8 and 32 bpp pages for line detection
const BINARIZE_THRESHOLD: u32 = 128;

/// Minimum number of lines [`needs_dewarping`] looks at
const PROBE_MIN_LINES: u32 = 6;

/// Largest vertical disparity, in pixels, treated as flat by
/// [`needs_dewarping`]
const PROBE_MAX_DISPARITY: f32 = 5.0;

/// Dewarp a single page
///
/// Builds, validates and applies the model of one page. 8 and 32 bpp
/// pages are binarized for line detection; the correction is applied to
/// the input image itself.
///
/// A page without a usable model is returned unchanged (see
/// [`DewarpResult::was_corrected`]).
///
/// # Example
///
/// ```no_run
/// use folio_recog::dewarp::{dewarp_single_page, DewarpaOptions};
/// use folio_core::{Pix, PixelDepth};
///
/// # let pix = Pix::new(800, 600, PixelDepth::Bit1).unwrap();
/// let result = dewarp_single_page(&pix, &DewarpaOptions::default()).unwrap();
/// if result.was_corrected() {
///     // use result.pix
/// }
/// ```
pub fn dewarp_single_page(pix: &Pix, options: &DewarpaOptions) -> RecogResult<DewarpResult> {
    let binary = pix.threshold_to_binary(BINARIZE_THRESHOLD)?;
    let mut dewa = Dewarpa::new(options.clone())?;
    let state = dewa.build_and_insert(&binary, 0)?;
    debug!("single page: vertical model {}", state.as_str());
    dewa.resolve_references()?;
    dewa.apply_disparity(pix, 0)
}

/// Check whether a page has noticeable line curvature
///
/// Builds a vertical model with relaxed line requirements and reports
/// whether any sampled disparity exceeds a few pixels. A page with too few
/// lines to tell is reported as not needing correction.
pub fn needs_dewarping(pix: &Pix) -> RecogResult<bool> {
    let binary = pix.threshold_to_binary(BINARIZE_THRESHOLD)?;
    let params = ModelParams {
        min_lines: PROBE_MIN_LINES,
        ..ModelParams::default()
    };
    let dew = Dewarp::build(&binary, 0, &params, &MorphTextlineFinder)?;
    let magnitude = dew.vertical().field().map_or(0.0, DisparityField::max_abs);
    debug!("curvature probe: max disparity {magnitude:.1}");
    Ok(magnitude > PROBE_MAX_DISPARITY)
}
