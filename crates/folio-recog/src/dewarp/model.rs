//! Page models
//!
//! A [`Dewarp`] holds everything known about one page: the sampled
//! disparity fields, the line statistics they were derived from, and the
//! validity of each field. A page that borrows another page's model holds
//! only a reference (the donor's page number) and no fields of its own.
//!
//! # Building
//!
//! 1. Find text line centers and keep the long ones.
//! 2. Fit `y = a x^2 + b x + c` to each line. The line's reference is the
//!    lowest point of its fit within its own extent; its disparity at a
//!    sample column is `yfit - yref`.
//! 3. Per sample column, fit the disparity against the reference y of
//!    every line and evaluate that fit at the sample rows. This gives the
//!    vertical field.
//! 4. Fit `x = a y^2 + b y + c` to the left and right line ends (with
//!    outlier rejection). Each edge is aligned to its leftmost (even page)
//!    or rightmost (odd page) position, and the shift is interpolated
//!    linearly across the page. This gives the horizontal field.
//! 5. If the line ends are not flush with the edge fits, a slope field
//!    corrects the horizontal foreshortening implied by the vertical field.

use super::cache::FullFields;
use super::field::{DisparityField, DisparityKind, sample_count};
use super::textline::{
    LONG_LINE_FRACTION, TextlineFinder, is_line_coverage_valid, remove_short_lines,
    sort_lines_by_y,
};
use super::types::{
    DewarpaOptions, MAX_PAGE_NUMBER, MIN_MIN_LINES, MIN_SAMPLING, ModelState, TextLine,
};
use crate::{RecogError, RecogResult};
use folio_core::{FPix, Pix, PixelDepth, Pta, QuadraticFit};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// RMS distance (pixels) of line ends from an edge fit below which the
/// ends count as flush
pub const FLUSH_TOLERANCE: f32 = 1.0;

/// Minimum number of line ends for an edge fit
pub const MIN_EDGE_POINTS: usize = 4;

const EDGE_OUTLIER_FACTOR: f32 = 3.0;
const EDGE_MIN_ERROR: f32 = 2.0;

/// Per-collection constants a model is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelParams {
    pub sampling: u32,
    pub redfactor: u32,
    pub min_lines: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::from(&DewarpaOptions::default())
    }
}

impl From<&DewarpaOptions> for ModelParams {
    fn from(options: &DewarpaOptions) -> Self {
        Self {
            sampling: options.sampling,
            redfactor: options.reduction_factor,
            min_lines: options.min_lines,
        }
    }
}

impl ModelParams {
    pub(super) fn validate(&self) -> RecogResult<()> {
        if self.sampling < MIN_SAMPLING {
            return Err(RecogError::InvalidParameter(format!(
                "sampling {} < {MIN_SAMPLING}",
                self.sampling
            )));
        }
        if self.redfactor != 1 && self.redfactor != 2 {
            return Err(RecogError::InvalidParameter(format!(
                "reduction factor {} not 1 or 2",
                self.redfactor
            )));
        }
        if self.min_lines < MIN_MIN_LINES {
            return Err(RecogError::InvalidParameter(format!(
                "min_lines {} < {MIN_MIN_LINES}",
                self.min_lines
            )));
        }
        Ok(())
    }
}

/// One disparity array together with its build and validity state
///
/// A field can only be valid or invalid if it was built.
#[derive(Debug, Clone, Default)]
pub enum DisparityModel {
    #[default]
    Absent,
    Built(DisparityField),
    Invalid(DisparityField),
    Valid(DisparityField),
}

impl DisparityModel {
    pub fn state(&self) -> ModelState {
        match self {
            DisparityModel::Absent => ModelState::Absent,
            DisparityModel::Built(_) => ModelState::Built,
            DisparityModel::Invalid(_) => ModelState::Invalid,
            DisparityModel::Valid(_) => ModelState::Valid,
        }
    }

    /// The field, whatever its validity
    pub fn field(&self) -> Option<&DisparityField> {
        match self {
            DisparityModel::Absent => None,
            DisparityModel::Built(f) | DisparityModel::Invalid(f) | DisparityModel::Valid(f) => {
                Some(f)
            }
        }
    }

    fn field_mut(&mut self) -> Option<&mut DisparityField> {
        match self {
            DisparityModel::Absent => None,
            DisparityModel::Built(f) | DisparityModel::Invalid(f) | DisparityModel::Valid(f) => {
                Some(f)
            }
        }
    }

    /// Mark a built field valid or invalid; an absent field stays absent.
    pub(crate) fn set_valid(&mut self, valid: bool) {
        *self = match std::mem::take(self) {
            DisparityModel::Absent => DisparityModel::Absent,
            DisparityModel::Built(f) | DisparityModel::Invalid(f) | DisparityModel::Valid(f) => {
                if valid {
                    DisparityModel::Valid(f)
                } else {
                    DisparityModel::Invalid(f)
                }
            }
        };
    }
}

/// Model of one page
#[derive(Debug, Clone)]
pub struct Dewarp {
    pub(super) page: u32,
    /// Size of the (possibly reduced) image the model was built from
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) sampling: u32,
    pub(super) redfactor: u32,
    pub(super) min_lines: u32,
    /// Number of long lines used
    pub(super) nlines: u32,
    pub(super) vertical: DisparityModel,
    pub(super) horizontal: DisparityModel,
    pub(super) slope: Option<DisparityField>,
    /// Sorted mid-line y values
    pub(super) line_ys: Vec<f32>,
    /// Sorted line curvatures, micro-units
    pub(super) line_curvatures: Vec<i32>,
    pub(super) min_curv: i32,
    pub(super) max_curv: i32,
    /// Edge slopes, milli-units
    pub(super) left_slope: i32,
    pub(super) right_slope: i32,
    /// Edge curvatures, micro-units
    pub(super) left_curv: i32,
    pub(super) right_curv: i32,
    pub(super) reference: Option<u32>,
    pub(super) debug: bool,
}

/// Quadratic fit of one text line
struct LineFit {
    fit: QuadraticFit,
    x0: f32,
    x1: f32,
    left: (f32, f32),
    right: (f32, f32),
    mid_y: f32,
}

impl LineFit {
    fn new(line: &TextLine) -> Option<Self> {
        let (x0, x1) = line.x_range()?;
        let (left, right) = line.endpoints()?;
        let fit = line.to_pta().get_quadratic_lsf().ok()?;
        Some(Self {
            fit,
            x0,
            x1,
            left,
            right,
            mid_y: line.mid_y()?,
        })
    }

    /// Largest fitted y within the line's own extent
    fn lowest_point(&self) -> f32 {
        let f = &self.fit;
        let mut y = f.eval(self.x0).max(f.eval(self.x1));
        if f.a != 0.0 {
            let xv = -f.b / (2.0 * f.a);
            if xv > self.x0 && xv < self.x1 {
                y = y.max(f.eval(xv));
            }
        }
        y
    }
}

/// Noisy quadratic fit of one page edge, `x = f(y)`
struct EdgeFit {
    fit: QuadraticFit,
    curvature: i32,
    slope: i32,
    rms: f32,
}

impl EdgeFit {
    /// Fit `(y, x)` line ends; `None` if there are too few or they are degenerate.
    fn new(ends: &Pta) -> Option<Self> {
        if ends.len() < MIN_EDGE_POINTS {
            return None;
        }
        let noisy = ends
            .get_noisy_quadratic_lsf(EDGE_OUTLIER_FACTOR, EDGE_MIN_ERROR)
            .ok()?;
        let (m, _) = noisy.inliers.get_linear_lsf().ok()?;
        let n = noisy.inliers.len() as f32;
        let sq: f32 = noisy
            .inliers
            .iter()
            .map(|(y, x)| (x - noisy.fit.eval(y)).powi(2))
            .sum();
        Some(Self {
            fit: noisy.fit,
            curvature: micro(noisy.fit.a),
            slope: (1000.0 * f64::from(m)).round() as i32,
            rms: (sq / n).sqrt(),
        })
    }
}

fn micro(a: f32) -> i32 {
    (1e6 * f64::from(a)).round() as i32
}

/// Reject page numbers above [`MAX_PAGE_NUMBER`]
pub(super) fn check_page(page: u32) -> RecogResult<()> {
    if page > MAX_PAGE_NUMBER {
        return Err(RecogError::InvalidPageNumber {
            page,
            max: MAX_PAGE_NUMBER,
        });
    }
    Ok(())
}

impl Dewarp {
    pub(super) fn empty(page: u32, width: u32, height: u32, params: &ModelParams) -> Self {
        Self {
            page,
            width,
            height,
            sampling: params.sampling,
            redfactor: params.redfactor,
            min_lines: params.min_lines,
            nlines: 0,
            vertical: DisparityModel::Absent,
            horizontal: DisparityModel::Absent,
            slope: None,
            line_ys: Vec::new(),
            line_curvatures: Vec::new(),
            min_curv: 0,
            max_curv: 0,
            left_slope: 0,
            right_slope: 0,
            left_curv: 0,
            right_curv: 0,
            reference: None,
            debug: false,
        }
    }

    /// Build the model of one page
    ///
    /// `pix` is the full-resolution page; with `redfactor == 2` it is
    /// reduced before lines are detected. A page without enough usable
    /// lines yields a model whose fields are all absent; that is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Fails for a non-binary image, an out-of-range page number or
    /// invalid parameters.
    pub fn build(
        pix: &Pix,
        page: u32,
        params: &ModelParams,
        finder: &dyn TextlineFinder,
    ) -> RecogResult<Self> {
        check_page(page)?;
        params.validate()?;
        if pix.depth() != PixelDepth::Bit1 {
            return Err(RecogError::UnsupportedDepth {
                expected: "1 bpp",
                actual: pix.depth().bits(),
            });
        }
        let pix = if params.redfactor == 2 {
            pix.reduce_binary_2x()?
        } else {
            pix.clone()
        };
        let lines = finder.find_lines(&pix)?;
        Self::build_from_lines(pix.width(), pix.height(), page, lines, params)
    }

    /// Build a model from already detected lines
    ///
    /// `width` and `height` are the size of the image the lines were found in.
    pub fn build_from_lines(
        width: u32,
        height: u32,
        page: u32,
        lines: Vec<TextLine>,
        params: &ModelParams,
    ) -> RecogResult<Self> {
        check_page(page)?;
        params.validate()?;
        if width == 0 || height == 0 {
            return Err(RecogError::InvalidParameter(format!(
                "page size {width}x{height}"
            )));
        }
        let mut dew = Self::empty(page, width, height, params);

        let mut lines: Vec<TextLine> = remove_short_lines(lines, LONG_LINE_FRACTION)
            .into_iter()
            .filter(|l| l.len() >= 3)
            .collect();
        sort_lines_by_y(&mut lines);
        let fits: Vec<LineFit> = lines.iter().filter_map(LineFit::new).collect();
        dew.nlines = fits.len() as u32;

        if fits.len() < params.min_lines as usize
            || !is_line_coverage_valid(&lines, height, params.min_lines)
        {
            debug!(
                "page {page}: {} long lines, need {} covering the page; no model",
                fits.len(),
                params.min_lines
            );
            return Ok(dew);
        }

        dew.line_ys = fits.iter().map(|f| f.mid_y).collect();
        dew.line_ys.sort_by(f32::total_cmp);
        dew.line_curvatures = fits.iter().map(|f| micro(f.fit.a)).collect();
        dew.line_curvatures.sort_unstable();
        dew.min_curv = dew.line_curvatures.first().copied().unwrap_or(0);
        dew.max_curv = dew.line_curvatures.last().copied().unwrap_or(0);

        let Some(vfield) = dew.vertical_field(&fits)? else {
            debug!("page {page}: degenerate line set; no vertical model");
            return Ok(dew);
        };
        debug!(
            "page {page}: vertical model from {} lines, curvature {}..{}",
            fits.len(),
            dew.min_curv,
            dew.max_curv
        );

        let left: Pta = fits.iter().map(|f| (f.left.1, f.left.0)).collect();
        let right: Pta = fits.iter().map(|f| (f.right.1, f.right.0)).collect();
        let ytop = dew.line_ys.first().copied().unwrap_or(0.0);
        let ybot = dew.line_ys.last().copied().unwrap_or(0.0);

        match (EdgeFit::new(&left), EdgeFit::new(&right)) {
            (Some(l), Some(r)) => {
                dew.left_slope = l.slope;
                dew.right_slope = r.slope;
                dew.left_curv = l.curvature;
                dew.right_curv = r.curvature;
                if let Some(hfield) = dew.horizontal_field(&l, &r, ytop, ybot)? {
                    debug!(
                        "page {page}: horizontal model, slopes {}/{}, edge curvatures {}/{}",
                        l.slope, r.slope, l.curvature, r.curvature
                    );
                    dew.horizontal = DisparityModel::Built(dew.field(DisparityKind::Horizontal, hfield));
                    if l.rms > FLUSH_TOLERANCE || r.rms > FLUSH_TOLERANCE {
                        let sfield = dew.slope_field(&vfield)?;
                        debug!(
                            "page {page}: line ends not flush (rms {:.2}/{:.2}); slope model",
                            l.rms, r.rms
                        );
                        dew.slope = Some(dew.field(DisparityKind::Slope, sfield));
                    }
                }
            }
            _ => debug!("page {page}: too few usable line ends; no horizontal model"),
        }

        dew.vertical = DisparityModel::Built(dew.field(DisparityKind::Vertical, vfield));
        Ok(dew)
    }

    /// Record for a page that uses the model of `refpage`
    ///
    /// The record holds no fields; it only redirects.
    pub fn create_ref(page: u32, refpage: u32, sampling: u32, redfactor: u32) -> RecogResult<Self> {
        check_page(page)?;
        check_page(refpage)?;
        let params = ModelParams {
            sampling,
            redfactor,
            min_lines: MIN_MIN_LINES,
        };
        let mut dew = Self::empty(page, 0, 0, &params);
        dew.reference = Some(refpage);
        Ok(dew)
    }

    fn field(&self, kind: DisparityKind, sampled: FPix) -> DisparityField {
        DisparityField::new(kind, self.sampling, self.redfactor, sampled)
    }

    /// Size of every sampled field of this model
    pub(super) fn sample_grid(&self) -> (u32, u32) {
        (
            sample_count(self.width, self.sampling),
            sample_count(self.height, self.sampling),
        )
    }

    fn vertical_field(&self, fits: &[LineFit]) -> RecogResult<Option<FPix>> {
        let (nx, ny) = self.sample_grid();
        let s = self.sampling;
        let yrefs: Vec<f32> = fits.iter().map(LineFit::lowest_point).collect();
        let mut field = FPix::new(nx, ny)?;
        for j in 0..nx {
            let x = (j * s) as f32;
            let pts: Pta = fits
                .iter()
                .zip(&yrefs)
                .map(|(f, &yref)| (yref, f.fit.eval(x) - yref))
                .collect();
            let column = match pts.get_quadratic_lsf() {
                Ok(c) => c,
                Err(e) => {
                    debug!("page {}: column {j} fit failed: {e}", self.page);
                    return Ok(None);
                }
            };
            for i in 0..ny {
                field.set_pixel_unchecked(j, i, column.eval((i * s) as f32));
            }
        }
        Ok(Some(field))
    }

    fn horizontal_field(
        &self,
        left: &EdgeFit,
        right: &EdgeFit,
        ytop: f32,
        ybot: f32,
    ) -> RecogResult<Option<FPix>> {
        let (nx, ny) = self.sample_grid();
        let s = self.sampling;
        let edges: Vec<(f32, f32)> = (0..ny)
            .map(|i| {
                let y = ((i * s) as f32).clamp(ytop, ybot);
                (left.fit.eval(y), right.fit.eval(y))
            })
            .collect();

        let even = self.page % 2 == 0;
        let pick = |a: f32, b: f32| if even { a.min(b) } else { a.max(b) };
        let (Some(refl), Some(refr)) = (
            edges.iter().map(|e| e.0).reduce(pick),
            edges.iter().map(|e| e.1).reduce(pick),
        ) else {
            return Ok(None);
        };
        if refr - refl < 1.0 {
            debug!(
                "page {}: edges cross (left {refl}, right {refr}); no horizontal model",
                self.page
            );
            return Ok(None);
        }

        let mut field = FPix::new(nx, ny)?;
        for (i, &(xl, xr)) in edges.iter().enumerate() {
            let (hl, hr) = (xl - refl, xr - refr);
            for j in 0..nx {
                let t = ((j * s) as f32 - refl) / (refr - refl);
                field.set_pixel_unchecked(j, i as u32, hl + t * (hr - hl));
            }
        }
        Ok(Some(field))
    }

    /// Horizontal shift that unrolls each row along the surface described
    /// by the vertical field, anchored at its flattest column
    fn slope_field(&self, vertical: &FPix) -> RecogResult<FPix> {
        let (nx, ny) = vertical.dimensions();
        let mut field = FPix::new(nx, ny)?;
        if nx < 2 {
            return Ok(field);
        }
        let s = self.sampling as f32;
        let v = |j: u32, i: u32| vertical.get_pixel_unchecked(j, i);

        let roughness = |j: u32| -> f32 {
            let (jp, jn) = (j.saturating_sub(1), (j + 1).min(nx - 1));
            (0..ny).map(|i| (v(jn, i) - v(jp, i)).abs()).sum()
        };
        let mut j0 = 0;
        let mut best = f32::MAX;
        for j in 0..nx {
            let r = roughness(j);
            if r < best {
                best = r;
                j0 = j;
            }
        }

        let mut unrolled = vec![0.0f32; nx as usize];
        for i in 0..ny {
            unrolled[j0 as usize] = j0 as f32 * s;
            for j in j0 + 1..nx {
                let step = s.hypot(v(j, i) - v(j - 1, i));
                unrolled[j as usize] = unrolled[j as usize - 1] + step;
            }
            for j in (0..j0).rev() {
                let step = s.hypot(v(j + 1, i) - v(j, i));
                unrolled[j as usize] = unrolled[j as usize + 1] - step;
            }
            for k in 0..nx {
                let xk = k as f32 * s;
                let seg = unrolled[1..]
                    .iter()
                    .position(|&p| p >= xk)
                    .unwrap_or(nx as usize - 2);
                let (p0, p1) = (unrolled[seg], unrolled[seg + 1]);
                let src = seg as f32 * s + (xk - p0) * s / (p1 - p0);
                field.set_pixel_unchecked(k, i, src - xk);
            }
        }
        Ok(field)
    }

    /// Page number
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Width of the image the model was built from (reduced if `redfactor == 2`)
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the image the model was built from
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sampling(&self) -> u32 {
        self.sampling
    }

    pub fn redfactor(&self) -> u32 {
        self.redfactor
    }

    pub fn min_lines(&self) -> u32 {
        self.min_lines
    }

    /// Number of long lines the model was built from
    pub fn nlines(&self) -> u32 {
        self.nlines
    }

    pub fn vertical(&self) -> &DisparityModel {
        &self.vertical
    }

    pub fn horizontal(&self) -> &DisparityModel {
        &self.horizontal
    }

    /// The slope field, if the line ends were not flush
    pub fn slope(&self) -> Option<&DisparityField> {
        self.slope.as_ref()
    }

    pub fn v_state(&self) -> ModelState {
        self.vertical.state()
    }

    pub fn h_state(&self) -> ModelState {
        self.horizontal.state()
    }

    pub fn v_success(&self) -> bool {
        self.v_state().success()
    }

    pub fn h_success(&self) -> bool {
        self.h_state().success()
    }

    pub fn y_success(&self) -> bool {
        self.slope.is_some()
    }

    pub fn v_valid(&self) -> bool {
        self.v_state().valid()
    }

    pub fn h_valid(&self) -> bool {
        self.h_state().valid()
    }

    /// Sorted mid-line y values of the lines used
    pub fn line_ys(&self) -> &[f32] {
        &self.line_ys
    }

    /// Sorted line curvatures in micro-units
    pub fn line_curvatures(&self) -> &[i32] {
        &self.line_curvatures
    }

    /// `(min, max)` line curvature in micro-units
    pub fn curvature_range(&self) -> (i32, i32) {
        (self.min_curv, self.max_curv)
    }

    /// `(left, right)` edge slopes in milli-units
    pub fn edge_slopes(&self) -> (i32, i32) {
        (self.left_slope, self.right_slope)
    }

    /// `(left, right)` edge curvatures in micro-units
    pub fn edge_curvatures(&self) -> (i32, i32) {
        (self.left_curv, self.right_curv)
    }

    /// Donor page, for a reference record
    pub fn reference(&self) -> Option<u32> {
        self.reference
    }

    /// `true` for a record that only redirects to another page
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub(crate) fn set_validity(&mut self, v_valid: bool, h_valid: bool) {
        self.vertical.set_valid(v_valid);
        self.horizontal.set_valid(h_valid);
    }

    /// Expand and store the fields at full resolution for a `width x height` page
    pub fn populate_full_res(&mut self, width: u32, height: u32) -> RecogResult<()> {
        for field in [self.vertical.field_mut(), self.horizontal.field_mut(), self.slope.as_mut()]
            .into_iter()
            .flatten()
        {
            field.populate(width, height)?;
        }
        Ok(())
    }

    /// Drop stored full-resolution fields
    pub fn minimize(&mut self) {
        for field in [self.vertical.field_mut(), self.horizontal.field_mut(), self.slope.as_mut()]
            .into_iter()
            .flatten()
        {
            field.clear_full();
        }
    }

    /// Whether stored full-resolution fields cover a `width x height` page
    pub fn has_full_res(&self, width: u32, height: u32) -> bool {
        let covers = |f: &DisparityField| f.full_covering(width, height).is_some();
        self.vertical.field().is_some_and(covers)
            && self.horizontal.field().is_none_or(covers)
            && self.slope.as_ref().is_none_or(covers)
    }

    /// Full-resolution fields for rendering a `width x height` page
    ///
    /// Uses stored fields where they cover the page and expands the rest.
    /// The horizontal field includes the slope field. `None` without a
    /// vertical field.
    pub(crate) fn full_fields(&self, width: u32, height: u32) -> RecogResult<Option<FullFields>> {
        let Some(vfield) = self.vertical.field() else {
            return Ok(None);
        };
        let vertical = expanded(vfield, width, height)?;
        let horizontal = match self.horizontal.field() {
            None => None,
            Some(hfield) => {
                let hfull = expanded(hfield, width, height)?;
                Some(match &self.slope {
                    None => hfull,
                    Some(sfield) => {
                        let sfull = expanded(sfield, width, height)?;
                        if hfull.dimensions() == sfull.dimensions() {
                            Arc::new(hfull.add(&sfull)?)
                        } else {
                            let h = hfield.expand(width, height)?;
                            Arc::new(h.add(&sfield.expand(width, height)?)?)
                        }
                    }
                })
            }
        };
        Ok(Some(FullFields {
            vertical,
            horizontal,
        }))
    }
}

fn expanded(field: &DisparityField, width: u32, height: u32) -> RecogResult<Arc<FPix>> {
    match field.full_covering(width, height) {
        Some(full) => Ok(full),
        None => Ok(Arc::new(field.expand(width, height)?)),
    }
}

impl fmt::Display for Dewarp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(r) = self.reference {
            return write!(f, "page {}: reference to page {r}", self.page);
        }
        write!(
            f,
            "page {}: {} lines, vertical {}, horizontal {}, slope {}, \
             curvature {}..{}, edge slopes {}/{}, edge curvatures {}/{}",
            self.page,
            self.nlines,
            self.v_state().as_str(),
            self.h_state().as_str(),
            if self.y_success() { "yes" } else { "no" },
            self.min_curv,
            self.max_curv,
            self.left_slope,
            self.right_slope,
            self.left_curv,
            self.right_curv
        )
    }
}
