//! Model collections
//!
//! A [`Dewarpa`] owns the models of a multi-page document, indexed by page
//! number, together with the configuration they share. After every page
//! has been built, [`Dewarpa::resolve_references`] lets pages without a
//! usable model borrow the model of a nearby page of the same parity.
//! Rendering is refused until that has happened.
//!
//! Reference records redirect by page number. The donor is looked up when
//! a page is rendered, so rebuilding a donor is seen by all pages that
//! borrow from it. A page's own model that a reference record replaces is
//! kept aside and put back when references are stripped, so resolving
//! again (for example after a threshold change) starts from the same
//! models.

use super::apply::{Resampler, SampledResampler};
use super::cache::{CacheKey, FieldCache, FullFields};
use super::model::{Dewarp, ModelParams, check_page};
use super::textline::{MorphTextlineFinder, TextlineFinder};
use super::types::{
    CurvatureThresholds, DewarpResult, DewarpaOptions, MAX_PAGE_NUMBER, ModelState, ModelStats,
    PageStatus,
};
use super::validity::validate;
use crate::pageseg::{ColumnCounter, ProjectionColumnCounter};
use crate::{RecogError, RecogResult};
use folio_core::Pix;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collection of page models
pub struct Dewarpa {
    pub(super) options: DewarpaOptions,
    /// Indexed by page number. Stripping references leaves the length
    /// alone, so every resolve pass covers the same page range.
    pub(super) models: Vec<Option<Dewarp>>,
    /// Actual models whose slot currently holds a reference record
    displaced: BTreeMap<u32, Dewarp>,
    pub(super) models_ready: bool,
    finder: Box<dyn TextlineFinder>,
    column_counter: Box<dyn ColumnCounter>,
    resampler: Box<dyn Resampler>,
    cache: Mutex<FieldCache>,
}

impl Dewarpa {
    /// Create an empty collection
    ///
    /// Uses [`MorphTextlineFinder`], [`ProjectionColumnCounter`] and
    /// [`SampledResampler`] as collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::InvalidParameter`] for out-of-range options.
    pub fn new(options: DewarpaOptions) -> RecogResult<Self> {
        options.validate()?;
        let cache = Mutex::new(FieldCache::new(options.cache_size));
        Ok(Self {
            options,
            models: Vec::new(),
            displaced: BTreeMap::new(),
            models_ready: false,
            finder: Box::new(MorphTextlineFinder),
            column_counter: Box::new(ProjectionColumnCounter::default()),
            resampler: Box::new(SampledResampler),
            cache,
        })
    }

    /// Replace the textline finder used by [`Dewarpa::build_page`]
    pub fn set_textline_finder(&mut self, finder: Box<dyn TextlineFinder>) {
        self.finder = finder;
    }

    /// Replace the column counter used when `check_columns` is set
    pub fn set_column_counter(&mut self, counter: Box<dyn ColumnCounter>) {
        self.column_counter = counter;
    }

    /// Replace the resampler used for rendering
    pub fn set_resampler(&mut self, resampler: Box<dyn Resampler>) {
        self.resampler = resampler;
        self.lock_cache().clear();
    }

    pub fn options(&self) -> &DewarpaOptions {
        &self.options
    }

    pub fn sampling(&self) -> u32 {
        self.options.sampling
    }

    pub fn reduction_factor(&self) -> u32 {
        self.options.reduction_factor
    }

    pub fn min_lines(&self) -> u32 {
        self.options.min_lines
    }

    pub fn max_ref_dist(&self) -> u32 {
        self.options.max_ref_dist
    }

    /// Set the reference search distance; references must be resolved again.
    pub fn set_max_ref_dist(&mut self, dist: u32) -> RecogResult<()> {
        if dist > MAX_PAGE_NUMBER {
            return Err(RecogError::InvalidParameter(format!(
                "max_ref_dist {dist} > {MAX_PAGE_NUMBER}"
            )));
        }
        self.options.max_ref_dist = dist;
        self.models_ready = false;
        Ok(())
    }

    pub fn use_both(&self) -> bool {
        self.options.use_both
    }

    /// Policy only: takes effect at the next render
    pub fn set_use_both(&mut self, use_both: bool) {
        self.options.use_both = use_both;
    }

    pub fn check_columns(&self) -> bool {
        self.options.check_columns
    }

    /// Policy only: takes effect at the next render
    pub fn set_check_columns(&mut self, check: bool) {
        self.options.check_columns = check;
    }

    pub fn gray_in(&self) -> u8 {
        self.options.gray_in
    }

    pub fn set_gray_in(&mut self, gray_in: u8) {
        self.options.gray_in = gray_in;
    }

    pub fn thresholds(&self) -> CurvatureThresholds {
        self.options.thresholds
    }

    /// Replace all thresholds; references must be resolved again.
    pub fn set_thresholds(&mut self, thresholds: CurvatureThresholds) -> RecogResult<()> {
        self.update_thresholds(|t| *t = thresholds)
    }

    fn update_thresholds(&mut self, f: impl FnOnce(&mut CurvatureThresholds)) -> RecogResult<()> {
        let mut t = self.options.thresholds;
        f(&mut t);
        t.validate()?;
        self.options.thresholds = t;
        self.models_ready = false;
        Ok(())
    }

    pub fn max_linecurv(&self) -> i32 {
        self.options.thresholds.max_linecurv
    }

    pub fn set_max_linecurv(&mut self, value: i32) -> RecogResult<()> {
        self.update_thresholds(|t| t.max_linecurv = value)
    }

    pub fn min_diff_linecurv(&self) -> i32 {
        self.options.thresholds.min_diff_linecurv
    }

    pub fn set_min_diff_linecurv(&mut self, value: i32) -> RecogResult<()> {
        self.update_thresholds(|t| t.min_diff_linecurv = value)
    }

    pub fn max_diff_linecurv(&self) -> i32 {
        self.options.thresholds.max_diff_linecurv
    }

    pub fn set_max_diff_linecurv(&mut self, value: i32) -> RecogResult<()> {
        self.update_thresholds(|t| t.max_diff_linecurv = value)
    }

    pub fn max_edgecurv(&self) -> i32 {
        self.options.thresholds.max_edgecurv
    }

    pub fn set_max_edgecurv(&mut self, value: i32) -> RecogResult<()> {
        self.update_thresholds(|t| t.max_edgecurv = value)
    }

    pub fn max_diff_edgecurv(&self) -> i32 {
        self.options.thresholds.max_diff_edgecurv
    }

    pub fn set_max_diff_edgecurv(&mut self, value: i32) -> RecogResult<()> {
        self.update_thresholds(|t| t.max_diff_edgecurv = value)
    }

    pub fn max_edgeslope(&self) -> i32 {
        self.options.thresholds.max_edgeslope
    }

    pub fn set_max_edgeslope(&mut self, value: i32) -> RecogResult<()> {
        self.update_thresholds(|t| t.max_edgeslope = value)
    }

    /// Whether references have been resolved since the last change that
    /// affects them
    pub fn models_ready(&self) -> bool {
        self.models_ready
    }

    /// Highest page number of the document range
    ///
    /// Grows with [`Dewarpa::insert`] and shrinks only with
    /// [`Dewarpa::destroy_page`].
    pub fn max_page(&self) -> Option<u32> {
        self.models.len().checked_sub(1).map(|p| p as u32)
    }

    /// Record of a page, actual model or reference
    pub fn get(&self, page: u32) -> Option<&Dewarp> {
        self.models.get(page as usize).and_then(Option::as_ref)
    }

    /// The page's own model, also while a reference record stands in for it
    pub fn own_model(&self, page: u32) -> Option<&Dewarp> {
        self.displaced
            .get(&page)
            .or_else(|| self.get(page).filter(|d| !d.is_reference()))
    }

    /// Every actual model, in page order
    pub(super) fn actual_models(&self) -> Vec<&Dewarp> {
        (0..self.models.len() as u32)
            .filter_map(|page| self.own_model(page))
            .collect()
    }

    /// Mutable record of a page, e.g. to populate full-resolution fields
    pub fn get_mut(&mut self, page: u32) -> Option<&mut Dewarp> {
        self.lock_cache().invalidate_page(page);
        self.models.get_mut(page as usize).and_then(Option::as_mut)
    }

    /// Insert a model, replacing any record of the same page
    ///
    /// Pages that borrow from this page see the new model at their next
    /// render. Replacing a reference record, or inserting a model without a
    /// valid vertical field, leaves the page needing a donor, so references
    /// must be resolved again before rendering.
    ///
    /// # Errors
    ///
    /// The model must share the collection's sampling and reduction factor.
    pub fn insert(&mut self, dew: Dewarp) -> RecogResult<()> {
        let page = dew.page();
        check_page(page)?;
        if dew.sampling() != self.options.sampling
            || dew.redfactor() != self.options.reduction_factor
        {
            return Err(RecogError::ParameterMismatch(format!(
                "page {page}: model sampling {} redfactor {}, collection sampling {} redfactor {}",
                dew.sampling(),
                dew.redfactor(),
                self.options.sampling,
                self.options.reduction_factor
            )));
        }
        let idx = page as usize;
        if idx >= self.models.len() {
            self.models.resize_with(idx + 1, || None);
        }
        let replaces_ref = self.models[idx].as_ref().is_some_and(Dewarp::is_reference);
        if self.models_ready && (replaces_ref || !dew.v_valid()) {
            debug!("page {page}: inserted model needs references resolved again");
            self.models_ready = false;
        }
        self.displaced.remove(&page);
        self.lock_cache().invalidate_page(page);
        self.models[idx] = Some(dew);
        Ok(())
    }

    /// Remove the record of a page, and any own model it stands in for
    pub fn destroy_page(&mut self, page: u32) -> Option<Dewarp> {
        let removed = self.models.get_mut(page as usize).and_then(Option::take);
        self.displaced.remove(&page);
        self.trim();
        self.lock_cache().invalidate_page(page);
        removed
    }

    fn trim(&mut self) {
        while matches!(self.models.last(), Some(None)) {
            self.models.pop();
        }
    }

    /// Pages with actual models, and pages with any record, both increasing
    pub fn list_pages(&self) -> (Vec<u32>, Vec<u32>) {
        let mut actual = Vec::new();
        let mut all = Vec::new();
        for (page, dew) in self.models.iter().enumerate() {
            if let Some(dew) = dew {
                all.push(page as u32);
                if !dew.is_reference() {
                    actual.push(page as u32);
                }
            }
        }
        (actual, all)
    }

    /// Build and validate the model of one page without inserting it
    pub fn build_page(&self, pix: &Pix, page: u32) -> RecogResult<Dewarp> {
        let params = ModelParams::from(&self.options);
        let mut dew = Dewarp::build(pix, page, &params, self.finder.as_ref())?;
        validate(&mut dew, &self.options.thresholds);
        Ok(dew)
    }

    /// Build, validate and insert the model of one page
    ///
    /// Returns the state of the vertical field.
    pub fn build_and_insert(&mut self, pix: &Pix, page: u32) -> RecogResult<ModelState> {
        let dew = self.build_page(pix, page)?;
        let state = dew.v_state();
        self.insert(dew)?;
        Ok(state)
    }

    /// Build several pages in parallel and insert them
    ///
    /// Returns the number of pages with a valid vertical model. Nothing is
    /// inserted if any page fails with an error.
    pub fn build_pages(&mut self, pages: &[(u32, Pix)]) -> RecogResult<usize> {
        let built: Vec<Dewarp> = pages
            .par_iter()
            .map(|(page, pix)| self.build_page(pix, *page))
            .collect::<RecogResult<_>>()?;
        let nvalid = built.iter().filter(|d| d.v_valid()).count();
        for dew in built {
            self.insert(dew)?;
        }
        info!("built {} pages, {nvalid} with a valid model", pages.len());
        Ok(nvalid)
    }

    /// Re-check every actual model against the current thresholds
    pub fn set_valid_models(&mut self) {
        let thresholds = self.options.thresholds;
        let (mut nv, mut nh) = (0, 0);
        let own = self.models.iter_mut().flatten().filter(|d| !d.is_reference());
        for dew in own.chain(self.displaced.values_mut()) {
            let (v, h) = validate(dew, &thresholds);
            nv += usize::from(v);
            nh += usize::from(h);
        }
        debug!("valid models: {nv} vertical, {nh} horizontal");
    }

    /// Remove all reference records, putting back the own models they
    /// stood in for
    pub fn strip_references(&mut self) {
        for (page, slot) in self.models.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(Dewarp::is_reference) {
                *slot = self.displaced.remove(&(page as u32));
            }
        }
        self.models_ready = false;
    }

    fn own_valid(&self, page: u32) -> bool {
        self.get(page)
            .is_some_and(|d| !d.is_reference() && d.v_valid())
    }

    /// Nearest same-parity page within `max_ref_dist` with a valid model;
    /// the lower page wins a tie
    fn find_donor(&self, page: u32, max_page: u32) -> Option<u32> {
        (2..=self.options.max_ref_dist).step_by(2).find_map(|d| {
            let lower = page.checked_sub(d).filter(|&p| self.own_valid(p));
            let upper = Some(page + d).filter(|&p| p <= max_page && self.own_valid(p));
            lower.or(upper)
        })
    }

    /// Revalidate all models and give every page without a valid vertical
    /// model a reference to a donor, where one exists
    ///
    /// A page whose own model is not valid has its record replaced by the
    /// reference; the own model is kept aside (see [`Dewarpa::own_model`])
    /// and restored by the next pass. Running this again on an unchanged
    /// collection gives the same assignments. Afterwards the collection is
    /// ready for rendering.
    pub fn resolve_references(&mut self) -> RecogResult<()> {
        self.strip_references();
        self.set_valid_models();

        let Some(max_page) = self.max_page() else {
            self.models_ready = true;
            return Ok(());
        };
        let assigned: Vec<(u32, u32)> = (0..=max_page)
            .filter(|&p| !self.own_valid(p))
            .filter_map(|p| self.find_donor(p, max_page).map(|donor| (p, donor)))
            .collect();

        for &(page, donor) in &assigned {
            debug!("page {page}: using model of page {donor}");
            let dew = Dewarp::create_ref(
                page,
                donor,
                self.options.sampling,
                self.options.reduction_factor,
            )?;
            self.lock_cache().invalidate_page(page);
            let slot = &mut self.models[page as usize];
            if let Some(own) = slot.replace(dew) {
                self.displaced.insert(page, own);
            }
        }

        let stats = self.model_stats();
        info!(
            "references resolved: {} valid models, {} references, {} pages without a model",
            stats.v_valid, stats.references, stats.no_model
        );
        self.models_ready = true;
        Ok(())
    }

    /// Counts of model states over pages `0..=max_page`
    pub fn model_stats(&self) -> ModelStats {
        let mut stats = ModelStats::default();
        for slot in &self.models {
            match slot {
                None => stats.no_model += 1,
                Some(dew) if dew.is_reference() => stats.references += 1,
                Some(dew) => {
                    stats.v_success += u32::from(dew.v_success());
                    stats.v_valid += u32::from(dew.v_valid());
                    stats.h_success += u32::from(dew.h_success());
                    stats.h_valid += u32::from(dew.h_valid());
                }
            }
        }
        stats
    }

    /// State of one page; `None` if it has no record
    pub fn model_status(&self, page: u32) -> Option<PageStatus> {
        self.get(page).map(|dew| PageStatus {
            vertical: dew.v_state(),
            horizontal: dew.h_state(),
            slope: dew.y_success(),
            reference: dew.reference(),
        })
    }

    /// The model used to render a page, if any
    ///
    /// A page uses its own model if it is vertically valid, or its donor's
    /// if the donor still is.
    pub fn effective_model(&self, page: u32) -> Option<&Dewarp> {
        let own = self.get(page)?;
        match own.reference() {
            Some(donor) => match self.get(donor) {
                Some(d) if !d.is_reference() && d.v_valid() => Some(d),
                _ => {
                    warn!("page {page}: reference page {donor} has no valid model");
                    None
                }
            },
            None if own.v_valid() => Some(own),
            None => None,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, FieldCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached full-resolution field sets
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drop all cached full-resolution fields
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn render_fields(&self, model: &Dewarp, width: u32, height: u32) -> RecogResult<FullFields> {
        let missing = || {
            RecogError::InvalidParameter(format!("page {} has no vertical field", model.page()))
        };
        if model.has_full_res(width, height) {
            return model.full_fields(width, height)?.ok_or_else(missing);
        }
        let key = CacheKey {
            page: model.page(),
            width,
            height,
        };
        if let Some(fields) = self.lock_cache().get(&key) {
            return Ok(fields);
        }
        let fields = model.full_fields(width, height)?.ok_or_else(missing)?;
        self.lock_cache().insert(key, fields.clone());
        Ok(fields)
    }

    /// Render one page
    ///
    /// The vertical correction is always applied when the page has an
    /// effective model. The horizontal correction is added when
    /// `use_both` is set, the model's horizontal field is valid, and the
    /// page is not found to have several columns (checked only with
    /// `check_columns`). A page without an effective model is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::ModelsNotReady`] before
    /// [`Dewarpa::resolve_references`] has run.
    pub fn apply_disparity(&self, pix: &Pix, page: u32) -> RecogResult<DewarpResult> {
        if !self.models_ready {
            return Err(RecogError::ModelsNotReady);
        }
        check_page(page)?;
        let Some(model) = self.effective_model(page) else {
            debug!("page {page}: no usable model; unchanged");
            return Ok(DewarpResult::unchanged(pix));
        };

        let multi_column = self.options.check_columns && {
            let ncols = self.column_counter.count_columns(pix)?;
            debug!("page {page}: {ncols} column(s)");
            ncols > 1
        };
        let apply_h = self.options.use_both && model.h_valid() && !multi_column;

        let (w, h) = (pix.width(), pix.height());
        let fields = self.render_fields(model, w, h)?;
        let gray_in = self.options.gray_in;
        let mut out = self.resampler.apply_vertical(pix, &fields.vertical, gray_in)?;
        let mut h_applied = false;
        if apply_h {
            if let Some(hfield) = &fields.horizontal {
                out = self.resampler.apply_horizontal(&out, hfield, gray_in)?;
                h_applied = true;
            }
        }
        debug!(
            "page {page}: rendered with model of page {}, horizontal {h_applied}",
            model.page()
        );
        Ok(DewarpResult::new(out, Some(model.page()), true, h_applied))
    }

    /// Render several pages in parallel
    pub fn apply_disparity_batch(&self, pages: &[(u32, Pix)]) -> RecogResult<Vec<DewarpResult>> {
        if !self.models_ready {
            return Err(RecogError::ModelsNotReady);
        }
        pages
            .par_iter()
            .map(|(page, pix)| self.apply_disparity(pix, *page))
            .collect()
    }
}

impl fmt::Debug for Dewarpa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dewarpa")
            .field("options", &self.options)
            .field("max_page", &self.max_page())
            .field("models_ready", &self.models_ready)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Dewarpa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.options;
        let t = &o.thresholds;
        writeln!(
            f,
            "Dewarpa: sampling {}, redfactor {}, min_lines {}, max_ref_dist {}",
            o.sampling, o.reduction_factor, o.min_lines, o.max_ref_dist
        )?;
        writeln!(
            f,
            "  use_both {}, check_columns {}, gray_in {}, models_ready {}",
            o.use_both, o.check_columns, o.gray_in, self.models_ready
        )?;
        writeln!(
            f,
            "  line curvature max {} diff {}..{}, edge curvature max {} diff {}, edge slope max {}",
            t.max_linecurv,
            t.min_diff_linecurv,
            t.max_diff_linecurv,
            t.max_edgecurv,
            t.max_diff_edgecurv,
            t.max_edgeslope
        )?;
        for dew in self.models.iter().flatten() {
            writeln!(f, "  {dew}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dewarp::types::TextLine;

    /// Model for `page`: flat (valid), too curved (invalid) or too few lines
    fn model(page: u32, kind: &str) -> Dewarp {
        let (n, a) = match kind {
            "valid" => (20, 0.0),
            "invalid" => (20, 3e-4),
            _ => (3, 0.0),
        };
        let lines = (0..n)
            .map(|i| {
                let base = 100.0 + 1100.0 * i as f32 / (n - 1) as f32;
                let pts = (80..=920)
                    .step_by(8)
                    .map(|x| {
                        let dx = x as f32 - 500.0;
                        (x as f32, base + a * dx * dx)
                    })
                    .collect();
                TextLine::new(pts)
            })
            .collect();
        let mut dew =
            Dewarp::build_from_lines(1000, 1300, page, lines, &ModelParams::default()).unwrap();
        validate(&mut dew, &CurvatureThresholds::default());
        dew
    }

    fn collection(maxdist: u32) -> Dewarpa {
        Dewarpa::new(DewarpaOptions::default().with_max_ref_dist(maxdist)).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_options() {
        assert!(Dewarpa::new(DewarpaOptions::default().with_sampling(4)).is_err());
        assert!(Dewarpa::new(DewarpaOptions::default().with_reduction_factor(3)).is_err());
    }

    #[test]
    fn test_insert_and_list() {
        let mut dewa = collection(4);
        dewa.insert(model(4, "valid")).unwrap();
        dewa.insert(model(1, "none")).unwrap();
        assert_eq!(dewa.max_page(), Some(4));
        assert_eq!(dewa.list_pages(), (vec![1, 4], vec![1, 4]));
        assert!(dewa.get(2).is_none());

        assert!(dewa.destroy_page(4).is_some());
        assert_eq!(dewa.max_page(), Some(1));
        assert!(dewa.destroy_page(1).is_some());
        assert_eq!(dewa.max_page(), None);
    }

    #[test]
    fn test_insert_parameter_mismatch() {
        let mut dewa = Dewarpa::new(DewarpaOptions::default().with_sampling(20)).unwrap();
        assert!(matches!(
            dewa.insert(model(0, "valid")),
            Err(RecogError::ParameterMismatch(_))
        ));
    }

    #[test]
    fn test_parity_references() {
        let mut dewa = collection(4);
        for page in 0..10 {
            let kind = match page {
                3 => "valid",
                p if p % 3 == 0 => "invalid",
                _ => "none",
            };
            dewa.insert(model(page, kind)).unwrap();
        }
        dewa.resolve_references().unwrap();
        assert!(dewa.models_ready());

        for page in [1, 5, 7] {
            assert_eq!(dewa.get(page).unwrap().reference(), Some(3), "page {page}");
        }
        assert_eq!(dewa.get(3).unwrap().reference(), None);
        assert_eq!(dewa.get(9).unwrap().reference(), None);
        for page in [0, 2, 4, 6, 8] {
            assert_eq!(dewa.get(page).unwrap().reference(), None, "page {page}");
        }

        let stats = dewa.model_stats();
        assert_eq!(stats.references, 3);
        assert_eq!(stats.v_valid, 1);
        assert_eq!(stats.no_model, 0);
        let (actual, all) = dewa.list_pages();
        assert_eq!(actual, vec![0, 2, 3, 4, 6, 8, 9]);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_tie_prefers_lower_page() {
        let mut dewa = collection(4);
        dewa.insert(model(2, "valid")).unwrap();
        dewa.insert(model(6, "valid")).unwrap();
        dewa.resolve_references().unwrap();
        assert_eq!(dewa.get(4).unwrap().reference(), Some(2));
        assert_eq!(dewa.get(0).unwrap().reference(), Some(2));
        // 3 and 5 have no odd donor
        assert!(dewa.get(3).is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut dewa = collection(6);
        for page in [0, 5, 8, 11] {
            dewa.insert(model(page, "valid")).unwrap();
        }
        dewa.insert(model(12, "invalid")).unwrap();
        dewa.resolve_references().unwrap();
        let first: Vec<_> = (0..=12).map(|p| dewa.model_status(p)).collect();
        dewa.resolve_references().unwrap();
        let second: Vec<_> = (0..=12).map(|p| dewa.model_status(p)).collect();
        assert_eq!(first, second);
        assert_eq!(dewa.get(12).unwrap().reference(), Some(8));
    }

    #[test]
    fn test_resolving_again_keeps_own_models() {
        let mut dewa = collection(4);
        dewa.insert(model(0, "valid")).unwrap();
        dewa.insert(model(2, "invalid")).unwrap();
        for _ in 0..3 {
            dewa.resolve_references().unwrap();
            assert_eq!(dewa.max_page(), Some(2));
            assert_eq!(dewa.get(2).unwrap().reference(), Some(0));
            let own = dewa.own_model(2).unwrap();
            assert!(!own.is_reference());
            assert_eq!(own.v_state(), ModelState::Invalid);
        }
        assert!(dewa.own_model(1).is_none());
    }

    #[test]
    fn test_relaxed_thresholds_match_fresh_collection() {
        fn relax(dewa: &mut Dewarpa) {
            dewa.set_max_linecurv(1000).unwrap();
            dewa.set_max_diff_linecurv(1000).unwrap();
        }
        fn fill(dewa: &mut Dewarpa) {
            dewa.insert(model(0, "valid")).unwrap();
            dewa.insert(model(2, "invalid")).unwrap();
            dewa.insert(model(4, "none")).unwrap();
        }

        let mut dewa = collection(4);
        fill(&mut dewa);
        dewa.resolve_references().unwrap();
        assert_eq!(dewa.get(2).unwrap().reference(), Some(0));
        assert_eq!(dewa.get(4).unwrap().reference(), Some(0));

        relax(&mut dewa);
        dewa.resolve_references().unwrap();

        let mut fresh = collection(4);
        relax(&mut fresh);
        fill(&mut fresh);
        fresh.resolve_references().unwrap();

        for page in 0..=4 {
            assert_eq!(dewa.model_status(page), fresh.model_status(page), "page {page}");
        }
        assert_eq!(dewa.list_pages(), fresh.list_pages());
        assert_eq!(dewa.get(2).unwrap().reference(), None);
        assert_eq!(dewa.model_status(2).unwrap().vertical, ModelState::Valid);
        // the nearer donor is now page 2
        assert_eq!(dewa.get(4).unwrap().reference(), Some(2));
    }

    #[test]
    fn test_insert_over_reference_requires_resolution() {
        let mut dewa = collection(4);
        dewa.insert(model(0, "valid")).unwrap();
        dewa.insert(model(2, "none")).unwrap();
        dewa.resolve_references().unwrap();
        assert_eq!(dewa.get(2).unwrap().reference(), Some(0));

        // a rebuilt donor stays usable without resolving
        dewa.insert(model(0, "valid")).unwrap();
        assert!(dewa.models_ready());

        dewa.insert(model(2, "invalid")).unwrap();
        assert!(!dewa.models_ready());
        let pix = Pix::new(1000, 1300, folio_core::PixelDepth::Bit1).unwrap();
        assert!(matches!(
            dewa.apply_disparity(&pix, 2),
            Err(RecogError::ModelsNotReady)
        ));

        dewa.resolve_references().unwrap();
        assert_eq!(dewa.get(2).unwrap().reference(), Some(0));
        assert_eq!(dewa.own_model(2).unwrap().v_state(), ModelState::Invalid);
        assert_eq!(dewa.apply_disparity(&pix, 2).unwrap().model_page, Some(0));
    }

    #[test]
    fn test_render_requires_resolution() {
        let mut dewa = collection(4);
        dewa.insert(model(0, "valid")).unwrap();
        let pix = Pix::new(1000, 1300, folio_core::PixelDepth::Bit1).unwrap();
        assert!(matches!(
            dewa.apply_disparity(&pix, 0),
            Err(RecogError::ModelsNotReady)
        ));
        dewa.resolve_references().unwrap();
        assert!(dewa.apply_disparity(&pix, 0).is_ok());
        dewa.set_max_edgeslope(60).unwrap();
        assert!(!dewa.models_ready());
        assert!(dewa.apply_disparity(&pix, 0).is_err());
    }

    #[test]
    fn test_threshold_setters_reject() {
        let mut dewa = collection(4);
        assert!(dewa.set_max_linecurv(-5).is_err());
        assert!(dewa.set_min_diff_linecurv(500).is_err());
        assert_eq!(dewa.max_linecurv(), 150);
        dewa.set_max_linecurv(300).unwrap();
        assert_eq!(dewa.max_linecurv(), 300);
    }

    #[test]
    fn test_threshold_change_revalidates() {
        let mut dewa = collection(4);
        dewa.insert(model(0, "invalid")).unwrap();
        dewa.resolve_references().unwrap();
        assert_eq!(dewa.model_status(0).unwrap().vertical, ModelState::Invalid);
        dewa.set_max_linecurv(1000).unwrap();
        dewa.set_max_diff_linecurv(1000).unwrap();
        dewa.resolve_references().unwrap();
        assert_eq!(dewa.model_status(0).unwrap().vertical, ModelState::Valid);
    }

    #[test]
    fn test_donor_rebuild_seen_without_resolving() {
        let mut dewa = collection(4);
        dewa.insert(model(0, "valid")).unwrap();
        dewa.insert(model(2, "none")).unwrap();
        dewa.resolve_references().unwrap();
        assert_eq!(dewa.effective_model(2).map(Dewarp::page), Some(0));
        dewa.insert(model(0, "invalid")).unwrap();
        assert!(dewa.effective_model(2).is_none());
    }

    #[test]
    fn test_display() {
        let mut dewa = collection(4);
        dewa.insert(model(0, "valid")).unwrap();
        let text = dewa.to_string();
        assert!(text.contains("sampling 30"));
        assert!(text.contains("page 0: 20 lines"));
    }
}
