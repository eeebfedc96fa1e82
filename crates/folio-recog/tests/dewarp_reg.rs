//! Dewarp regression test
//!
//! End-to-end model building on synthetic pages, reference resolution
//! across a document, the render policy (`use_both`, `check_columns`),
//! pass-through of unmodeled pages, and model serialization.
//!
//! Collection-level tests build their models from line geometry
//! ([`Dewarp::build_from_lines`]) so that many pages stay cheap; image
//! tests use pages drawn by `folio_test::synth`.

use folio_core::{Pix, PixelDepth};
use folio_recog::dewarp::{
    CurvatureThresholds, Dewarp, Dewarpa, DewarpaOptions, ModelParams, ModelState, TextLine,
    dewarp_single_page, needs_dewarping, validate,
};
use folio_recog::{ColumnCounter, RecogError, RecogResult};
use folio_test::RegParams;
use folio_test::synth::{PageLayout, blank_page, grid_page, render_gray_page, render_page};

const W: u32 = 1000;
const H: u32 = 1300;

/// Lines `x -> base + a (x - 500)^2` whose ends drift by `skew` per pixel of y
fn lines(n: u32, a: f32, skew: f32) -> Vec<TextLine> {
    (0..n)
        .map(|i| {
            let base = 100.0 + 1100.0 * i as f32 / (n - 1) as f32;
            let drift = skew * (base - 650.0);
            let pts = (80..=920)
                .step_by(8)
                .map(|x| {
                    let dx = x as f32 - 500.0;
                    (x as f32 + drift, base + a * dx * dx)
                })
                .collect();
            TextLine::new(pts)
        })
        .collect()
}

fn model(page: u32, lines: Vec<TextLine>) -> Dewarp {
    let mut dew = Dewarp::build_from_lines(W, H, page, lines, &ModelParams::default())
        .expect("build_from_lines");
    validate(&mut dew, &CurvatureThresholds::default());
    dew
}

fn valid_model(page: u32) -> Dewarp {
    model(page, lines(20, 4e-5, 0.0))
}

fn invalid_model(page: u32) -> Dewarp {
    model(page, lines(20, 3e-4, 0.0))
}

fn empty_model(page: u32) -> Dewarp {
    model(page, lines(5, 0.0, 0.0))
}

/// Column counter reporting a fixed number of columns
struct FixedColumns(u32);

impl ColumnCounter for FixedColumns {
    fn count_columns(&self, _pix: &Pix) -> RecogResult<u32> {
        Ok(self.0)
    }
}

// ==========================================================================
// Test 1: Reference resolution over a document
// ==========================================================================

/// Only page 3 has a valid model; odd pages within 4 borrow it.
#[test]
fn dewarp_reg_parity_references() {
    let mut rp = RegParams::new("dewarp_parity");

    let options = DewarpaOptions::default().with_max_ref_dist(4);
    let mut dewa = Dewarpa::new(options).expect("new");
    for page in 0..10 {
        let dew = match page {
            3 => valid_model(page),
            0 | 6 | 9 => invalid_model(page),
            _ => empty_model(page),
        };
        dewa.insert(dew).expect("insert");
    }
    dewa.resolve_references().expect("resolve");

    for page in [1u32, 5, 7] {
        let r = dewa.get(page).and_then(Dewarp::reference);
        rp.compare_values(3.0, r.map_or(-1.0, f64::from), 0.0);
    }
    // page 9 is 6 away from page 3; even pages have no donor
    for page in [0u32, 2, 4, 6, 8, 9] {
        let r = dewa.get(page).and_then(Dewarp::reference);
        rp.compare_values(-1.0, r.map_or(-1.0, f64::from), 0.0);
    }

    // references only ever point to same-parity pages within reach
    for page in 0..10u32 {
        if let Some(r) = dewa.get(page).and_then(Dewarp::reference) {
            rp.compare_values(f64::from(page % 2), f64::from(r % 2), 0.0);
            rp.compare_values(1.0, f64::from(u8::from(page.abs_diff(r) <= 4)), 0.0);
        }
    }

    let stats = dewa.model_stats();
    rp.compare_values(3.0, stats.references as f64, 0.0);
    rp.compare_values(1.0, stats.v_valid as f64, 0.0);
    rp.compare_values(4.0, stats.v_success as f64, 0.0);

    let status = dewa.model_status(9).expect("page 9");
    rp.compare_values(1.0, f64::from(u8::from(status.vertical == ModelState::Invalid)), 0.0);

    // rendering a page that borrows reports the donor
    let pix = grid_page(W, H, 25).unwrap();
    let result = dewa.apply_disparity(&pix, 5).expect("render 5");
    rp.compare_values(3.0, f64::from(result.model_page.unwrap_or(0)), 0.0);

    assert!(rp.cleanup(), "dewarp parity tests failed");
}

/// Resolving twice gives the same assignments, and `hvalid` implies `vvalid`.
#[test]
fn dewarp_reg_resolution_invariants() {
    let mut rp = RegParams::new("dewarp_invariants");

    let mut dewa = Dewarpa::new(DewarpaOptions::default().with_max_ref_dist(6)).unwrap();
    let kinds = [0u32, 1, 2, 0, 2, 1, 0, 0, 1, 2, 0, 2, 1];
    for (page, kind) in kinds.iter().enumerate() {
        let page = page as u32;
        let dew = match kind {
            0 => valid_model(page),
            1 => invalid_model(page),
            _ => model(page, lines(20, 0.0, 0.12)),
        };
        dewa.insert(dew).unwrap();
    }

    dewa.resolve_references().unwrap();
    let first: Vec<_> = (0..13).map(|p| dewa.model_status(p)).collect();
    dewa.resolve_references().unwrap();
    let second: Vec<_> = (0..13).map(|p| dewa.model_status(p)).collect();
    rp.compare_values(1.0, f64::from(u8::from(first == second)), 0.0);

    let (actual, _) = dewa.list_pages();
    for page in actual {
        let dew = dewa.get(page).unwrap();
        if dew.h_valid() {
            rp.compare_values(1.0, f64::from(u8::from(dew.v_valid())), 0.0);
        }
    }
    // the skewed pages have valid vertical but not horizontal models
    let status = dewa.model_status(2).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(status.vertical.valid())), 0.0);
    rp.compare_values(0.0, f64::from(u8::from(status.horizontal.valid())), 0.0);

    assert!(rp.cleanup(), "dewarp invariant tests failed");
}

// ==========================================================================
// Test 2: Render policy
// ==========================================================================

fn skewed_collection() -> Dewarpa {
    let mut dewa = Dewarpa::new(DewarpaOptions::default()).unwrap();
    dewa.insert(model(0, lines(20, 4e-5, 0.02))).unwrap();
    dewa.resolve_references().unwrap();
    dewa
}

#[test]
fn dewarp_reg_render_policy() {
    let mut rp = RegParams::new("dewarp_policy");

    let pix = grid_page(W, H, 20).unwrap();
    let mut dewa = skewed_collection();
    let dew = dewa.get(0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(dew.v_valid())), 0.0);
    rp.compare_values(1.0, f64::from(u8::from(dew.h_valid())), 0.0);

    let both = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(both.v_applied)), 0.0);
    rp.compare_values(1.0, f64::from(u8::from(both.h_applied)), 0.0);

    // use_both off: vertical only
    dewa.set_use_both(false);
    let vonly = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(vonly.v_applied)), 0.0);
    rp.compare_values(0.0, f64::from(u8::from(vonly.h_applied)), 0.0);
    rp.compare_values(0.0, f64::from(u8::from(vonly.pix.equals(&both.pix))), 0.0);

    // two columns override use_both
    dewa.set_use_both(true);
    dewa.set_check_columns(true);
    dewa.set_column_counter(Box::new(FixedColumns(2)));
    let twocol = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(0.0, f64::from(u8::from(twocol.h_applied)), 0.0);
    rp.compare_pix(&vonly.pix, &twocol.pix);

    // one column: both again
    dewa.set_column_counter(Box::new(FixedColumns(1)));
    let onecol = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(onecol.h_applied)), 0.0);
    rp.compare_pix(&both.pix, &onecol.pix);

    // policy changes need no new resolution pass
    rp.compare_values(1.0, f64::from(u8::from(dewa.models_ready())), 0.0);

    assert!(rp.cleanup(), "dewarp policy tests failed");
}

#[test]
fn dewarp_reg_pass_through() {
    let mut rp = RegParams::new("dewarp_pass_through");

    let mut dewa = Dewarpa::new(DewarpaOptions::default()).unwrap();
    dewa.insert(invalid_model(0)).unwrap();
    dewa.insert(empty_model(1)).unwrap();

    let pix = grid_page(W, H, 20).unwrap();
    match dewa.apply_disparity(&pix, 0) {
        Err(RecogError::ModelsNotReady) => rp.compare_values(1.0, 1.0, 0.0),
        _ => rp.compare_values(1.0, 0.0, 0.0),
    };

    dewa.resolve_references().unwrap();
    for page in [0u32, 1, 2, 500] {
        let result = dewa.apply_disparity(&pix, page).unwrap();
        rp.compare_values(0.0, f64::from(u8::from(result.was_corrected())), 0.0);
        rp.compare_pix(&pix, &result.pix);
    }
    rp.compare_values(
        1.0,
        f64::from(u8::from(dewa.apply_disparity(&pix, 20_000).is_err())),
        0.0,
    );

    assert!(rp.cleanup(), "dewarp pass-through tests failed");
}

/// Cached, stored and freshly expanded fields render identically.
#[test]
fn dewarp_reg_field_sources() {
    let mut rp = RegParams::new("dewarp_field_sources");

    let pix = grid_page(W, H, 20).unwrap();
    let mut dewa = skewed_collection();
    let fresh = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, dewa.cache_len() as f64, 0.0);
    let cached = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_pix(&fresh.pix, &cached.pix);

    dewa.get_mut(0).unwrap().populate_full_res(W, H).unwrap();
    rp.compare_values(0.0, dewa.cache_len() as f64, 0.0);
    let stored = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_pix(&fresh.pix, &stored.pix);
    rp.compare_values(0.0, dewa.cache_len() as f64, 0.0);

    // a rendered page smaller than the model is still covered
    let small = grid_page(W / 2, H / 2, 20).unwrap();
    let result = dewa.apply_disparity(&small, 0).unwrap();
    rp.compare_values(f64::from(W / 2), f64::from(result.pix.width()), 0.0);

    let batch: Vec<(u32, Pix)> = (0..3).map(|_| (0, pix.clone())).collect();
    let results = dewa.apply_disparity_batch(&batch).unwrap();
    for r in &results {
        rp.compare_pix(&fresh.pix, &r.pix);
    }

    assert!(rp.cleanup(), "dewarp field source tests failed");
}

// ==========================================================================
// Test 3: Full resolution expansion
// ==========================================================================

#[test]
fn dewarp_reg_expansion() {
    let mut rp = RegParams::new("dewarp_expansion");

    let dew = valid_model(0);
    let field = dew.vertical().field().expect("vertical field");
    let sampled = field.sampled();
    let full = field.expand(W, H).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(full.width() >= W)), 0.0);
    rp.compare_values(1.0, f64::from(u8::from(full.height() >= H)), 0.0);

    let s = field.sampling();
    let (nx, ny) = field.sample_dimensions();
    let mut max_err = 0f32;
    for j in 0..ny {
        for i in 0..nx {
            let a = sampled.get_pixel(i, j).unwrap();
            let b = full.get_pixel(i * s, j * s).unwrap();
            max_err = max_err.max((a - b).abs());
        }
    }
    rp.compare_values(0.0, f64::from(max_err), 0.0);

    assert!(rp.cleanup(), "dewarp expansion tests failed");
}

// ==========================================================================
// Test 4: Models from page images
// ==========================================================================

fn small_layout() -> PageLayout {
    PageLayout::flat().with_size(600, 800).with_lines(16)
}

#[test]
fn dewarp_reg_flat_page() {
    let mut rp = RegParams::new("dewarp_flat_page");

    let pix = render_page(&small_layout()).unwrap();
    let mut dewa = Dewarpa::new(DewarpaOptions::default()).unwrap();
    let state = dewa.build_and_insert(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(state == ModelState::Valid)), 0.0);

    let dew = dewa.get(0).unwrap();
    rp.compare_values(16.0, f64::from(dew.nlines()), 0.0);
    let (cmin, cmax) = dew.curvature_range();
    rp.compare_values(0.0, f64::from(cmin), 1.0);
    rp.compare_values(0.0, f64::from(cmax), 1.0);
    rp.compare_values(0.0, f64::from(u8::from(dew.y_success())), 0.0);

    dewa.resolve_references().unwrap();
    let result = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(result.v_applied)), 0.0);
    rp.compare_pix(&pix, &result.pix);

    rp.compare_values(0.0, f64::from(u8::from(needs_dewarping(&pix).unwrap())), 0.0);

    assert!(rp.cleanup(), "dewarp flat page tests failed");
}

#[test]
fn dewarp_reg_curved_page() {
    let mut rp = RegParams::new("dewarp_curved_page");

    let layout = PageLayout {
        sag: 6.0,
        sag_growth: 1.0,
        ..small_layout()
    };
    let pix = render_page(&layout).unwrap();
    let options = DewarpaOptions::default();
    let mut dewa = Dewarpa::new(options.clone()).unwrap();
    dewa.build_and_insert(&pix, 0).unwrap();
    let dew = dewa.get(0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(dew.v_valid())), 0.0);
    // a = sag / 300^2: about 67 micro for the first line, 133 for the last
    let (cmin, cmax) = dew.curvature_range();
    rp.compare_values(67.0, f64::from(cmin), 6.0);
    rp.compare_values(133.0, f64::from(cmax), 6.0);
    rp.compare_values(1.0, f64::from(u8::from(needs_dewarping(&pix).unwrap())), 0.0);

    dewa.resolve_references().unwrap();
    let result = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(result.was_corrected())), 0.0);

    // the corrected page has nearly straight lines
    let after = dewa.build_page(&result.pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(after.v_success())), 0.0);
    let (amin, amax) = after.curvature_range();
    rp.compare_values(0.0, f64::from(amin.abs().max(amax.abs())), 15.0);

    // the same correction applies to the gray rendition of the page
    let gray = render_gray_page(&layout).unwrap();
    let single = dewarp_single_page(&gray, &options).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(single.was_corrected())), 0.0);
    let binary = single.pix.threshold_to_binary(128).unwrap();
    rp.compare_pix(&result.pix, &binary);

    assert!(rp.cleanup(), "dewarp curved page tests failed");
}

/// Model built at half resolution, rendered on the full-size page
#[test]
fn dewarp_reg_reduced_model() {
    let mut rp = RegParams::new("dewarp_reduced_model");

    let layout = PageLayout::curved(6.0).with_size(1200, 1600);
    let pix = render_page(&layout).unwrap();
    let options = DewarpaOptions::default().with_reduction_factor(2);
    let mut dewa = Dewarpa::new(options).unwrap();
    dewa.build_and_insert(&pix, 0).unwrap();

    let dew = dewa.get(0).unwrap();
    rp.compare_values(2.0, f64::from(dew.redfactor()), 0.0);
    rp.compare_values(600.0, f64::from(dew.width()), 0.0);
    rp.compare_values(1.0, f64::from(u8::from(dew.v_valid())), 0.0);
    // at half size a = (sag / 2) / 300^2: about 33 micro for the first line, 67 for the last
    let (cmin, cmax) = dew.curvature_range();
    rp.compare_values(33.0, f64::from(cmin), 6.0);
    rp.compare_values(67.0, f64::from(cmax), 6.0);

    dewa.resolve_references().unwrap();
    let result = dewa.apply_disparity(&pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(result.was_corrected())), 0.0);
    rp.compare_values(1200.0, f64::from(result.pix.width()), 0.0);
    rp.compare_values(1600.0, f64::from(result.pix.height()), 0.0);

    let after = dewa.build_page(&result.pix, 0).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(after.v_success())), 0.0);
    let (amin, amax) = after.curvature_range();
    rp.compare_values(0.0, f64::from(amin.abs().max(amax.abs())), 10.0);

    assert!(rp.cleanup(), "dewarp reduced model tests failed");
}

#[test]
fn dewarp_reg_batch_build() {
    let mut rp = RegParams::new("dewarp_batch_build");

    let layout = small_layout();
    let pages: Vec<(u32, Pix)> = vec![
        (0, render_page(&layout).unwrap()),
        (1, blank_page(600, 800).unwrap()),
        (2, render_page(&layout.clone().with_lines(8)).unwrap()),
    ];
    let mut dewa = Dewarpa::new(DewarpaOptions::default()).unwrap();
    let nvalid = dewa.build_pages(&pages).unwrap();
    rp.compare_values(1.0, nvalid as f64, 0.0);

    // too few lines: a model without fields, not an error
    for page in [1u32, 2] {
        let status = dewa.model_status(page).unwrap();
        rp.compare_values(1.0, f64::from(u8::from(status.vertical == ModelState::Absent)), 0.0);
        rp.compare_values(1.0, f64::from(u8::from(status.horizontal == ModelState::Absent)), 0.0);
        rp.compare_values(0.0, f64::from(u8::from(status.slope)), 0.0);
    }

    dewa.resolve_references().unwrap();
    rp.compare_values(
        0.0,
        dewa.get(2).and_then(Dewarp::reference).map_or(-1.0, f64::from),
        0.0,
    );

    // wrong depth is an input error
    let gray = Pix::new(600, 800, PixelDepth::Bit8).unwrap();
    rp.compare_values(1.0, f64::from(u8::from(dewa.build_page(&gray, 3).is_err())), 0.0);

    assert!(rp.cleanup(), "dewarp batch build tests failed");
}

// ==========================================================================
// Test 5: Serialization
// ==========================================================================

#[test]
fn dewarp_reg_serialization() {
    let mut rp = RegParams::new("dewarp_serial");

    let mut dewa = skewed_collection();
    dewa.insert(valid_model(2)).unwrap();
    dewa.resolve_references().unwrap();
    let bytes = dewa.write_to_bytes().unwrap();

    let mut back = Dewarpa::read_from_bytes(&bytes).unwrap();
    rp.compare_values(0.0, f64::from(u8::from(back.models_ready())), 0.0);
    rp.compare_strings(&bytes, &back.write_to_bytes().unwrap());

    back.resolve_references().unwrap();
    let pix = grid_page(W, H, 20).unwrap();
    let a = dewa.apply_disparity(&pix, 0).unwrap();
    let b = back.apply_disparity(&pix, 0).unwrap();
    rp.compare_pix(&a.pix, &b.pix);

    let text = String::from_utf8_lossy(&bytes).replacen("Version 4", "Version 5", 1);
    let mismatch = matches!(
        Dewarpa::read_from_bytes(text.as_bytes()),
        Err(RecogError::VersionMismatch { expected: 4, actual: 5 })
    );
    rp.compare_values(1.0, f64::from(u8::from(mismatch)), 0.0);

    assert!(rp.cleanup(), "dewarp serialization tests failed");
}
