//! Model validity
//!
//! A vertical field is usable when every line curvature is small enough
//! and the spread between the most and least curved lines is within
//! bounds. A horizontal field is usable only on top of a usable vertical
//! field, and when both edges are nearly straight, similar to each other
//! and not too slanted.

use super::model::Dewarp;
use super::types::CurvatureThresholds;
use log::debug;

/// Check a model against the thresholds and mark its fields
///
/// Returns `(v_valid, h_valid)`. Re-running with the same thresholds gives
/// the same result. Reference records have no fields and stay unusable.
pub fn validate(dew: &mut Dewarp, thresholds: &CurvatureThresholds) -> (bool, bool) {
    let t = thresholds;

    let (min_curv, max_curv) = dew.curvature_range();
    let max_abs_curv = min_curv.abs().max(max_curv.abs());
    let diff_curv = max_curv - min_curv;
    let v_valid = dew.v_success()
        && max_abs_curv <= t.max_linecurv
        && diff_curv >= t.min_diff_linecurv
        && diff_curv <= t.max_diff_linecurv;

    let (left_curv, right_curv) = dew.edge_curvatures();
    let (left_slope, right_slope) = dew.edge_slopes();
    let h_valid = v_valid
        && dew.h_success()
        && left_curv.abs() <= t.max_edgecurv
        && right_curv.abs() <= t.max_edgecurv
        && (left_curv - right_curv).abs() <= t.max_diff_edgecurv
        && left_slope.abs() <= t.max_edgeslope
        && right_slope.abs() <= t.max_edgeslope;

    if dew.v_success() {
        debug!(
            "page {}: curvature {}..{} -> vertical {}; edges {}/{} slopes {}/{} -> horizontal {}",
            dew.page(),
            min_curv,
            max_curv,
            if v_valid { "valid" } else { "invalid" },
            left_curv,
            right_curv,
            left_slope,
            right_slope,
            if h_valid { "valid" } else { "invalid" }
        );
    }

    dew.set_validity(v_valid, h_valid);
    (v_valid, h_valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dewarp::model::ModelParams;
    use crate::dewarp::types::{ModelState, TextLine};

    fn lines(n: u32, a: f32, a_growth: f32, skew: f32) -> Vec<TextLine> {
        (0..n)
            .map(|i| {
                let base = 100.0 + 1100.0 * i as f32 / (n - 1) as f32;
                let ai = a + a_growth * i as f32 / (n - 1) as f32;
                let drift = skew * (base - 650.0);
                let pts = (80..=920)
                    .step_by(4)
                    .map(|x| {
                        let dx = x as f32 - 500.0;
                        (x as f32 + drift, base + ai * dx * dx)
                    })
                    .collect();
                TextLine::new(pts)
            })
            .collect()
    }

    fn build(lines: Vec<TextLine>) -> Dewarp {
        Dewarp::build_from_lines(1000, 1300, 0, lines, &ModelParams::default()).unwrap()
    }

    #[test]
    fn test_flat_page_is_valid() {
        let mut dew = build(lines(20, 0.0, 0.0, 0.0));
        assert_eq!(validate(&mut dew, &CurvatureThresholds::default()), (true, true));
        assert_eq!(dew.v_state(), ModelState::Valid);
        assert_eq!(dew.h_state(), ModelState::Valid);
    }

    #[test]
    fn test_too_much_curvature() {
        // 200 micro > 150
        let mut dew = build(lines(20, 2e-4, 0.0, 0.0));
        assert_eq!(validate(&mut dew, &CurvatureThresholds::default()), (false, false));
        assert_eq!(dew.v_state(), ModelState::Invalid);
        // horizontal was built but cannot be valid without the vertical
        assert_eq!(dew.h_state(), ModelState::Invalid);
    }

    #[test]
    fn test_curvature_spread() {
        // 0..100 micro: spread 100
        let mut dew = build(lines(20, 0.0, 1e-4, 0.0));
        let mut t = CurvatureThresholds::default();
        assert!(validate(&mut dew, &t).0);
        t.max_diff_linecurv = 90;
        assert!(!validate(&mut dew, &t).0);
        t.max_diff_linecurv = 170;
        t.min_diff_linecurv = 120;
        assert!(!validate(&mut dew, &t).0);
    }

    #[test]
    fn test_edge_slope_only_affects_horizontal() {
        // 100 milli > 80
        let mut dew = build(lines(20, 0.0, 0.0, 0.1));
        assert_eq!(validate(&mut dew, &CurvatureThresholds::default()), (true, false));
        assert!(dew.v_valid());
        assert!(!dew.h_valid());
    }

    #[test]
    fn test_idempotent_and_revalidates() {
        let mut dew = build(lines(20, 1.2e-4, 0.0, 0.0));
        let t = CurvatureThresholds::default();
        let first = validate(&mut dew, &t);
        assert_eq!(validate(&mut dew, &t), first);
        let strict = CurvatureThresholds {
            max_linecurv: 100,
            ..t
        };
        assert_eq!(validate(&mut dew, &strict), (false, false));
        assert_eq!(validate(&mut dew, &t), first);
    }

    #[test]
    fn test_no_model_never_valid() {
        let mut dew = build(lines(5, 0.0, 0.0, 0.0));
        assert_eq!(validate(&mut dew, &CurvatureThresholds::default()), (false, false));
        assert_eq!(dew.v_state(), ModelState::Absent);
    }
}
