//! Point array regression test
//!
//! Tests Pta construction and the least-squares fits used to model
//! text lines and page edges.

use folio_core::{Pta, QuadraticFit, apply_quadratic_fit};
use folio_test::RegParams;

#[test]
fn pta_reg() {
    let mut rp = RegParams::new("pta");

    // --- Test 1: Pta creation and access ---
    let mut pta = Pta::new();
    pta.push(10.0, 20.0);
    pta.push(30.0, 40.0);
    pta.push(50.0, 60.0);
    rp.compare_values(3.0, pta.len() as f64, 0.0);
    let (x, y) = pta.get(0).unwrap();
    rp.compare_values(10.0, x as f64, 0.0);
    rp.compare_values(20.0, y as f64, 0.0);

    let err = Pta::from_vecs(vec![1.0], vec![1.0, 2.0]);
    rp.compare_values(1.0, if err.is_err() { 1.0 } else { 0.0 }, 0.0);

    // --- Test 2: Linear fit ---
    let (a, b) = pta.get_linear_lsf().unwrap();
    rp.compare_values(1.0, a as f64, 1e-5);
    rp.compare_values(10.0, b as f64, 1e-4);

    // --- Test 3: Quadratic fit of a bowed text line ---
    let truth = QuadraticFit {
        a: 4.0e-5,
        b: -0.04,
        c: 110.0,
    };
    let line: Pta = (80..920)
        .step_by(5)
        .map(|x| (x as f32, truth.eval(x as f32)))
        .collect();
    let fit = line.get_quadratic_lsf().unwrap();
    rp.compare_values(40.0, (1e6 * fit.a).round() as f64, 0.0);
    rp.compare_values(
        apply_quadratic_fit(truth.a, truth.b, truth.c, 500.0) as f64,
        fit.eval(500.0) as f64,
        0.01,
    );

    // --- Test 4: Edge fit x = f(y) via transpose, with an outlier ---
    let mut edge: Pta = (0..20).map(|i| (80.0 + 0.02 * (i * 50) as f32, (i * 50) as f32)).collect();
    edge.push(300.0, 525.0);
    let noisy = edge.transposed().get_noisy_quadratic_lsf(3.0, 2.0).unwrap();
    rp.compare_values(20.0, noisy.inliers.len() as f64, 0.0);
    rp.compare_values(0.0, (1e6 * noisy.fit.a).round() as f64, 1.0);
    let (m, _) = noisy.inliers.get_linear_lsf().unwrap();
    rp.compare_values(20.0, (1000.0 * m).round() as f64, 0.0);

    assert!(rp.cleanup(), "pta_reg failed");
}
