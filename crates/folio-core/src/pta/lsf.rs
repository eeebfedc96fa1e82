//! Least-squares fitting for Pta.

use crate::error::{Error, Result};
use crate::pta::Pta;

/// Coefficients of `y = ax² + bx + c`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadraticFit {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl QuadraticFit {
    /// Evaluate the fitted curve at `x`.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        apply_quadratic_fit(self.a, self.b, self.c, x)
    }
}

/// Result of [`Pta::get_noisy_quadratic_lsf`].
#[derive(Debug, Clone)]
pub struct NoisyQuadraticFit {
    /// Fit over the retained points
    pub fit: QuadraticFit,
    /// Median absolute residual of the initial fit over all points
    pub median_error: f32,
    /// Points kept for the final fit
    pub inliers: Pta,
}

impl Pta {
    /// Linear least-squares fit y = ax + b. Returns `(a, b)`.
    ///
    /// # Errors
    ///
    /// Fails with fewer than 2 points or when all x are equal.
    pub fn get_linear_lsf(&self) -> Result<(f32, f32)> {
        let n = self.len();
        if n < 2 {
            return Err(Error::InvalidParameter("less than 2 pts found".to_string()));
        }
        let (mut sx, mut sy, mut sxx, mut sxy) = (0f64, 0f64, 0f64, 0f64);
        for (x, y) in self.iter() {
            let (x, y) = (x as f64, y as f64);
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }
        let factor = n as f64 * sxx - sx * sx;
        if factor.abs() < f64::EPSILON {
            return Err(Error::NoSolution("linear lsf: degenerate x"));
        }
        let a = (n as f64 * sxy - sx * sy) / factor;
        let b = (sxx * sy - sx * sxy) / factor;
        Ok((a as f32, b as f32))
    }

    /// Quadratic LSF: y = ax² + bx + c.
    ///
    /// # Errors
    ///
    /// Fails with fewer than 3 points or a singular normal matrix.
    pub fn get_quadratic_lsf(&self) -> Result<QuadraticFit> {
        let n = self.len();
        if n < 3 {
            return Err(Error::InvalidParameter("less than 3 pts found".to_string()));
        }

        let (mut sx, mut sy, mut sx2, mut sx3, mut sx4, mut sxy, mut sx2y) =
            (0f64, 0f64, 0f64, 0f64, 0f64, 0f64, 0f64);
        for (x, y) in self.iter() {
            let (x, y) = (x as f64, y as f64);
            let x2 = x * x;
            sx += x;
            sy += y;
            sx2 += x2;
            sx3 += x2 * x;
            sx4 += x2 * x2;
            sxy += x * y;
            sx2y += x2 * y;
        }

        let f = [[sx4, sx3, sx2], [sx3, sx2, sx], [sx2, sx, n as f64]];
        let rhs = [sx2y, sxy, sy];
        let g = gauss_jordan_3(f, rhs).ok_or(Error::NoSolution("quadratic lsf: singular matrix"))?;

        Ok(QuadraticFit {
            a: g[0] as f32,
            b: g[1] as f32,
            c: g[2] as f32,
        })
    }

    /// Quadratic LSF that rejects outliers.
    ///
    /// Fits all points, then refits using only points whose absolute
    /// residual is at most `factor` times the median residual (with a
    /// floor of `min_error`). If fewer than 3 points survive, the
    /// initial fit is returned with all points as inliers.
    pub fn get_noisy_quadratic_lsf(&self, factor: f32, min_error: f32) -> Result<NoisyQuadraticFit> {
        let first = self.get_quadratic_lsf()?;
        let residuals: Vec<f32> = self.iter().map(|(x, y)| (y - first.eval(x)).abs()).collect();
        let mut sorted = residuals.clone();
        sorted.sort_by(f32::total_cmp);
        let median_error = sorted[sorted.len() / 2];

        let thresh = (factor * median_error).max(min_error);
        let inliers: Pta = self
            .iter()
            .zip(&residuals)
            .filter(|(_, r)| **r <= thresh)
            .map(|(p, _)| p)
            .collect();

        if inliers.len() < 3 {
            return Ok(NoisyQuadraticFit {
                fit: first,
                median_error,
                inliers: self.clone(),
            });
        }
        let fit = inliers.get_quadratic_lsf()?;
        Ok(NoisyQuadraticFit {
            fit,
            median_error,
            inliers,
        })
    }
}

/// Evaluate y = ax + b at x.
pub fn apply_linear_fit(a: f32, b: f32, x: f32) -> f32 {
    a * x + b
}

/// Evaluate y = ax² + bx + c at x.
pub fn apply_quadratic_fit(a: f32, b: f32, c: f32, x: f32) -> f32 {
    a * x * x + b * x + c
}

/// Solve a 3x3 linear system with partial pivoting.
fn gauss_jordan_3(mut m: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        b.swap(col, pivot);
        for row in 0..3 {
            if row == col {
                continue;
            }
            let k = m[row][col] / m[col][col];
            for c in col..3 {
                m[row][c] -= k * m[col][c];
            }
            b[row] -= k * b[col];
        }
    }
    Some([b[0] / m[0][0], b[1] / m[1][1], b[2] / m[2][2]])
}
