//! Pta - Point arrays
//!
//! Arrays of floating-point coordinate pairs. Textline centers and
//! line end points are collected as `Pta` and fitted with the
//! least-squares routines in [`lsf`].
//!
//! # Storage layout
//!
//! Points are stored as separate X and Y vectors (SoA layout).

mod lsf;

pub use lsf::{NoisyQuadraticFit, QuadraticFit, apply_linear_fit, apply_quadratic_fit};

use crate::error::{Error, Result};

/// Array of points.
///
/// Stores 2D points as parallel x/y coordinate vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pta {
    /// X coordinates
    x: Vec<f32>,
    /// Y coordinates
    y: Vec<f32>,
}

impl Pta {
    /// Create a new empty Pta.
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    /// Create a Pta with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
        }
    }

    /// Create a Pta from coordinate vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `y` have different lengths.
    pub fn from_vecs(x: Vec<f32>, y: Vec<f32>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::InvalidParameter(format!(
                "x has {} values but y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y })
    }

    /// Get the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check if the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Get a point by index.
    pub fn get(&self, index: usize) -> Option<(f32, f32)> {
        Some((*self.x.get(index)?, *self.y.get(index)?))
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, x: f32, y: f32) {
        self.x.push(x);
        self.y.push(y);
    }

    /// Get all X coordinates.
    #[inline]
    pub fn x_coords(&self) -> &[f32] {
        &self.x
    }

    /// Get all Y coordinates.
    #[inline]
    pub fn y_coords(&self) -> &[f32] {
        &self.y
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Swap the roles of x and y.
    ///
    /// Used to fit a vertical curve `x = f(y)` with the same routines
    /// that fit `y = f(x)`.
    pub fn transposed(&self) -> Pta {
        Pta {
            x: self.y.clone(),
            y: self.x.clone(),
        }
    }

    /// Return a copy sorted by increasing x.
    pub fn sorted_by_x(&self) -> Pta {
        let mut pts: Vec<(f32, f32)> = self.iter().collect();
        pts.sort_by(|a, b| a.0.total_cmp(&b.0));
        pts.into_iter().collect()
    }
}

impl FromIterator<(f32, f32)> for Pta {
    fn from_iter<I: IntoIterator<Item = (f32, f32)>>(iter: I) -> Self {
        let mut pta = Pta::new();
        for (x, y) in iter {
            pta.push(x, y);
        }
        pta
    }
}
