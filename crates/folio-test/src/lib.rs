//! folio-test - Regression test framework for folio
//!
//! Regression tests compare computed values and images against expected
//! ones, report every failure with its index, and return an overall
//! status from [`RegParams::cleanup`].
//!
//! # Usage
//!
//! ```ignore
//! use folio_test::RegParams;
//!
//! let mut rp = RegParams::new("dewarp");
//! rp.compare_values(20.0, nlines as f64, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! Pages for end-to-end tests are generated by [`synth`], so no image
//! files are needed.
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "display" to print intermediate results

mod error;
mod params;
pub mod synth;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};
