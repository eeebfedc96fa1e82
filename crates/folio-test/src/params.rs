//! Regression checks with indexed failure reporting

use folio_core::Pix;

/// How much a regression run prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Report failures only
    #[default]
    Compare,
    /// Also print every checked value
    Display,
}

impl RegTestMode {
    /// Mode named by `REGTEST_MODE` ("display" or anything else)
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE") {
            Ok(v) if v.eq_ignore_ascii_case("display") => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// State of one regression run
///
/// Every `compare_*` call advances the check index, so a failure message
/// pins down exactly which check broke. Failures are collected rather than
/// panicking; [`RegParams::cleanup`] prints the summary and returns the
/// overall result for the caller to assert on.
pub struct RegParams {
    /// Short test name, e.g. "dewarp"
    pub test_name: String,
    index: usize,
    pub mode: RegTestMode,
    failures: Vec<String>,
}

impl RegParams {
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();
        eprintln!("\n==== {test_name}_reg ({mode:?}) ====");
        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            failures: Vec::new(),
        }
    }

    /// Index of the last check
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    /// Advance the index and record `failure`, if any.
    fn check(&mut self, what: &str, failure: Option<String>) -> bool {
        self.index += 1;
        match failure {
            None => true,
            Some(detail) => {
                let msg = format!(
                    "{}_reg: {what} check {} failed: {detail}",
                    self.test_name, self.index
                );
                eprintln!("{msg}");
                self.failures.push(msg);
                false
            }
        }
    }

    /// Pass when `|expected - actual| <= delta`.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        if self.display() {
            eprintln!("  [{}] expected {expected}, got {actual}", self.index + 1);
        }
        let diff = (expected - actual).abs();
        let failure = (diff > delta).then(|| {
            format!("expected {expected}, got {actual} (diff {diff} > delta {delta})")
        });
        self.check("value", failure)
    }

    /// Pass when both images have the same size, depth and pixels.
    pub fn compare_pix(&mut self, pix1: &Pix, pix2: &Pix) -> bool {
        let failure = if !pix1.sizes_equal(pix2) {
            Some(format!(
                "{}x{}x{} vs {}x{}x{}",
                pix1.width(),
                pix1.height(),
                pix1.depth().bits(),
                pix2.width(),
                pix2.height(),
                pix2.depth().bits()
            ))
        } else {
            (0..pix1.height())
                .flat_map(|y| (0..pix1.width()).map(move |x| (x, y)))
                .find(|&(x, y)| pix1.get_pixel(x, y) != pix2.get_pixel(x, y))
                .map(|(x, y)| format!("first pixel mismatch at ({x}, {y})"))
        };
        self.check("pix", failure)
    }

    /// Pass when both byte strings are identical.
    pub fn compare_strings(&mut self, data1: &[u8], data2: &[u8]) -> bool {
        let failure = (data1 != data2).then(|| {
            let at = data1
                .iter()
                .zip(data2)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| data1.len().min(data2.len()));
            format!("lengths {} and {}, first difference at byte {at}", data1.len(), data2.len())
        });
        self.check("string", failure)
    }

    /// Print the summary; true if every check passed.
    pub fn cleanup(self) -> bool {
        if self.failures.is_empty() {
            eprintln!("SUCCESS: {}_reg ({} checks)", self.test_name, self.index);
            return true;
        }
        eprintln!(
            "FAILURE: {}_reg ({} of {} checks)",
            self.test_name,
            self.failures.len(),
            self.index
        );
        for failure in &self.failures {
            eprintln!("  {failure}");
        }
        false
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}
