//! Serialization for page models and model collections
//!
//! Text headers followed by the sampled fields as binary `FPix` blocks.
//!
//! ```text
//! \nDewarp Version 4\n
//! page = P, reference = R\n                      (R = -1 for an actual model)
//! width = W, height = H, sampling = S, redfactor = F, min_lines = M, nlines = N\n
//! vertical = STATE, horizontal = STATE, slope = 0|1\n
//! min_curv = .., max_curv = .., left_slope = .., right_slope = .., left_curv = .., right_curv = ..\n
//! line_ys = y0 y1 ...\n
//! line_curvatures = c0 c1 ...\n
//! <FPix vertical> <FPix horizontal> <FPix slope>   (those present)
//! ```
//!
//! A collection is a header with its configuration followed by its actual
//! models; reference records are not stored, so a collection that has been
//! read back must have its references resolved again.
//!
//! ```text
//! \nDewarpa Version 4\n
//! sampling = S, redfactor = F, min_lines = M, max_ref_dist = D\n
//! use_both = 0|1, check_columns = 0|1, gray_in = G, cache_size = C\n
//! max_linecurv = .., min_diff_linecurv = .., max_diff_linecurv = .., max_edgecurv = .., max_diff_edgecurv = .., max_edgeslope = ..\n
//! models = K\n
//! <K Dewarp blocks>
//! ```

use super::dewarpa::Dewarpa;
use super::field::{DisparityField, DisparityKind};
use super::model::{Dewarp, DisparityModel, ModelParams};
use super::types::{CurvatureThresholds, DEWARP_VERSION_NUMBER, DewarpaOptions, ModelState};
use crate::{RecogError, RecogResult};
use folio_core::FPix;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Maximum input size in bytes
const MAX_INPUT_SIZE: u64 = 1_000_000_000;

fn invalid(msg: impl Into<String>) -> RecogError {
    RecogError::InvalidFormat(msg.into())
}

fn read_all(reader: &mut impl Read) -> RecogResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(MAX_INPUT_SIZE + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > MAX_INPUT_SIZE {
        return Err(invalid(format!(
            "input exceeds maximum size of {MAX_INPUT_SIZE} bytes"
        )));
    }
    Ok(buf)
}

/// Cursor over a serialized stream
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn line(&mut self) -> RecogResult<&'a str> {
        let rest = self
            .data
            .get(self.pos..)
            .ok_or_else(|| invalid("header truncated"))?;
        let len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| invalid("header truncated"))?;
        let line =
            std::str::from_utf8(&rest[..len]).map_err(|_| invalid("header is not UTF-8"))?;
        self.pos += len + 1;
        Ok(line.trim())
    }

    /// Expect a blank line followed by `<name> Version <n>`
    fn version(&mut self, name: &str) -> RecogResult<()> {
        if !self.line()?.is_empty() {
            return Err(invalid(format!("not a {name} stream")));
        }
        let version: u32 = self
            .line()?
            .strip_prefix(name)
            .and_then(|v| v.trim().strip_prefix("Version"))
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| invalid(format!("not a {name} stream")))?;
        if version != DEWARP_VERSION_NUMBER {
            return Err(RecogError::VersionMismatch {
                expected: DEWARP_VERSION_NUMBER,
                actual: version,
            });
        }
        Ok(())
    }

    fn fpix(&mut self) -> RecogResult<FPix> {
        let rest = self
            .data
            .get(self.pos..)
            .ok_or_else(|| invalid("field data truncated"))?;
        let (fpix, used) = FPix::read_prefix(rest)?;
        self.pos += used;
        Ok(fpix)
    }
}

/// Parse one `key = value` pair of a comma-separated line
fn field<T: FromStr>(line: &str, key: &str) -> RecogResult<T> {
    line.split(',')
        .filter_map(|part| part.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .and_then(|(_, v)| v.trim().parse().ok())
        .ok_or_else(|| invalid(format!("missing or malformed '{key}'")))
}

fn flag(line: &str, key: &str) -> RecogResult<bool> {
    match field::<u8>(line, key)? {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(invalid(format!("'{key}' must be 0 or 1, got {v}"))),
    }
}

/// Parse `key = v0 v1 ...`
fn list<T: FromStr>(line: &str, key: &str) -> RecogResult<Vec<T>> {
    let values = line
        .split_once('=')
        .filter(|(k, _)| k.trim() == key)
        .map(|(_, v)| v)
        .ok_or_else(|| invalid(format!("missing '{key}'")))?;
    values
        .split_whitespace()
        .map(|v| {
            v.parse()
                .map_err(|_| invalid(format!("malformed value '{v}' in '{key}'")))
        })
        .collect()
}

fn state(line: &str, key: &str) -> RecogResult<ModelState> {
    match field::<String>(line, key)?.as_str() {
        "absent" => Ok(ModelState::Absent),
        "built" => Ok(ModelState::Built),
        "invalid" => Ok(ModelState::Invalid),
        "valid" => Ok(ModelState::Valid),
        s => Err(invalid(format!("unknown state '{s}' for '{key}'"))),
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn model_with_state(state: ModelState, field: DisparityField) -> DisparityModel {
    match state {
        ModelState::Absent => DisparityModel::Absent,
        ModelState::Built => DisparityModel::Built(field),
        ModelState::Invalid => DisparityModel::Invalid(field),
        ModelState::Valid => DisparityModel::Valid(field),
    }
}

impl Dewarp {
    /// Write the model to a writer
    ///
    /// Only the sampled fields are written; stored full-resolution fields
    /// are recomputed on demand after reading.
    pub fn write_to_writer(&self, writer: &mut impl Write) -> RecogResult<()> {
        writeln!(writer, "\nDewarp Version {DEWARP_VERSION_NUMBER}")?;
        let reference = self.reference.map_or(-1, i64::from);
        writeln!(writer, "page = {}, reference = {reference}", self.page)?;
        writeln!(
            writer,
            "width = {}, height = {}, sampling = {}, redfactor = {}, min_lines = {}, nlines = {}",
            self.width, self.height, self.sampling, self.redfactor, self.min_lines, self.nlines
        )?;
        writeln!(
            writer,
            "vertical = {}, horizontal = {}, slope = {}",
            self.v_state().as_str(),
            self.h_state().as_str(),
            u8::from(self.slope.is_some())
        )?;
        writeln!(
            writer,
            "min_curv = {}, max_curv = {}, left_slope = {}, right_slope = {}, \
             left_curv = {}, right_curv = {}",
            self.min_curv,
            self.max_curv,
            self.left_slope,
            self.right_slope,
            self.left_curv,
            self.right_curv
        )?;
        writeln!(writer, "line_ys = {}", join(&self.line_ys))?;
        writeln!(writer, "line_curvatures = {}", join(&self.line_curvatures))?;

        let fields = [self.vertical.field(), self.horizontal.field(), self.slope.as_ref()];
        for field in fields.into_iter().flatten() {
            field.sampled().write_to_writer(writer)?;
        }
        Ok(())
    }

    /// Write the model to a byte vector
    pub fn write_to_bytes(&self) -> RecogResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Write the model to a file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> RecogResult<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a model from a byte slice
    ///
    /// # Errors
    ///
    /// Returns [`RecogError::VersionMismatch`] for any version other than
    /// the current one, and [`RecogError::InvalidFormat`] for malformed data.
    pub fn read_from_bytes(data: &[u8]) -> RecogResult<Self> {
        Self::read(&mut Cursor::new(data))
    }

    /// Read a model from a reader
    pub fn read_from_reader(reader: &mut impl Read) -> RecogResult<Self> {
        Self::read_from_bytes(&read_all(reader)?)
    }

    /// Read a model from a file
    pub fn read_from_file(path: impl AsRef<Path>) -> RecogResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_from_reader(&mut BufReader::new(file))
    }

    fn read(cur: &mut Cursor<'_>) -> RecogResult<Self> {
        cur.version("Dewarp")?;

        let line = cur.line()?;
        let page: u32 = field(line, "page")?;
        let reference: i64 = field(line, "reference")?;

        let line = cur.line()?;
        let params = ModelParams {
            sampling: field(line, "sampling")?,
            redfactor: field(line, "redfactor")?,
            min_lines: field(line, "min_lines")?,
        };
        let width = field(line, "width")?;
        let height = field(line, "height")?;
        let nlines = field(line, "nlines")?;
        params
            .validate()
            .map_err(|e| invalid(format!("page {page}: {e}")))?;

        let line = cur.line()?;
        let v_state = state(line, "vertical")?;
        let h_state = state(line, "horizontal")?;
        let has_slope = flag(line, "slope")?;

        let mut dew = Dewarp::empty(page, width, height, &params);
        dew.nlines = nlines;
        let line = cur.line()?;
        dew.min_curv = field(line, "min_curv")?;
        dew.max_curv = field(line, "max_curv")?;
        dew.left_slope = field(line, "left_slope")?;
        dew.right_slope = field(line, "right_slope")?;
        dew.left_curv = field(line, "left_curv")?;
        dew.right_curv = field(line, "right_curv")?;
        dew.line_ys = list(cur.line()?, "line_ys")?;
        dew.line_curvatures = list(cur.line()?, "line_curvatures")?;

        if reference >= 0 {
            let refpage =
                u32::try_from(reference).map_err(|_| invalid("reference page out of range"))?;
            return Dewarp::create_ref(page, refpage, params.sampling, params.redfactor);
        }
        if h_state.valid() && !v_state.valid() {
            return Err(invalid("horizontal field valid without a valid vertical field"));
        }
        if width == 0 || height == 0 {
            return Err(invalid(format!("page {page}: size {width}x{height}")));
        }

        let (sampling, redfactor) = (params.sampling, params.redfactor);
        let grid = dew.sample_grid();
        let mut next_field = |kind: DisparityKind| -> RecogResult<DisparityField> {
            let sampled = cur.fpix()?;
            if sampled.dimensions() != grid {
                return Err(invalid(format!(
                    "page {page}: {kind:?} field is {:?}, expected {grid:?} samples",
                    sampled.dimensions()
                )));
            }
            Ok(DisparityField::new(kind, sampling, redfactor, sampled))
        };
        if v_state.success() {
            dew.vertical = model_with_state(v_state, next_field(DisparityKind::Vertical)?);
        }
        if h_state.success() {
            dew.horizontal = model_with_state(h_state, next_field(DisparityKind::Horizontal)?);
        }
        if has_slope {
            dew.slope = Some(next_field(DisparityKind::Slope)?);
        }
        Ok(dew)
    }
}

impl Dewarpa {
    /// Write the configuration and all actual models to a writer
    pub fn write_to_writer(&self, writer: &mut impl Write) -> RecogResult<()> {
        let o = &self.options;
        let t = &o.thresholds;
        let actual = self.actual_models();

        writeln!(writer, "\nDewarpa Version {DEWARP_VERSION_NUMBER}")?;
        writeln!(
            writer,
            "sampling = {}, redfactor = {}, min_lines = {}, max_ref_dist = {}",
            o.sampling, o.reduction_factor, o.min_lines, o.max_ref_dist
        )?;
        writeln!(
            writer,
            "use_both = {}, check_columns = {}, gray_in = {}, cache_size = {}",
            u8::from(o.use_both),
            u8::from(o.check_columns),
            o.gray_in,
            o.cache_size
        )?;
        writeln!(
            writer,
            "max_linecurv = {}, min_diff_linecurv = {}, max_diff_linecurv = {}, \
             max_edgecurv = {}, max_diff_edgecurv = {}, max_edgeslope = {}",
            t.max_linecurv,
            t.min_diff_linecurv,
            t.max_diff_linecurv,
            t.max_edgecurv,
            t.max_diff_edgecurv,
            t.max_edgeslope
        )?;
        writeln!(writer, "models = {}", actual.len())?;
        for dew in actual {
            dew.write_to_writer(writer)?;
        }
        Ok(())
    }

    /// Write the collection to a byte vector
    pub fn write_to_bytes(&self) -> RecogResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Write the collection to a file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> RecogResult<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a collection from a byte slice
    ///
    /// The collection uses the default collaborators and is not ready for
    /// rendering until [`Dewarpa::resolve_references`] has run.
    pub fn read_from_bytes(data: &[u8]) -> RecogResult<Self> {
        let mut cur = Cursor::new(data);
        cur.version("Dewarpa")?;

        let line = cur.line()?;
        let options = DewarpaOptions::new()
            .with_sampling(field(line, "sampling")?)
            .with_reduction_factor(field(line, "redfactor")?)
            .with_min_lines(field(line, "min_lines")?)
            .with_max_ref_dist(field(line, "max_ref_dist")?);
        let line = cur.line()?;
        let options = options
            .with_use_both(flag(line, "use_both")?)
            .with_check_columns(flag(line, "check_columns")?)
            .with_gray_in(field(line, "gray_in")?)
            .with_cache_size(field(line, "cache_size")?);
        let line = cur.line()?;
        let thresholds = CurvatureThresholds {
            max_linecurv: field(line, "max_linecurv")?,
            min_diff_linecurv: field(line, "min_diff_linecurv")?,
            max_diff_linecurv: field(line, "max_diff_linecurv")?,
            max_edgecurv: field(line, "max_edgecurv")?,
            max_diff_edgecurv: field(line, "max_diff_edgecurv")?,
            max_edgeslope: field(line, "max_edgeslope")?,
        };
        let options = options.with_thresholds(thresholds);
        let nmodels: usize = field(cur.line()?, "models")?;

        let mut dewa = Dewarpa::new(options)?;
        for _ in 0..nmodels {
            let dew = Dewarp::read(&mut cur)?;
            if dew.is_reference() {
                return Err(invalid("collection stream holds a reference record"));
            }
            dewa.insert(dew)?;
        }
        Ok(dewa)
    }

    /// Read a collection from a reader
    pub fn read_from_reader(reader: &mut impl Read) -> RecogResult<Self> {
        Self::read_from_bytes(&read_all(reader)?)
    }

    /// Read a collection from a file
    pub fn read_from_file(path: impl AsRef<Path>) -> RecogResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_from_reader(&mut BufReader::new(file))
    }
}
