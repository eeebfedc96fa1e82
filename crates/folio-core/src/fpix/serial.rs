//! Serialization for FPix
//!
//! Mixed text header + binary data format.
//!
//! ```text
//! \nFPix Version 2\n
//! w = W, h = H, nbytes = N\n
//! xres = X, yres = Y\n
//! <raw f32 data, little-endian, N bytes>
//! \n
//! ```
//!
//! A serialized FPix can be embedded inside a larger stream; use
//! [`FPix::read_prefix`] to decode one and learn how many bytes it used.

use crate::error::{Error, Result};
use crate::fpix::FPix;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// FPix format version
const FPIX_VERSION: i32 = 2;

/// Maximum pixel count for FPix (2^29)
const MAX_FPIX_PIXELS: u64 = 1 << 29;

/// Maximum input size in bytes.
const MAX_INPUT_SIZE: u64 = 500_000_000;

impl FPix {
    /// Read an FPix from a reader.
    pub fn read_from_reader(reader: &mut impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        reader.take(MAX_INPUT_SIZE + 1).read_to_end(&mut buf)?;
        if buf.len() as u64 > MAX_INPUT_SIZE {
            return Err(Error::DecodeError(format!(
                "input too large: exceeds maximum allowed size of {MAX_INPUT_SIZE} bytes"
            )));
        }
        Self::read_from_bytes(&buf)
    }

    /// Read an FPix from a file.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_from_reader(&mut BufReader::new(file))
    }

    /// Read an FPix from a byte slice.
    pub fn read_from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_prefix(data).map(|(fpix, _)| fpix)
    }

    /// Decode an FPix at the start of `data`.
    ///
    /// Returns the FPix and the number of bytes consumed, including the
    /// trailing newline when present.
    pub fn read_prefix(data: &[u8]) -> Result<(Self, usize)> {
        let (w, h, nbytes, xres, yres, header_end) = parse_header(data)?;

        let npixels = w as u64 * h as u64;
        if npixels == 0 || npixels > MAX_FPIX_PIXELS {
            return Err(Error::DecodeError(format!(
                "FPix size {w}x{h} out of range"
            )));
        }
        let expected_nbytes = npixels * 4;
        if nbytes != expected_nbytes {
            return Err(Error::DecodeError(format!(
                "FPix nbytes mismatch: header says {nbytes} but w*h*4 = {expected_nbytes}"
            )));
        }

        let binary_end = header_end + nbytes as usize;
        if data.len() < binary_end {
            return Err(Error::DecodeError(format!(
                "FPix data truncated: need {binary_end} bytes but only have {}",
                data.len()
            )));
        }
        let pixel_data: Vec<f32> = data[header_end..binary_end]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let consumed = if data.get(binary_end) == Some(&b'\n') {
            binary_end + 1
        } else {
            binary_end
        };

        let mut fpix = FPix::from_data(w, h, pixel_data)?;
        fpix.set_resolution(xres, yres);
        Ok((fpix, consumed))
    }

    /// Write an FPix to a writer.
    pub fn write_to_writer(&self, writer: &mut impl Write) -> Result<()> {
        let (w, h) = self.dimensions();
        let (xres, yres) = self.resolution();
        let nbytes = (w as u64) * (h as u64) * 4;
        writeln!(writer, "\nFPix Version {FPIX_VERSION}")?;
        writeln!(writer, "w = {w}, h = {h}, nbytes = {nbytes}")?;
        writeln!(writer, "xres = {xres}, yres = {yres}")?;

        for &val in self.data() {
            writer.write_all(&val.to_le_bytes())?;
        }

        writeln!(writer)?;
        Ok(())
    }

    /// Write an FPix to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write an FPix to a byte vector.
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to_writer(&mut buf)?;
        Ok(buf)
    }
}

/// Take the next `\n`-terminated line starting at `pos`.
fn next_line(data: &[u8], pos: usize) -> Result<(&str, usize)> {
    let rest = data
        .get(pos..)
        .ok_or_else(|| Error::DecodeError("FPix header truncated".into()))?;
    let len = rest
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Error::DecodeError("FPix header truncated".into()))?;
    let line = std::str::from_utf8(&rest[..len])
        .map_err(|_| Error::DecodeError("FPix header is not UTF-8".into()))?;
    Ok((line.trim(), pos + len + 1))
}

/// Parse `key = value` pairs separated by commas.
fn field<T: std::str::FromStr>(line: &str, key: &str) -> Result<T> {
    line.split(',')
        .filter_map(|part| part.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .and_then(|(_, v)| v.trim().parse().ok())
        .ok_or_else(|| Error::DecodeError(format!("FPix header missing '{key}'")))
}

/// Parse the header. Returns (w, h, nbytes, xres, yres, header_end).
fn parse_header(data: &[u8]) -> Result<(u32, u32, u64, i32, i32, usize)> {
    // leading blank line
    let (blank, pos) = next_line(data, 0)?;
    if !blank.is_empty() {
        return Err(Error::DecodeError("not an FPix stream".into()));
    }
    let (version_line, pos) = next_line(data, pos)?;
    let version: i32 = version_line
        .strip_prefix("FPix Version")
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| Error::DecodeError("not an FPix stream".into()))?;
    if version != FPIX_VERSION {
        return Err(Error::DecodeError(format!(
            "invalid FPix version: expected {FPIX_VERSION}, got {version}"
        )));
    }

    let (size_line, pos) = next_line(data, pos)?;
    let w = field(size_line, "w")?;
    let h = field(size_line, "h")?;
    let nbytes = field(size_line, "nbytes")?;

    let (res_line, pos) = next_line(data, pos)?;
    let xres = field(res_line, "xres")?;
    let yres = field(res_line, "yres")?;

    Ok((w, h, nbytes, xres, yres, pos))
}
