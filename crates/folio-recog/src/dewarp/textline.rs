//! Text line detection for dewarping
//!
//! This module provides functionality to detect text line centers
//! in a binary image. These centers are used to build the disparity model.

use crate::{RecogError, RecogResult};
use folio_core::{Pix, PixelDepth};
use folio_morph::{close_brick, erode_brick, open_brick};
use folio_region::{
    BoundingBox, ConnectivityType, label_connected_components, remove_seeded_components,
};

use super::types::TextLine;

/// Fraction of the longest line a line must reach to be kept
pub const LONG_LINE_FRACTION: f32 = 0.8;

/// Minimum vertical span of the kept lines, as a fraction of the page height
pub const MIN_LINE_SPAN_FRACTION: f32 = 0.4;

/// Finds text line centers on a binary page
pub trait TextlineFinder: Send + Sync {
    /// Center points of every detected text line, in any order
    fn find_lines(&self, pix: &Pix) -> RecogResult<Vec<TextLine>>;
}

/// [`TextlineFinder`] based on brick morphology and connected components
#[derive(Debug, Clone, Copy, Default)]
pub struct MorphTextlineFinder;

impl TextlineFinder for MorphTextlineFinder {
    fn find_lines(&self, pix: &Pix) -> RecogResult<Vec<TextLine>> {
        find_textline_centers(pix)
    }
}

/// Find the centers of text lines in a binary image
///
/// This function identifies text lines and returns points along their centers.
/// These points are used to build the vertical disparity model.
///
/// # Arguments
///
/// * `pix` - Input binary image (1 bpp)
///
/// # Returns
///
/// A vector of `TextLine` objects, each containing points along the center
/// of a text line, ordered by the raster position of the line.
pub fn find_textline_centers(pix: &Pix) -> RecogResult<Vec<TextLine>> {
    if pix.depth() != PixelDepth::Bit1 {
        return Err(RecogError::UnsupportedDepth {
            expected: "1 bpp",
            actual: pix.depth().bits(),
        });
    }

    let w = pix.width();

    // Solidify the x-height band of each line.
    // Small vertical opening removes noise
    let pix1 = open_brick(pix, 1, 3)?;

    // Bridge gaps between letters, then drop thin connections
    let csize1 = (w / 80).max(15);
    let pix2 = close_brick(&pix1, csize1, 1)?;
    let pix3 = open_brick(&pix2, csize1, 1)?;

    // Bridge gaps between words
    let csize2 = (w / 30).max(40);
    let pix4 = close_brick(&pix3, csize2, 1)?;

    // Remove tall components (embedded images and rules): anything that
    // survives a tall vertical erosion seeds its whole component
    let seed = erode_brick(&pix4, 1, 50)?;
    let filtered = remove_seeded_components(&seed, &pix4, ConnectivityType::EightWay)?;

    let labels = label_connected_components(&filtered, ConnectivityType::EightWay)?;

    let mut text_lines = Vec::new();
    for comp in &labels.components {
        // Filter out small components (width < 100 or height < 4)
        if comp.bounds.w < 100 || comp.bounds.h < 4 {
            continue;
        }
        let centers = mean_verticals_in_box(&labels, comp.label, &comp.bounds);
        if !centers.is_empty() {
            text_lines.push(TextLine::new(centers));
        }
    }

    Ok(text_lines)
}

/// Centroid y of each column of one labeled component
///
/// Only pixels carrying `label` are counted, so a neighboring line that
/// intrudes into the bounding box does not bias the center.
fn mean_verticals_in_box(
    labels: &folio_region::ComponentLabels,
    label: u32,
    bounds: &BoundingBox,
) -> Vec<(f32, f32)> {
    let mut centers = Vec::with_capacity(bounds.w as usize);
    for x in bounds.x..bounds.right() {
        let mut sum_y = 0u64;
        let mut count = 0u32;
        for y in bounds.y..bounds.bottom() {
            if labels.label_at(x, y) == label {
                sum_y += u64::from(y);
                count += 1;
            }
        }
        if count > 0 {
            centers.push((x as f32, sum_y as f32 / count as f32));
        }
    }
    centers
}

/// Remove short lines from the list
///
/// Lines shorter than `min_fraction` of the longest line are removed.
///
/// # Arguments
///
/// * `lines` - Vector of text lines
/// * `min_fraction` - Minimum fraction of longest line (typically 0.8)
///
/// # Returns
///
/// Filtered vector of text lines
pub fn remove_short_lines(lines: Vec<TextLine>, min_fraction: f32) -> Vec<TextLine> {
    if lines.is_empty() {
        return lines;
    }

    let max_extent = lines
        .iter()
        .map(|l| l.horizontal_extent())
        .fold(0.0f32, f32::max);

    let min_extent = max_extent * min_fraction;

    lines
        .into_iter()
        .filter(|l| l.horizontal_extent() >= min_extent)
        .collect()
}

/// Check if lines have valid coverage of the image height
///
/// Requires at least `min_lines` lines, the top line in the upper half of
/// the page, the bottom line in the lower half, and a vertical span of at
/// least [`MIN_LINE_SPAN_FRACTION`] of the height.
pub fn is_line_coverage_valid(lines: &[TextLine], image_height: u32, min_lines: u32) -> bool {
    if lines.len() < min_lines as usize {
        return false;
    }

    let ys: Vec<f32> = lines.iter().filter_map(|l| l.mid_y()).collect();
    let (Some(top), Some(bot)) = (
        ys.iter().copied().reduce(f32::min),
        ys.iter().copied().reduce(f32::max),
    ) else {
        return false;
    };

    let h = image_height as f32;
    top < 0.5 * h && bot >= 0.5 * h && bot - top >= MIN_LINE_SPAN_FRACTION * h
}

/// Sort lines by their vertical position (top to bottom)
pub fn sort_lines_by_y(lines: &mut [TextLine]) {
    lines.sort_by(|a, b| {
        let ya = a.mid_y().unwrap_or(0.0);
        let yb = b.mid_y().unwrap_or(0.0);
        ya.total_cmp(&yb)
    });
}
