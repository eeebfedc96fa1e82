//! Binary morphological operations
//!
//! Implements erosion, dilation, opening, and closing for 1-bpp images
//! with brick structuring elements.
//!
//! A brick of size `hsize x vsize` is separable, so every operation is
//! done as a horizontal pass followed by a vertical pass. Each pass uses a
//! running count of foreground pixels along the line, making the cost
//! independent of the brick size.
//!
//! The SEL origin is at `(hsize / 2, vsize / 2)`. Pixels outside the image
//! are background for both dilation and erosion (asymmetric boundary
//! condition), so erosion clears foreground within half a brick of the
//! image border.

use crate::error::{MorphError, MorphResult};
use folio_core::{Pix, PixelDepth};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Dilate,
    Erode,
}

fn check_binary(pix: &Pix) -> MorphResult<()> {
    if pix.depth() != PixelDepth::Bit1 {
        return Err(MorphError::UnsupportedDepth {
            expected: "1-bpp",
            actual: pix.depth().bits(),
        });
    }
    Ok(())
}

fn check_brick(hsize: u32, vsize: u32) -> MorphResult<()> {
    if hsize == 0 || vsize == 0 {
        return Err(MorphError::InvalidParameters(format!(
            "brick size must be positive, got {hsize}x{vsize}"
        )));
    }
    Ok(())
}

/// Unpack a binary image into one byte per pixel.
fn unpack(pix: &Pix) -> Vec<u8> {
    let (w, h) = (pix.width(), pix.height());
    let mut bits = Vec::with_capacity((w as usize) * (h as usize));
    for y in 0..h {
        for x in 0..w {
            bits.push(pix.get_pixel_unchecked(x, y) as u8);
        }
    }
    bits
}

/// Pack one byte per pixel back into a binary image with the resolution of `like`.
fn pack(bits: &[u8], like: &Pix) -> MorphResult<Pix> {
    let (w, h) = (like.width(), like.height());
    let mut out = Pix::new(w, h, PixelDepth::Bit1)?.to_mut();
    out.copy_resolution_from(like);
    for y in 0..h {
        let row = &bits[(y * w) as usize..((y + 1) * w) as usize];
        for (x, &b) in row.iter().enumerate() {
            if b != 0 {
                out.set_pixel_unchecked(x as u32, y, 1);
            }
        }
    }
    Ok(out.into())
}

/// One separable pass along rows (`horizontal`) or columns.
fn sweep(bits: &mut [u8], w: u32, h: u32, size: u32, horizontal: bool, op: Op) {
    if size == 1 {
        return;
    }
    let (nlines, len) = if horizontal { (h, w) } else { (w, h) };
    let (nlines, len) = (nlines as usize, len as isize);
    let size = size as isize;
    let c = size / 2;
    let (before, after) = match op {
        Op::Dilate => (size - 1 - c, c),
        Op::Erode => (c, size - 1 - c),
    };

    let index = |line: usize, i: isize| -> usize {
        if horizontal {
            line * len as usize + i as usize
        } else {
            i as usize * nlines + line
        }
    };

    let mut prefix = vec![0u32; len as usize + 1];
    let mut out = vec![0u8; len as usize];
    for line in 0..nlines {
        for i in 0..len {
            prefix[i as usize + 1] = prefix[i as usize] + u32::from(bits[index(line, i)]);
        }
        for i in 0..len {
            let lo = i - before;
            let hi = i + after;
            let clo = lo.max(0) as usize;
            let chi = hi.min(len - 1) as usize;
            let count = prefix[chi + 1] - prefix[clo];
            out[i as usize] = match op {
                Op::Dilate => u8::from(count > 0),
                Op::Erode => u8::from(lo >= 0 && hi < len && count as isize == size),
            };
        }
        for i in 0..len {
            bits[index(line, i)] = out[i as usize];
        }
    }
}

fn brick_op(pix: &Pix, hsize: u32, vsize: u32, ops: &[Op]) -> MorphResult<Pix> {
    check_binary(pix)?;
    check_brick(hsize, vsize)?;
    if hsize == 1 && vsize == 1 {
        return Ok(pix.clone());
    }
    let (w, h) = (pix.width(), pix.height());
    let mut bits = unpack(pix);
    for &op in ops {
        sweep(&mut bits, w, h, hsize, true, op);
        sweep(&mut bits, w, h, vsize, false, op);
    }
    pack(&bits, pix)
}

/// Dilate a binary image with a brick SEL
///
/// Expands foreground regions by the brick extent.
pub fn dilate_brick(pix: &Pix, hsize: u32, vsize: u32) -> MorphResult<Pix> {
    brick_op(pix, hsize, vsize, &[Op::Dilate])
}

/// Erode a binary image with a brick SEL
///
/// A pixel survives only if the whole brick placed at it lies on
/// foreground inside the image.
pub fn erode_brick(pix: &Pix, hsize: u32, vsize: u32) -> MorphResult<Pix> {
    brick_op(pix, hsize, vsize, &[Op::Erode])
}

/// Open a binary image with a brick SEL
///
/// Opening = Erosion followed by Dilation.
/// Removes foreground objects into which the brick does not fit.
pub fn open_brick(pix: &Pix, hsize: u32, vsize: u32) -> MorphResult<Pix> {
    brick_op(pix, hsize, vsize, &[Op::Erode, Op::Dilate])
}

/// Close a binary image with a brick SEL
///
/// Closing = Dilation followed by Erosion.
/// Joins foreground separated by gaps narrower than the brick.
pub fn close_brick(pix: &Pix, hsize: u32, vsize: u32) -> MorphResult<Pix> {
    brick_op(pix, hsize, vsize, &[Op::Dilate, Op::Erode])
}

fn check_pair(pix1: &Pix, pix2: &Pix) -> MorphResult<()> {
    check_binary(pix1)?;
    check_binary(pix2)?;
    if !pix1.sizes_equal(pix2) {
        return Err(MorphError::InvalidParameters(format!(
            "image sizes differ: {}x{} vs {}x{}",
            pix1.width(),
            pix1.height(),
            pix2.width(),
            pix2.height()
        )));
    }
    Ok(())
}

/// Subtract two binary images (pix1 AND NOT pix2)
pub fn subtract(pix1: &Pix, pix2: &Pix) -> MorphResult<Pix> {
    check_pair(pix1, pix2)?;
    let mut out = pix1.to_mut();
    for (d, s) in out.data_mut().iter_mut().zip(pix2.data()) {
        *d &= !s;
    }
    Ok(out.into())
}

/// Union of two binary images (pix1 OR pix2)
pub fn union(pix1: &Pix, pix2: &Pix) -> MorphResult<Pix> {
    check_pair(pix1, pix2)?;
    let mut out = pix1.to_mut();
    for (d, s) in out.data_mut().iter_mut().zip(pix2.data()) {
        *d |= s;
    }
    Ok(out.into())
}
