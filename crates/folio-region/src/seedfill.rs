//! Seed fill operations
//!
//! Binary morphological reconstruction: grow a seed image under the
//! constraint of a mask until it stops changing. The result is every mask
//! component that touches a seed pixel.

use crate::conncomp::ConnectivityType;
use crate::error::{RegionError, RegionResult};
use folio_core::{Pix, PixelDepth};
use std::collections::VecDeque;

fn check_pair(seed: &Pix, mask: &Pix) -> RegionResult<()> {
    for pix in [seed, mask] {
        if pix.depth() != PixelDepth::Bit1 {
            return Err(RegionError::UnsupportedDepth {
                expected: "1-bit",
                actual: pix.depth().bits(),
            });
        }
    }
    if seed.width() != mask.width() || seed.height() != mask.height() {
        return Err(RegionError::InvalidParameters(
            "seed and mask must have same dimensions".to_string(),
        ));
    }
    Ok(())
}

/// Seed fill for binary images
///
/// Returns the mask components reachable from seed pixels that lie on the
/// mask. Seed pixels outside the mask are ignored.
///
/// # Arguments
///
/// * `seed` - Binary seed image (1-bit)
/// * `mask` - Binary mask image (1-bit), same size as `seed`
/// * `connectivity` - Connectivity used to grow the fill
pub fn seedfill_binary(
    seed: &Pix,
    mask: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<Pix> {
    check_pair(seed, mask)?;

    let (width, height) = (mask.width(), mask.height());
    let mut output = Pix::new(width, height, PixelDepth::Bit1)?.to_mut();
    output.copy_resolution_from(mask);

    let mut queue = VecDeque::new();
    for y in 0..height {
        for x in 0..width {
            if seed.get_pixel_unchecked(x, y) != 0 && mask.get_pixel_unchecked(x, y) != 0 {
                output.set_pixel_unchecked(x, y, 1);
                queue.push_back((x, y));
            }
        }
    }

    let offsets: &[(i32, i32)] = match connectivity {
        ConnectivityType::FourWay => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
        ConnectivityType::EightWay => &[
            (-1, 0),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (1, -1),
            (-1, 1),
            (1, 1),
        ],
    };

    while let Some((x, y)) = queue.pop_front() {
        for &(dx, dy) in offsets {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if mask.get_pixel_unchecked(nx, ny) != 0 && output.get_pixel(nx, ny) == Some(0) {
                output.set_pixel_unchecked(nx, ny, 1);
                queue.push_back((nx, ny));
            }
        }
    }

    Ok(output.into())
}

/// Remove every mask component that touches a seed pixel
///
/// This is `mask AND NOT seedfill_binary(seed, mask)`.
pub fn remove_seeded_components(
    seed: &Pix,
    mask: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<Pix> {
    let filled = seedfill_binary(seed, mask, connectivity)?;
    let mut out = mask.to_mut();
    for (d, s) in out.data_mut().iter_mut().zip(filled.data()) {
        *d &= !s;
    }
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(w: u32, h: u32, on: &[(u32, u32)]) -> Pix {
        let mut pm = Pix::new(w, h, PixelDepth::Bit1).unwrap().to_mut();
        for &(x, y) in on {
            pm.set_pixel(x, y, 1).unwrap();
        }
        pm.into()
    }

    #[test]
    fn test_fill_reaches_whole_component() {
        let mask = binary(6, 3, &[(0, 0), (1, 0), (2, 0), (5, 2)]);
        let seed = binary(6, 3, &[(2, 0)]);
        let filled = seedfill_binary(&seed, &mask, ConnectivityType::FourWay).unwrap();
        assert_eq!(filled.get_pixel(0, 0), Some(1));
        assert_eq!(filled.get_pixel(5, 2), Some(0));
    }

    #[test]
    fn test_seed_outside_mask_ignored() {
        let mask = binary(4, 4, &[(0, 0)]);
        let seed = binary(4, 4, &[(3, 3)]);
        let filled = seedfill_binary(&seed, &mask, ConnectivityType::EightWay).unwrap();
        assert!(filled.equals(&Pix::new(4, 4, PixelDepth::Bit1).unwrap()));
    }

    #[test]
    fn test_remove_seeded() {
        let mask = binary(6, 6, &[(0, 0), (1, 1), (4, 4), (5, 5)]);
        let seed = binary(6, 6, &[(0, 0)]);
        let rest = remove_seeded_components(&seed, &mask, ConnectivityType::EightWay).unwrap();
        assert_eq!(rest.get_pixel(1, 1), Some(0));
        assert_eq!(rest.get_pixel(4, 4), Some(1));
        assert_eq!(rest.get_pixel(5, 5), Some(1));
    }

    #[test]
    fn test_size_mismatch() {
        let a = Pix::new(4, 4, PixelDepth::Bit1).unwrap();
        let b = Pix::new(5, 4, PixelDepth::Bit1).unwrap();
        assert!(seedfill_binary(&a, &b, ConnectivityType::FourWay).is_err());
    }
}
