//! Connected component analysis
//!
//! This module provides functions for finding and labeling connected components
//! in binary images. It uses a two-pass scan with a Union-Find (disjoint set)
//! structure for label equivalences.

use crate::error::{RegionError, RegionResult};
use folio_core::{Pix, PixelDepth};

/// Connectivity type for component analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityType {
    /// 4-way connectivity (up, down, left, right)
    #[default]
    FourWay,
    /// 8-way connectivity (includes diagonals)
    EightWay,
}

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    /// One past the rightmost column.
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
}

/// A connected component in an image
#[derive(Debug, Clone)]
pub struct ConnectedComponent {
    /// Label of this component in the label map (starting at 1)
    pub label: u32,
    /// Number of pixels in this component
    pub pixel_count: u32,
    /// Bounding box of this component
    pub bounds: BoundingBox,
}

/// Label map of a binary image
///
/// Label 0 is background; components are labeled `1..=components.len()` in
/// raster order of their first pixel.
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    /// The labeled components, indexed by `label - 1`
    pub components: Vec<ConnectedComponent>,
}

impl ComponentLabels {
    /// Label at (x, y), 0 for background or out of range.
    #[inline]
    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.labels[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Get the image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Disjoint-set forest over provisional labels
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        // index 0 is the background
        Self { parent: vec![0] }
    }

    fn make(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut a: u32) -> u32 {
        while self.parent[a as usize] != a {
            let grand = self.parent[self.parent[a as usize] as usize];
            self.parent[a as usize] = grand;
            a = grand;
        }
        a
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi as usize] = lo;
        }
    }
}

/// Label all connected components in a binary image
pub fn label_connected_components(
    pix: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<ComponentLabels> {
    if pix.depth() != PixelDepth::Bit1 {
        return Err(RegionError::UnsupportedDepth {
            expected: "1-bit",
            actual: pix.depth().bits(),
        });
    }

    let (w, h) = (pix.width(), pix.height());
    let wu = w as usize;
    let mut labels = vec![0u32; wu * (h as usize)];
    let mut uf = UnionFind::new();

    // First pass: provisional labels from already-visited neighbors
    for y in 0..h {
        for x in 0..w {
            if pix.get_pixel_unchecked(x, y) == 0 {
                continue;
            }
            let idx = (y as usize) * wu + x as usize;
            let mut neighbors = [0u32; 4];
            let mut n = 0;
            if x > 0 {
                neighbors[n] = labels[idx - 1];
                n += 1;
            }
            if y > 0 {
                neighbors[n] = labels[idx - wu];
                n += 1;
                if connectivity == ConnectivityType::EightWay {
                    if x > 0 {
                        neighbors[n] = labels[idx - wu - 1];
                        n += 1;
                    }
                    if x + 1 < w {
                        neighbors[n] = labels[idx - wu + 1];
                        n += 1;
                    }
                }
            }

            let mut current = 0;
            for &nb in neighbors[..n].iter().filter(|&&l| l != 0) {
                if current == 0 {
                    current = nb;
                } else {
                    uf.union(current, nb);
                }
            }
            labels[idx] = if current == 0 { uf.make() } else { current };
        }
    }

    // Second pass: resolve equivalences to consecutive final labels
    let mut remap = vec![0u32; uf.parent.len()];
    let mut components: Vec<ConnectedComponent> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let idx = (y as usize) * wu + x as usize;
            if labels[idx] == 0 {
                continue;
            }
            let root = uf.find(labels[idx]) as usize;
            if remap[root] == 0 {
                components.push(ConnectedComponent {
                    label: components.len() as u32 + 1,
                    pixel_count: 0,
                    bounds: BoundingBox { x, y, w: 1, h: 1 },
                });
                remap[root] = components.len() as u32;
            }
            let label = remap[root];
            labels[idx] = label;

            let comp = &mut components[(label - 1) as usize];
            comp.pixel_count += 1;
            let b = &mut comp.bounds;
            let (x0, y0) = (b.x.min(x), b.y.min(y));
            let (x1, y1) = (b.right().max(x + 1), b.bottom().max(y + 1));
            *b = BoundingBox {
                x: x0,
                y: y0,
                w: x1 - x0,
                h: y1 - y0,
            };
        }
    }

    Ok(ComponentLabels {
        width: w,
        height: h,
        labels,
        components,
    })
}

/// Find all connected components in a binary image
///
/// Returns a vector of connected components, each with a label, pixel count,
/// and bounding box.
pub fn find_connected_components(
    pix: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<Vec<ConnectedComponent>> {
    Ok(label_connected_components(pix, connectivity)?.components)
}
