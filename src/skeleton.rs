//! Medial path extraction.
//!
//! The shape is thinned to a one-pixel-wide skeleton (Zhang-Suen), then the
//! skeleton's longest branch is found with two breadth-first passes: the
//! farthest pixel `u` from any endpoint, then the farthest pixel `v` from
//! `u`. The `u -> v` predecessor chain is the diameter of the skeleton tree;
//! short spurs hanging off it are dropped.
//!
//! Zhang-Suen erodes strokes exactly two pixels thick along a diagonal down
//! to a few isolated pixels, so such shapes come back as a very short path.
//! Thicken or pre-dilate thin diagonal strokes before using Path mode.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use kurbo::Point;

use crate::error::DotsError;

/// 8-neighbourhood offsets, clockwise from north: P2..P9 in Zhang-Suen terms.
const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Boolean raster, row-major, y-down.
#[derive(Debug, Clone)]
pub struct Bitmap {
    data: Vec<bool>,
    width: i32,
    height: i32,
}

impl Bitmap {
    /// Create from a binary GrayImage (non-zero = foreground).
    #[cfg(test)]
    pub fn from_gray(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Bitmap {
            data: img.pixels().map(|p| p.0[0] > 0).collect(),
            width: w as i32,
            height: h as i32,
        }
    }

    /// Pixel at (x, y). Out-of-bounds = false.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        self.data[self.index(x, y)]
    }

    fn set(&mut self, x: i32, y: i32, value: bool) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    fn coords(&self, idx: usize) -> (i32, i32) {
        (idx as i32 % self.width, idx as i32 / self.width)
    }

    /// Number of set pixels among the 8 neighbours of (x, y).
    pub fn neighbour_count(&self, x: i32, y: i32) -> usize {
        RING.iter()
            .filter(|&&(dx, dy)| self.get(x + dx, y + dy))
            .count()
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }
}

/// Keep only the 8-connected component that contains `seed`.
pub fn isolate_component(mask: &GrayImage, seed: Point) -> Bitmap {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let (sx, sy) = (seed.x as u32, seed.y as u32);
    let target = if sx < labels.width() && sy < labels.height() {
        labels.get_pixel(sx, sy).0[0]
    } else {
        0
    };
    let (w, h) = mask.dimensions();
    Bitmap {
        data: labels.pixels().map(|p| target != 0 && p.0[0] == target).collect(),
        width: w as i32,
        height: h as i32,
    }
}

/// Zhang-Suen thinning.
///
/// Peels boundary pixels in two alternating sub-iterations until nothing
/// changes, leaving a one-pixel-wide, connectivity-preserving skeleton.
pub fn thin(bitmap: &Bitmap) -> Bitmap {
    let mut skel = bitmap.clone();
    let mut to_clear: Vec<(i32, i32)> = Vec::new();

    loop {
        let mut changed = false;
        for step in 0..2 {
            to_clear.clear();
            for y in 0..skel.height {
                for x in 0..skel.width {
                    if skel.get(x, y) && deletable(&skel, x, y, step) {
                        to_clear.push((x, y));
                    }
                }
            }
            for &(x, y) in &to_clear {
                skel.set(x, y, false);
            }
            changed |= !to_clear.is_empty();
        }
        if !changed {
            break;
        }
    }
    skel
}

fn deletable(skel: &Bitmap, x: i32, y: i32, step: usize) -> bool {
    let p: [bool; 8] = RING.map(|(dx, dy)| skel.get(x + dx, y + dy));

    let b = p.iter().filter(|&&v| v).count();
    if !(2..=6).contains(&b) {
        return false;
    }

    // 0 -> 1 transitions around the ring P2, P3, ..., P9, P2.
    let a = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
    if a != 1 {
        return false;
    }

    let (p2, p4, p6, p8) = (p[0], p[2], p[4], p[6]);
    if step == 0 {
        !(p2 && p4 && p6) && !(p4 && p6 && p8)
    } else {
        !(p2 && p4 && p8) && !(p2 && p6 && p8)
    }
}

/// Skeleton pixels with exactly one 8-connected neighbour, in raster order.
pub fn endpoints(skel: &Bitmap) -> Vec<(i32, i32)> {
    let mut found = Vec::new();
    for y in 0..skel.height {
        for x in 0..skel.width {
            if skel.get(x, y) && skel.neighbour_count(x, y) == 1 {
                found.push((x, y));
            }
        }
    }
    found
}

/// Breadth-first distances and predecessors over skeleton pixels.
#[derive(Debug)]
pub struct Traversal {
    /// Hop count from the start, or -1 if unreachable.
    pub distances: Vec<i32>,
    /// Flat index of the previous pixel on the shortest path.
    pub predecessors: Vec<Option<usize>>,
}

impl Traversal {
    /// Farthest reachable pixel (first in raster order on ties).
    pub fn farthest(&self) -> usize {
        let mut best = 0;
        for (i, &d) in self.distances.iter().enumerate() {
            if d > self.distances[best] {
                best = i;
            }
        }
        best
    }
}

/// BFS from `start` with an array-backed FIFO sized to the pixel count.
pub fn bfs(skel: &Bitmap, start: (i32, i32)) -> Traversal {
    let n = (skel.width * skel.height) as usize;
    let mut distances = vec![-1i32; n];
    let mut predecessors = vec![None; n];
    let mut queue = vec![0usize; n];
    let (mut head, mut tail) = (0usize, 0usize);

    let start_idx = skel.index(start.0, start.1);
    distances[start_idx] = 0;
    queue[tail] = start_idx;
    tail += 1;

    while head < tail {
        let idx = queue[head];
        head += 1;
        let (x, y) = skel.coords(idx);
        for (dx, dy) in RING {
            let (nx, ny) = (x + dx, y + dy);
            if !skel.get(nx, ny) {
                continue;
            }
            let nidx = skel.index(nx, ny);
            if distances[nidx] < 0 {
                distances[nidx] = distances[idx] + 1;
                predecessors[nidx] = Some(idx);
                queue[tail] = nidx;
                tail += 1;
            }
        }
    }

    Traversal {
        distances,
        predecessors,
    }
}

/// Walk predecessors back from `end`, returned start-first.
fn reconstruct(skel: &Bitmap, traversal: &Traversal, end: usize) -> Vec<Point> {
    let mut path = Vec::new();
    let mut current = Some(end);
    while let Some(idx) = current {
        let (x, y) = skel.coords(idx);
        path.push(Point::new(x as f64, y as f64));
        current = traversal.predecessors[idx];
    }
    path.reverse();
    path
}

/// Longest branch of a skeleton, ordered from one end to the other.
pub fn longest_branch(skel: &Bitmap) -> Result<Vec<Point>, DotsError> {
    let ends = endpoints(skel);
    let &start = ends.first().ok_or(DotsError::NoEndpoints)?;
    log::debug!("skeleton: {} pixels, {} endpoints", skel.count(), ends.len());

    let first = bfs(skel, start);
    let u = skel.coords(first.farthest());
    let second = bfs(skel, u);
    let v = second.farthest();
    Ok(reconstruct(skel, &second, v))
}
