use std::collections::HashMap;

use ndarray::{Array2, ArrayView2};

/// A connected blob of mask pixels.
#[derive(Clone, Debug)]
pub struct Blob {
    pub label: u32,
    /// Number of pixels in the blob.
    pub area: usize,
    /// Unweighted center of the blob's pixels as local (row, col).
    pub center: (f64, f64),
    /// Intensity-weighted centroid as local (row, col). Equals `center`
    /// when the blob carries no positive intensity.
    pub centroid: (f64, f64),
}

/// Label 4-connected regions of `mask` with two-pass union-find and measure
/// each one against `intensity`.
///
/// Returns one blob per region, sorted by area descending.
pub fn find_blobs(mask: &Array2<bool>, intensity: ArrayView2<'_, f64>) -> Vec<Blob> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 || intensity.dim() != (h, w) {
        return Vec::new();
    }

    let mut labels = Array2::<u32>::zeros((h, w));
    let mut next_label: u32 = 1;
    // Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0; h * w / 2 + 2];

    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };

            labels[[row, col]] = match (up > 0, left > 0) {
                (false, false) => {
                    if next_label as usize >= parent.len() {
                        parent.resize(parent.len() * 2, 0);
                    }
                    parent[next_label as usize] = next_label;
                    next_label += 1;
                    next_label - 1
                }
                (true, false) => up,
                (false, true) => left,
                (true, true) => {
                    let smaller = up.min(left);
                    if up != left {
                        union(&mut parent, smaller, up.max(left));
                    }
                    smaller
                }
            };
        }
    }

    for i in 1..next_label as usize {
        parent[i] = find(&parent, i as u32);
    }

    let mut sums = HashMap::<u32, BlobSums>::new();
    for ((row, col), &lbl) in labels.indexed_iter() {
        if lbl == 0 {
            continue;
        }
        let root = parent[lbl as usize];
        let v = intensity[[row, col]].max(0.0);
        let entry = sums.entry(root).or_default();
        entry.area += 1;
        entry.rows += row as f64;
        entry.cols += col as f64;
        entry.weighted_rows += row as f64 * v;
        entry.weighted_cols += col as f64 * v;
        entry.mass += v;
    }

    let mut blobs: Vec<Blob> = sums
        .into_iter()
        .map(|(label, s)| {
            let n = s.area as f64;
            let center = (s.rows / n, s.cols / n);
            let centroid = if s.mass > 0.0 {
                (s.weighted_rows / s.mass, s.weighted_cols / s.mass)
            } else {
                center
            };
            Blob {
                label,
                area: s.area,
                center,
                centroid,
            }
        })
        .collect();
    blobs.sort_unstable_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));
    blobs
}

#[derive(Default)]
struct BlobSums {
    area: usize,
    rows: f64,
    cols: f64,
    weighted_rows: f64,
    weighted_cols: f64,
    mass: f64,
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_separate_blobs() {
        let mut weights = Array2::<f64>::zeros((10, 10));
        for r in 1..3 {
            for c in 1..3 {
                weights[[r, c]] = 1.0;
            }
        }
        for r in 5..8 {
            for c in 5..8 {
                weights[[r, c]] = 2.0;
            }
        }
        let blobs = find_blobs(&weights.mapv(|v| v > 0.0), weights.view());
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].area, 9);
        assert!((blobs[0].centroid.0 - 6.0).abs() < 1e-12);
        assert!((blobs[0].centroid.1 - 6.0).abs() < 1e-12);
        assert_eq!(blobs[1].area, 4);
        assert!((blobs[1].center.0 - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_u_shape_merges() {
        // Two arms joined at the bottom row must resolve to one label.
        let mut weights = Array2::<f64>::zeros((4, 5));
        for r in 0..4 {
            weights[[r, 0]] = 1.0;
            weights[[r, 4]] = 1.0;
        }
        for c in 0..5 {
            weights[[3, c]] = 1.0;
        }
        let blobs = find_blobs(&weights.mapv(|v| v > 0.0), weights.view());
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 11);
    }
}
