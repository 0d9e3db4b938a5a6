// 4-connected region labeling with per-region morphometrics.
//
// Labeling runs in two passes: a forward scan assigns provisional labels and
// records equivalence edges between colliding labels, then the connected
// components of the equivalence graph are resolved with an iterative
// depth-first search and every pixel is remapped to its final label.

use crate::errors::{Result, WingMorphError};
use crate::geometry::Point;

/// Binary foreground mask
#[derive(Debug, Clone)]
pub struct BinaryRaster {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl BinaryRaster {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<BinaryRaster> {
        if data.len() != width * height {
            return Err(WingMorphError::InvalidInput(format!(
                "raster data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(BinaryRaster {
            width,
            height,
            data,
        })
    }

    pub fn from_fn<F: Fn(usize, usize) -> bool>(width: usize, height: usize, f: F) -> BinaryRaster {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        BinaryRaster {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_foreground(&self, x: usize, y: usize) -> bool {
        self.data[x + y * self.width]
    }
}

/// Raster of final region labels; 0 denotes the background
#[derive(Debug, Clone)]
pub struct LabeledRaster {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    n_labels: u32,
}

impl LabeledRaster {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of regions; label ids are 1..=n_labels
    pub fn n_labels(&self) -> u32 {
        self.n_labels
    }

    #[inline]
    pub fn label(&self, x: usize, y: usize) -> u32 {
        self.labels[x + y * self.width]
    }
}

/// Axis-aligned bounding box in pixel coordinates, inclusive on all sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: usize,
    pub y_min: usize,
    pub x_max: usize,
    pub y_max: usize,
}

/// Result of fitting an ellipse to a labeled region
#[derive(Debug, Clone, Copy)]
pub struct EllipseFit {
    pub angle: f64,
    pub center: Point,
    pub major_axis: f64,
    pub minor_axis: f64,
}

/// External collaborator that fits an ellipse to one labeled region given
/// its extremes. Fitting internals are outside this crate.
pub trait EllipseFitter {
    fn fit(&self, raster: &LabeledRaster, label: u32, bbox: &BoundingBox) -> EllipseFit;
}

/// Morphometric features of one labeled region
#[derive(Debug, Clone)]
pub struct RegionStats {
    pub label: u32,
    /// Pixel count
    pub area: usize,
    /// Count of boundary-contact background pixels, not Euclidean length
    pub perimeter: usize,
    pub bounding_box: BoundingBox,
    /// True when the bounding box touches the raster border
    pub is_unbounded: bool,
    pub ellipse: Option<EllipseFit>,
}

/// Labeled raster together with the per-region statistics.
///
/// `interface_lengths` is a symmetric (n_labels+1)^2 matrix indexed by label
/// id; row and column 0 belong to the background.
#[derive(Debug, Clone)]
pub struct LabelingResult {
    pub raster: LabeledRaster,
    pub stats: Vec<RegionStats>,
    pub interface_lengths: Vec<Vec<u32>>,
}

impl LabelingResult {
    /// Shared-boundary pixel count between two labels
    pub fn interface_length(&self, a: u32, b: u32) -> u32 {
        self.interface_lengths[a as usize][b as usize]
    }

    /// Statistics for a label id (1-based); the background has none
    pub fn stats_for(&self, label: u32) -> Option<&RegionStats> {
        if label == 0 {
            return None;
        }
        self.stats.get(label as usize - 1)
    }

    /// Runs the external ellipse fitter over every region
    pub fn fit_ellipses(&mut self, fitter: &dyn EllipseFitter) {
        for stats in &mut self.stats {
            stats.ellipse = Some(fitter.fit(&self.raster, stats.label, &stats.bounding_box));
        }
    }
}

/// Labels the 4-connected components of a binary raster and computes their
/// morphometric features.
pub fn label_regions(raster: &BinaryRaster) -> Result<LabelingResult> {
    if raster.width == 0 || raster.height == 0 {
        return Err(WingMorphError::InvalidInput(
            "raster has zero width or height".to_string(),
        ));
    }

    let width = raster.width;
    let height = raster.height;

    // forward scan with provisional labels; only the already-visited left
    // and up neighbors participate
    let mut provisional = vec![0u32; width * height];
    let mut edges: Vec<(u32, u32)> = Vec::new();
    let mut next_label = 1u32;

    for y in 0..height {
        for x in 0..width {
            if !raster.is_foreground(x, y) {
                continue;
            }
            let left = if x > 0 { provisional[x - 1 + y * width] } else { 0 };
            let up = if y > 0 { provisional[x + (y - 1) * width] } else { 0 };
            let value = match (left, up) {
                (0, 0) => {
                    let l = next_label;
                    next_label += 1;
                    l
                }
                (l, 0) => l,
                (0, u) => u,
                (l, u) => {
                    if l != u {
                        edges.push((l.min(u), l.max(u)));
                    }
                    l
                }
            };
            provisional[x + y * width] = value;
        }
    }

    let final_of = resolve_equivalences(next_label, &edges);
    let n_labels = *final_of.iter().max().unwrap_or(&0);

    let mut labels = vec![0u32; width * height];
    for (pixel, &p) in provisional.iter().enumerate() {
        labels[pixel] = final_of[p as usize];
    }

    let raster = LabeledRaster {
        width,
        height,
        labels,
        n_labels,
    };

    let mut stats = compute_region_stats(&raster);
    let interface_lengths = compute_boundary_contacts(&raster);
    for (label, perimeter) in interface_perimeters(&raster).into_iter().enumerate() {
        if label >= 1 {
            stats[label - 1].perimeter = perimeter;
        }
    }

    Ok(LabelingResult {
        raster,
        stats,
        interface_lengths,
    })
}

/// Maps every provisional label to its final label.
///
/// Components of the equivalence graph are discovered by an iterative DFS
/// over the vertices in ascending order; final labels are assigned in
/// discovery order starting at 1. Index 0 (background) maps to 0.
fn resolve_equivalences(next_label: u32, edges: &[(u32, u32)]) -> Vec<u32> {
    let n_vertices = next_label as usize;
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); n_vertices];
    for &(a, b) in edges {
        adjacency[a as usize].push(b);
        adjacency[b as usize].push(a);
    }

    let mut final_of = vec![0u32; n_vertices];
    let mut visited = vec![false; n_vertices];
    let mut stack: Vec<u32> = Vec::new();
    let mut component = 0u32;

    for v in 1..n_vertices {
        if visited[v] {
            continue;
        }
        component += 1;
        stack.push(v as u32);
        while let Some(u) = stack.pop() {
            let u = u as usize;
            if visited[u] {
                continue;
            }
            visited[u] = true;
            final_of[u] = component;
            for &w in &adjacency[u] {
                if !visited[w as usize] {
                    stack.push(w);
                }
            }
        }
    }
    final_of
}

/// Bounding boxes, areas and unboundedness in linear passes
fn compute_region_stats(raster: &LabeledRaster) -> Vec<RegionStats> {
    let n = raster.n_labels as usize;
    let width = raster.width;
    let height = raster.height;

    let mut x_min = vec![width; n];
    let mut y_min = vec![height; n];
    let mut x_max = vec![0usize; n];
    let mut y_max = vec![0usize; n];
    let mut areas = vec![0usize; n];

    for y in 0..height {
        for x in 0..width {
            let label = raster.label(x, y);
            if label == 0 {
                continue;
            }
            let i = label as usize - 1;
            areas[i] += 1;
            if x < x_min[i] {
                x_min[i] = x;
            }
            if y < y_min[i] {
                y_min[i] = y;
            }
            if x > x_max[i] {
                x_max[i] = x;
            }
            if y > y_max[i] {
                y_max[i] = y;
            }
        }
    }

    (0..n)
        .map(|i| {
            let bounding_box = BoundingBox {
                x_min: x_min[i],
                y_min: y_min[i],
                x_max: x_max[i],
                y_max: y_max[i],
            };
            let is_unbounded = bounding_box.x_min == 0
                || bounding_box.y_min == 0
                || bounding_box.x_max == width - 1
                || bounding_box.y_max == height - 1;
            RegionStats {
                label: i as u32 + 1,
                area: areas[i],
                perimeter: 0,
                bounding_box,
                is_unbounded,
                ellipse: None,
            }
        })
        .collect()
}

/// Perimeter counters from the 3x3 boundary-contact windows
fn interface_perimeters(raster: &LabeledRaster) -> Vec<usize> {
    let n = raster.n_labels as usize + 1;
    let mut perimeters = vec![0usize; n];
    let mut touching = vec![false; n];

    for_each_contact_window(raster, |window| {
        for &label in window {
            touching[label as usize] = true;
        }
        for (label, flag) in touching.iter_mut().enumerate() {
            if *flag {
                if label >= 1 {
                    perimeters[label] += 1;
                }
                *flag = false;
            }
        }
    });
    perimeters
}

/// Symmetric matrix of shared-boundary pixel counts
fn compute_boundary_contacts(raster: &LabeledRaster) -> Vec<Vec<u32>> {
    let n = raster.n_labels as usize + 1;
    let mut matrix = vec![vec![0u32; n]; n];
    let mut touching = vec![false; n];

    for_each_contact_window(raster, |window| {
        for &label in window {
            touching[label as usize] = true;
        }
        for k1 in 0..n {
            if !touching[k1] {
                continue;
            }
            for k2 in k1..n {
                if touching[k2] {
                    matrix[k1][k2] += 1;
                    matrix[k2][k1] += 1;
                }
            }
        }
        for flag in touching.iter_mut() {
            *flag = false;
        }
    });
    matrix
}

/// Slides a 3x3 window over every background pixel that is not on the outer
/// border and hands the window's labels to the visitor.
fn for_each_contact_window<F: FnMut(&[u32; 9])>(raster: &LabeledRaster, mut visit: F) {
    let width = raster.width;
    let height = raster.height;
    if width < 3 || height < 3 {
        return;
    }
    let mut window = [0u32; 9];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if raster.label(x, y) != 0 {
                continue;
            }
            let mut k = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    window[k] = raster.label(x + dx - 1, y + dy - 1);
                    k += 1;
                }
            }
            visit(&window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_from_rows(rows: &[&str]) -> BinaryRaster {
        let height = rows.len();
        let width = rows[0].len();
        BinaryRaster::from_fn(width, height, |x, y| {
            rows[y].as_bytes()[x] == b'#'
        })
    }

    #[test]
    fn zero_sized_raster_is_invalid_input() {
        let raster = BinaryRaster::new(0, 0, Vec::new()).unwrap();
        assert!(matches!(
            label_regions(&raster),
            Err(WingMorphError::InvalidInput(_))
        ));
    }

    #[test]
    fn all_background_raster_yields_no_labels() {
        let raster = BinaryRaster::from_fn(10, 10, |_, _| false);
        let result = label_regions(&raster).unwrap();
        assert_eq!(result.raster.n_labels(), 0);
        assert!(result.stats.is_empty());
    }

    #[test]
    fn centered_block_is_a_single_bounded_region() {
        let raster = BinaryRaster::from_fn(10, 10, |x, y| (3..6).contains(&x) && (3..6).contains(&y));
        let result = label_regions(&raster).unwrap();
        assert_eq!(result.raster.n_labels(), 1);
        let stats = result.stats_for(1).unwrap();
        assert_eq!(stats.area, 9);
        assert_eq!(
            stats.bounding_box,
            BoundingBox {
                x_min: 3,
                y_min: 3,
                x_max: 5,
                y_max: 5
            }
        );
        assert!(!stats.is_unbounded);
    }

    #[test]
    fn diagonal_pixels_are_separate_regions() {
        let raster = raster_from_rows(&[
            ".....",
            ".#...",
            "..#..",
            ".....",
        ]);
        let result = label_regions(&raster).unwrap();
        assert_eq!(result.raster.n_labels(), 2);
        assert_ne!(result.raster.label(1, 1), result.raster.label(2, 2));
    }

    #[test]
    fn u_shape_merges_into_one_region() {
        // the two vertical arms get distinct provisional labels that must be
        // merged through the bottom row
        let raster = raster_from_rows(&[
            ".......",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let result = label_regions(&raster).unwrap();
        assert_eq!(result.raster.n_labels(), 1);
        assert_eq!(result.stats_for(1).unwrap().area, 9);
    }

    #[test]
    fn labels_are_dense_and_areas_sum_to_foreground_count() {
        let raster = raster_from_rows(&[
            "##..##..#",
            "##..##...",
            ".........",
            "####..###",
        ]);
        let result = label_regions(&raster).unwrap();
        let n = result.raster.n_labels();
        assert_eq!(n, 5);

        let mut seen = vec![false; n as usize + 1];
        let mut foreground = 0usize;
        for y in 0..raster.height() {
            for x in 0..raster.width() {
                let label = result.raster.label(x, y);
                assert_eq!(raster.is_foreground(x, y), label != 0);
                if label != 0 {
                    seen[label as usize] = true;
                    foreground += 1;
                }
            }
        }
        assert!(seen[1..].iter().all(|&s| s));

        let total: usize = result.stats.iter().map(|s| s.area).sum();
        assert_eq!(total, foreground);
    }

    #[test]
    fn connected_pixels_share_labels_and_disconnected_do_not() {
        let raster = raster_from_rows(&[
            "##....",
            ".#....",
            "....##",
            "....#.",
        ]);
        let result = label_regions(&raster).unwrap();
        assert_eq!(result.raster.n_labels(), 2);
        assert_eq!(result.raster.label(0, 0), result.raster.label(1, 1));
        assert_ne!(result.raster.label(0, 0), result.raster.label(4, 2));
    }

    #[test]
    fn interface_matrix_is_symmetric() {
        let raster = raster_from_rows(&[
            "........",
            ".##.##..",
            ".##.##..",
            "........",
        ]);
        let result = label_regions(&raster).unwrap();
        let n = result.interface_lengths.len();
        for a in 0..n {
            for b in 0..n {
                assert_eq!(
                    result.interface_lengths[a][b],
                    result.interface_lengths[b][a]
                );
            }
        }
        // the two blocks share background contact pixels between them
        assert!(result.interface_length(1, 2) > 0);
    }

    #[test]
    fn border_touching_region_is_unbounded() {
        let raster = BinaryRaster::from_fn(6, 6, |x, y| x == 0 && y < 3);
        let result = label_regions(&raster).unwrap();
        assert!(result.stats_for(1).unwrap().is_unbounded);
    }

    #[test]
    fn ellipse_fitting_is_delegated() {
        struct StubFitter;
        impl EllipseFitter for StubFitter {
            fn fit(&self, _raster: &LabeledRaster, label: u32, bbox: &BoundingBox) -> EllipseFit {
                EllipseFit {
                    angle: label as f64,
                    center: Point::new(
                        (bbox.x_min + bbox.x_max) as f64 / 2.0,
                        (bbox.y_min + bbox.y_max) as f64 / 2.0,
                    ),
                    major_axis: 1.0,
                    minor_axis: 1.0,
                }
            }
        }

        let raster = BinaryRaster::from_fn(10, 10, |x, y| (3..6).contains(&x) && (3..6).contains(&y));
        let mut result = label_regions(&raster).unwrap();
        result.fit_ellipses(&StubFitter);
        let fit = result.stats_for(1).unwrap().ellipse.unwrap();
        assert_eq!(fit.angle, 1.0);
        assert_eq!(fit.center, Point::new(4.0, 4.0));
    }
}
