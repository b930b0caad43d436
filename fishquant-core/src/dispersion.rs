//! Spatial dispersion of cluster centroids: grid occupancy, centroid hull
//! area and the maximum inter-centroid distance (ICDmax).

use ndarray::{s, Array2};

use crate::geometry::{hull_area, max_pairwise_distance, Point};

/// Grid box side length bounds, in pixels.
pub const MIN_GRID_BOX_SIZE: usize = 5;
pub const MAX_GRID_BOX_SIZE: usize = 999;
pub const DEFAULT_GRID_BOX_SIZE: usize = 50;

/// Dispersion metrics for one image's retained cluster centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionMetrics {
    /// Number of grid boxes the image divides into
    pub total_grid_boxes: usize,
    /// Boxes containing at least one centroid
    pub positive_grid_boxes: usize,
    /// Convex hull area of the centroids (0 for fewer than 3)
    pub hull_area: f64,
    /// Maximum pairwise centroid distance (ICDmax)
    pub max_centroid_distance: f64,
}

/// Analyse the spatial spread of centroids over an image of `(rows, cols)`.
///
/// The image is partitioned into `rows / box_size` by `cols / box_size`
/// whole boxes; the remainder strip along each axis is absorbed into the
/// last box so no centroid falls outside the grid. Degenerate centroid sets
/// follow the geometry-module conventions: two points have zero hull area
/// but a real distance, one or zero points have both at zero.
pub fn analyze_dispersion(
    centroids: &[(usize, usize)],
    dims: (usize, usize),
    box_size: usize,
) -> DispersionMetrics {
    let (rows, cols) = dims;

    // Occupancy map with one mark per centroid
    let mut occupancy = Array2::from_elem((rows, cols), false);
    for &(row, col) in centroids {
        if row < rows && col < cols {
            occupancy[[row, col]] = true;
        }
    }

    let boxes_down = rows / box_size;
    let boxes_across = cols / box_size;
    let total_grid_boxes = boxes_down * boxes_across;

    let mut positive_grid_boxes = 0;
    for by in 0..boxes_down {
        for bx in 0..boxes_across {
            let row_end = if by + 1 == boxes_down {
                rows
            } else {
                (by + 1) * box_size
            };
            let col_end = if bx + 1 == boxes_across {
                cols
            } else {
                (bx + 1) * box_size
            };
            let window = occupancy.slice(s![by * box_size..row_end, bx * box_size..col_end]);
            if window.iter().any(|&occupied| occupied) {
                positive_grid_boxes += 1;
            }
        }
    }

    let points: Vec<Point> = centroids
        .iter()
        .map(|&(row, col)| (row as f64, col as f64))
        .collect();

    DispersionMetrics {
        total_grid_boxes,
        positive_grid_boxes,
        hull_area: hull_area(&points),
        max_centroid_distance: max_pairwise_distance(&points),
    }
}
