//! Cluster extraction: connected regions of above-threshold staining,
//! size filtering, peak counting and per-cluster morphometrics.

use ndarray::{Array2, ArrayView2};

/// A connected region of positive staining retained after size filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// 1-based rank; label order by default, intensity order after Fluor50 ranking
    pub id: usize,
    /// Centroid as `(row, col)`, truncated to whole pixels
    pub centroid: (usize, usize),
    /// Pixel count
    pub area: usize,
    /// Brightest pixel in the cluster
    pub max_intensity: u16,
    /// Dimmest (nonzero) pixel in the cluster
    pub min_intensity: u16,
    /// Mean pixel intensity
    pub mean_intensity: f64,
    /// `area * mean_intensity`
    pub integrated_intensity: f64,
}

/// Whole-image cluster metrics plus the retained clusters themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAnalysis {
    /// Count of all connected components, including sub-minimum ones
    pub num_clusters: u32,
    /// Count of connected local-maximum groups above threshold
    pub num_peaks: u32,
    /// Components meeting the minimum area
    pub target_clusters: u32,
    /// Peak groups within the retained components
    pub num_target_peaks: u32,
    /// Integrated intensity restricted to retained components
    pub intint_filtered: u64,
    /// Positive pixel count restricted to retained components
    pub count_filtered: usize,
    /// Retained clusters in label order, ids 1-based
    pub clusters: Vec<Cluster>,
}

/// Label 4-connected components of a binary mask.
///
/// Returns the label image (0 = background, labels start at 1) and the
/// number of components found. Flood fill with an explicit stack, so deep
/// regions cannot overflow the call stack.
pub fn label_components(mask: ArrayView2<bool>) -> (Array2<u32>, u32) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::zeros((rows, cols));
    let mut label_counter = 0u32;

    // 4-connectivity neighbour offsets
    let neighbors = [(-1, 0), (1, 0), (0, -1), (0, 1)];

    for i in 0..rows {
        for j in 0..cols {
            if mask[[i, j]] && labels[[i, j]] == 0 {
                label_counter += 1;
                let mut stack = vec![(i, j)];

                while let Some((y, x)) = stack.pop() {
                    if !mask[[y, x]] || labels[[y, x]] != 0 {
                        continue;
                    }
                    labels[[y, x]] = label_counter;

                    for &(dy, dx) in &neighbors {
                        let ny = y as isize + dy;
                        let nx = x as isize + dx;
                        if ny >= 0 && ny < rows as isize && nx >= 0 && nx < cols as isize {
                            let ny = ny as usize;
                            let nx = nx as usize;
                            if mask[[ny, nx]] && labels[[ny, nx]] == 0 {
                                stack.push((ny, nx));
                            }
                        }
                    }
                }
            }
        }
    }

    (labels, label_counter)
}

/// Mark local intensity maxima exceeding `threshold`.
///
/// A pixel qualifies when it is strictly above the threshold and no 8-neighbour
/// is brighter. Plateaus of equal-valued maxima are therefore all marked;
/// counting them as peak groups merges touching plateaus into one peak, which
/// over-counts conservatively and is the accepted behaviour here rather than a
/// true peak-finding algorithm.
pub fn local_maxima(plane: ArrayView2<u16>, threshold: u32) -> Array2<bool> {
    let (rows, cols) = plane.dim();
    let mut maxima = Array2::from_elem((rows, cols), false);

    for i in 0..rows {
        for j in 0..cols {
            let value = plane[[i, j]];
            if u32::from(value) <= threshold {
                continue;
            }
            let mut is_peak = true;
            'neighbours: for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dy == 0 && dx == 0 {
                        continue;
                    }
                    let ny = i as isize + dy;
                    let nx = j as isize + dx;
                    if ny >= 0 && ny < rows as isize && nx >= 0 && nx < cols as isize {
                        if plane[[ny as usize, nx as usize]] > value {
                            is_peak = false;
                            break 'neighbours;
                        }
                    }
                }
            }
            maxima[[i, j]] = is_peak;
        }
    }

    maxima
}

/// Number of connected groups of local maxima above `threshold`.
pub fn count_peak_groups(plane: ArrayView2<u16>, threshold: u32) -> u32 {
    let maxima = local_maxima(plane, threshold);
    let (_, groups) = label_components(maxima.view());
    groups
}

/// Run the full cluster extraction over a thresholded intensity plane.
///
/// `plane` is expected to already be masked (below-threshold pixels zeroed);
/// components are formed from its nonzero pixels. Components with
/// `area >= minimum_area` are retained, and the filtered intensity, pixel and
/// peak metrics are recomputed against only those. The extraction is a pure
/// function of its inputs, so repeated runs yield identical results.
pub fn analyze_clusters(
    plane: &Array2<u16>,
    threshold: u32,
    minimum_area: usize,
) -> ClusterAnalysis {
    let mask = plane.mapv(|p| p > 0);
    let (labels, num_clusters) = label_components(mask.view());

    let num_peaks = count_peak_groups(plane.view(), threshold);

    // Per-label accumulators, indexed by label - 1
    let n = num_clusters as usize;
    let mut areas = vec![0usize; n];
    let mut sums = vec![0u64; n];
    let mut maxs = vec![0u16; n];
    let mut mins = vec![u16::MAX; n];
    let mut row_sums = vec![0u64; n];
    let mut col_sums = vec![0u64; n];

    for ((row, col), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let k = (label - 1) as usize;
        let value = plane[[row, col]];
        areas[k] += 1;
        sums[k] += u64::from(value);
        maxs[k] = maxs[k].max(value);
        mins[k] = mins[k].min(value);
        row_sums[k] += row as u64;
        col_sums[k] += col as u64;
    }

    let retained: Vec<bool> = areas.iter().map(|&a| a >= minimum_area).collect();
    let target_clusters = retained.iter().filter(|&&r| r).count() as u32;

    // Staining restricted to the retained components
    let mut filtered = plane.clone();
    for (position, &label) in labels.indexed_iter() {
        if label == 0 || !retained[(label - 1) as usize] {
            filtered[position] = 0;
        }
    }
    let intint_filtered: u64 = filtered.iter().map(|&p| u64::from(p)).sum();
    let count_filtered = filtered.iter().filter(|&&p| p > 0).count();
    let num_target_peaks = count_peak_groups(filtered.view(), threshold);

    let mut clusters = Vec::with_capacity(target_clusters as usize);
    for k in 0..n {
        if !retained[k] {
            continue;
        }
        let area = areas[k];
        let mean_intensity = sums[k] as f64 / area as f64;
        clusters.push(Cluster {
            id: clusters.len() + 1,
            centroid: (
                (row_sums[k] / area as u64) as usize,
                (col_sums[k] / area as u64) as usize,
            ),
            area,
            max_intensity: maxs[k],
            min_intensity: mins[k],
            mean_intensity,
            integrated_intensity: area as f64 * mean_intensity,
        });
    }

    ClusterAnalysis {
        num_clusters,
        num_peaks,
        target_clusters,
        num_target_peaks,
        intint_filtered,
        count_filtered,
        clusters,
    }
}
