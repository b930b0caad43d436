//! Intensity thresholding and whole-image staining statistics.

use ndarray::Array2;

use crate::geometry::{hull_area, Point};

/// Per-image staining statistics computed against a raw-unit threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStats {
    /// Sum of all pixel values surviving the threshold
    pub integrated_intensity: u64,
    /// Number of pixels strictly above the threshold
    pub positive_pixels: usize,
    /// Brightest pixel of the original, unmasked image
    pub max: u16,
    /// Dimmest pixel of the original, unmasked image
    pub min: u16,
    /// Convex hull area of the positive pixels, as a staining-extent measure
    pub stain_area: f64,
}

/// Zero out pixels at or below `threshold`, in place.
///
/// Positivity follows strictly-greater semantics: a pixel counts only when
/// its value exceeds the threshold. With the threshold disabled (0) every
/// nonzero pixel survives.
pub fn apply_threshold(plane: &mut Array2<u16>, threshold: u32) {
    for pixel in plane.iter_mut() {
        if u32::from(*pixel) <= threshold {
            *pixel = 0;
        }
    }
}

/// Threshold an intensity plane in place and compute its staining statistics.
///
/// `max`/`min` are taken from the image before masking so they report the
/// full signal range observed, independent of the threshold setting. The
/// stain area is 0 when fewer than three positive pixels exist or when the
/// positive pixels are collinear.
pub fn threshold_and_stats(plane: &mut Array2<u16>, threshold: u32) -> ImageStats {
    let mut max = 0u16;
    let mut min = u16::MAX;
    for &pixel in plane.iter() {
        max = max.max(pixel);
        min = min.min(pixel);
    }
    if plane.is_empty() {
        min = 0;
    }

    apply_threshold(plane, threshold);

    let mut integrated_intensity = 0u64;
    let mut positive_pixels = 0usize;
    let mut positions: Vec<Point> = Vec::new();
    for ((row, col), &pixel) in plane.indexed_iter() {
        if pixel > 0 {
            integrated_intensity += u64::from(pixel);
            positive_pixels += 1;
            positions.push((row as f64, col as f64));
        }
    }

    let stain_area = hull_area(&positions);

    ImageStats {
        integrated_intensity,
        positive_pixels,
        max,
        min,
        stain_area,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2};

    #[test]
    fn test_strictly_greater_positivity() {
        let original = arr2(&[[10u16, 60, 61], [0, 100, 60]]);
        for threshold in [0u32, 10, 59, 60, 61, 100, 200] {
            let mut plane = original.clone();
            let stats = threshold_and_stats(&mut plane, threshold);
            let expected = original
                .iter()
                .filter(|&&p| u32::from(p) > threshold)
                .count();
            assert_eq!(stats.positive_pixels, expected, "threshold {}", threshold);
        }
    }

    #[test]
    fn test_disabled_threshold_counts_nonzero() {
        let mut plane = arr2(&[[0u16, 1, 2], [0, 0, 3]]);
        let stats = threshold_and_stats(&mut plane, 0);
        assert_eq!(stats.positive_pixels, 3);
        assert_eq!(stats.integrated_intensity, 6);
    }

    #[test]
    fn test_max_min_from_unmasked_image() {
        let mut plane = arr2(&[[5u16, 200], [80, 120]]);
        let stats = threshold_and_stats(&mut plane, 100);
        assert_eq!(stats.max, 200);
        assert_eq!(stats.min, 5);
        // Masked pixels are gone from the integrated sum
        assert_eq!(stats.integrated_intensity, 320);
        assert_eq!(stats.positive_pixels, 2);
    }

    #[test]
    fn test_masking_is_in_place() {
        let mut plane = arr2(&[[5u16, 200], [80, 120]]);
        threshold_and_stats(&mut plane, 100);
        assert_eq!(plane, arr2(&[[0u16, 200], [0, 120]]));
    }

    #[test]
    fn test_stain_area_needs_three_spread_pixels() {
        // Two positive pixels: no hull
        let mut plane = arr2(&[[50u16, 0, 50], [0, 0, 0]]);
        let stats = threshold_and_stats(&mut plane, 10);
        assert_eq!(stats.stain_area, 0.0);

        // A right triangle of positive pixels spans half a unit square grid
        let mut plane = arr2(&[[50u16, 0, 50], [0, 0, 0], [50, 0, 0]]);
        let stats = threshold_and_stats(&mut plane, 10);
        assert_relative_eq!(stats.stain_area, 2.0);
    }

    #[test]
    fn test_collinear_stain_has_zero_area() {
        let mut plane = arr2(&[[50u16, 50, 50, 50]]);
        let stats = threshold_and_stats(&mut plane, 10);
        assert_eq!(stats.stain_area, 0.0);
        assert_eq!(stats.positive_pixels, 4);
    }

    #[test]
    fn test_blank_image() {
        let mut plane = Array2::<u16>::zeros((4, 4));
        let stats = threshold_and_stats(&mut plane, 0);
        assert_eq!(stats.positive_pixels, 0);
        assert_eq!(stats.integrated_intensity, 0);
        assert_eq!(stats.max, 0);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.stain_area, 0.0);
    }
}
