//! Fluor50: the interpolated number of top-ranked clusters accounting for
//! half of an image's total staining intensity.
//!
//! A low Fluor50 means the signal is concentrated in few clusters; a value
//! approaching the cluster count means it is evenly spread. Images without
//! retained clusters have no meaningful value and report an `N/A` sentinel
//! that must never be coerced to a number.

use std::fmt;

use crate::cluster::Cluster;

/// Fluor50 result: a real-valued rank, or not applicable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fluor50 {
    Value(f64),
    NotAvailable,
}

impl fmt::Display for Fluor50 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fluor50::Value(rank) => write!(f, "{}", rank),
            Fluor50::NotAvailable => f.write_str("N/A"),
        }
    }
}

/// Per-cluster share of the image total, in intensity-rank order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityShare {
    /// This cluster's fraction of total intensity, in percent
    pub percent: f64,
    /// Running intensity sum up to and including this cluster
    pub cumulative: f64,
    /// Running percentage sum up to and including this cluster
    pub cumulative_percent: f64,
}

/// Sort clusters by integrated intensity, brightest first, and renumber
/// their ids 1..n in the new order.
pub fn rank_by_intensity(clusters: &mut [Cluster]) {
    clusters.sort_by(|a, b| b.integrated_intensity.total_cmp(&a.integrated_intensity));
    for (index, cluster) in clusters.iter_mut().enumerate() {
        cluster.id = index + 1;
    }
}

/// Cumulative intensity distribution over intensity-ranked clusters.
///
/// The returned shares are aligned with the input order, which should
/// already be descending by integrated intensity (see [`rank_by_intensity`]).
pub fn cumulative_shares(clusters: &[Cluster]) -> Vec<IntensityShare> {
    let total: f64 = clusters.iter().map(|c| c.integrated_intensity).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut cumulative = 0.0;
    let mut cumulative_percent = 0.0;
    clusters
        .iter()
        .map(|cluster| {
            let percent = cluster.integrated_intensity / total * 100.0;
            cumulative += cluster.integrated_intensity;
            cumulative_percent += percent;
            IntensityShare {
                percent,
                cumulative,
                cumulative_percent,
            }
        })
        .collect()
}

/// Interpolate the rank at which the cumulative distribution crosses 50%.
///
/// An artificial `(rank 0, 0%)` point anchors the interpolation, so a single
/// cluster holding all the intensity yields 0.5, and two equal clusters yield
/// exactly 1.0. Empty input yields [`Fluor50::NotAvailable`].
pub fn fluor50(shares: &[IntensityShare]) -> Fluor50 {
    if shares.is_empty() {
        return Fluor50::NotAvailable;
    }

    let mut previous = 0.0f64; // the inserted rank-0 anchor
    for (index, share) in shares.iter().enumerate() {
        let current = share.cumulative_percent;
        if current >= 50.0 {
            let span = current - previous;
            if span <= 0.0 {
                // Flat segment: the crossing happened at the segment start
                return Fluor50::Value(index as f64);
            }
            return Fluor50::Value(index as f64 + (50.0 - previous) / span);
        }
        previous = current;
    }

    // Cumulative percentages should always end at ~100; only floating point
    // shortfall lands here, so report the final rank.
    Fluor50::Value(shares.len() as f64)
}
