//! Flat result records and their configuration-driven column schema.
//!
//! The column set is fixed once per run from the enabled options; sinks call
//! [`result_headers`] / [`cluster_headers`] exactly once and then serialise
//! rows with [`ResultRow::to_record`]. Keeping the flattening here means every
//! sink implementation emits identical columns.

use std::path::PathBuf;

use crate::channel::Channel;
use crate::cluster::Cluster;
use crate::dispersion::DispersionMetrics;
use crate::fluor50::{Fluor50, IntensityShare};
use crate::options::AnalysisOptions;
use crate::stats::ImageStats;

/// Cluster-derived columns of a result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterColumns {
    pub num_clusters: u32,
    pub num_peaks: u32,
    pub target_clusters: u32,
    pub num_target_peaks: u32,
    pub intint_filtered: u64,
    pub count_filtered: usize,
    pub fluor50: Option<Fluor50>,
    pub dispersion: Option<DispersionMetrics>,
}

/// One row per analysed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub file: PathBuf,
    pub stats: ImageStats,
    pub clusters: Option<ClusterColumns>,
    /// Threshold as entered, in display units
    pub displayed_threshold: u32,
    /// Threshold after bit-depth scaling, in raw units
    pub computed_threshold: u32,
    pub channel: Channel,
}

/// One row per retained cluster, for the optional detail export.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    pub file: PathBuf,
    pub cluster: Cluster,
    /// Present when Fluor50 ranking is enabled
    pub share: Option<IntensityShare>,
}

/// Column names for the per-image output under the given options.
pub fn result_headers(options: &AnalysisOptions) -> Vec<&'static str> {
    let mut headers = vec![
        "File",
        "Integrated Intensity",
        "Positive Pixels",
        "Maximum",
        "Minimum",
        "Stain Area",
    ];
    if let Some(clustering) = &options.clustering {
        headers.extend([
            "Total Clusters",
            "Total Peaks",
            "Large Clusters",
            "Peaks in Large Clusters",
            "Integrated Intensity in Large Clusters",
            "Positive Pixels in Large Clusters",
        ]);
        if clustering.fluor50 {
            headers.push("Fluor50");
        }
        if clustering.spatial_grid().is_some() {
            headers.extend([
                "Total Grid Boxes",
                "Positive Grid Boxes",
                "Centroid Hull Area",
                "Max Centroid Distance",
            ]);
        }
    }
    headers.extend(["Threshold", "Computed Threshold", "Channel"]);
    headers
}

/// Column names for the per-cluster detail output.
pub fn cluster_headers(fluor50: bool) -> Vec<&'static str> {
    let mut headers = vec![
        "File",
        "Cluster",
        "Centroid Row",
        "Centroid Col",
        "Area",
        "Maximum",
        "Minimum",
        "Mean",
        "Integrated Intensity",
    ];
    if fluor50 {
        headers.extend(["% of Total Intensity", "Cumulative Intensity", "Cumulative %"]);
    }
    headers
}

impl ResultRow {
    /// Flatten to text fields matching [`result_headers`] for the same options.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.file.display().to_string(),
            self.stats.integrated_intensity.to_string(),
            self.stats.positive_pixels.to_string(),
            self.stats.max.to_string(),
            self.stats.min.to_string(),
            self.stats.stain_area.to_string(),
        ];
        if let Some(clusters) = &self.clusters {
            record.extend([
                clusters.num_clusters.to_string(),
                clusters.num_peaks.to_string(),
                clusters.target_clusters.to_string(),
                clusters.num_target_peaks.to_string(),
                clusters.intint_filtered.to_string(),
                clusters.count_filtered.to_string(),
            ]);
            if let Some(fluor50) = &clusters.fluor50 {
                record.push(fluor50.to_string());
            }
            if let Some(dispersion) = &clusters.dispersion {
                record.extend([
                    dispersion.total_grid_boxes.to_string(),
                    dispersion.positive_grid_boxes.to_string(),
                    dispersion.hull_area.to_string(),
                    dispersion.max_centroid_distance.to_string(),
                ]);
            }
        }
        record.extend([
            self.displayed_threshold.to_string(),
            self.computed_threshold.to_string(),
            self.channel.label().to_string(),
        ]);
        record
    }
}

impl ClusterRow {
    /// Flatten to text fields matching [`cluster_headers`].
    pub fn to_record(&self) -> Vec<String> {
        let cluster = &self.cluster;
        let mut record = vec![
            self.file.display().to_string(),
            cluster.id.to_string(),
            cluster.centroid.0.to_string(),
            cluster.centroid.1.to_string(),
            cluster.area.to_string(),
            cluster.max_intensity.to_string(),
            cluster.min_intensity.to_string(),
            cluster.mean_intensity.to_string(),
            cluster.integrated_intensity.to_string(),
        ];
        if let Some(share) = &self.share {
            record.extend([
                share.percent.to_string(),
                share.cumulative.to_string(),
                share.cumulative_percent.to_string(),
            ]);
        }
        record
    }
}
