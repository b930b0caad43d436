//! Quantification of fluorescent staining in zebrafish embryo microscopy.
//!
//! Given a directory of greyscale or colour TIFFs, this crate computes
//! per-image intensity statistics above a threshold and, optionally, detects
//! and characterises spatially distinct clusters of staining: size filtering,
//! peak counts, per-cluster morphometrics, the cumulative-intensity Fluor50
//! metric, and spatial dispersion measures (grid occupancy, centroid hull
//! area, maximum inter-centroid distance).
//!
//! The pipeline per image is channel selection → bit-depth normalisation →
//! thresholding and basic statistics → cluster analysis. The
//! [`batch`] module drives it across a file list while tracking batch-wide
//! bit-depth state; callers supply a [`batch::ResultSink`] to receive rows.

pub mod batch;
pub mod channel;
pub mod cluster;
pub mod decode;
pub mod depth;
pub mod dispersion;
pub mod error;
pub mod fluor50;
pub mod geometry;
pub mod options;
pub mod row;
pub mod stats;

// Re-export the surface a typical caller needs
pub use batch::{list_files, process_file, run_batch, BatchContext, BatchSummary, ResultSink};
pub use channel::{Channel, ChannelChoice, ChannelSelection, DecodedImage};
pub use cluster::{analyze_clusters, Cluster, ClusterAnalysis};
pub use depth::{BitDepth, DepthState};
pub use dispersion::{analyze_dispersion, DispersionMetrics};
pub use error::AnalysisError;
pub use fluor50::Fluor50;
pub use options::{AnalysisOptions, ClusterOptions, DepthPolicy, FileFilter, FileKindFilter};
pub use row::{cluster_headers, result_headers, ClusterRow, ResultRow};
pub use stats::{threshold_and_stats, ImageStats};
