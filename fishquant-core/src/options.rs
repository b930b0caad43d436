//! Run configuration: thresholding, clustering and file-list options.
//!
//! Setters validate their input: an out-of-range value is rejected with a
//! warning and the previous value stays in effect. Configuration problems
//! are never fatal.

use log::warn;

use crate::channel::ChannelChoice;
use crate::depth::{BitDepth, DepthState};
use crate::dispersion::{DEFAULT_GRID_BOX_SIZE, MAX_GRID_BOX_SIZE, MIN_GRID_BOX_SIZE};

/// Minimum cluster size bounds, in pixels.
pub const MIN_CLUSTER_AREA: usize = 1;
pub const MAX_CLUSTER_AREA: usize = 99_999;

/// Threshold entry bounds, in display units.
pub const MAX_DISPLAY_THRESHOLD: u32 = 256;
pub const DEFAULT_DISPLAY_THRESHOLD: u32 = 60;

/// How the bit-depth multiplier is chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthPolicy {
    /// Detect from the data, pinning after the first analysed file
    #[default]
    Auto,
    /// Use a fixed depth; detection is disabled
    Manual(BitDepth),
}

impl DepthPolicy {
    /// Starting depth state for a fresh batch under this policy.
    pub fn initial_state(self) -> DepthState {
        match self {
            DepthPolicy::Auto => DepthState::default(),
            DepthPolicy::Manual(depth) => DepthState::manual(depth),
        }
    }
}

/// Options for the cluster analysis chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
    minimum_area: usize,
    /// Rank clusters by intensity and compute the Fluor50 metric
    pub fluor50: bool,
    /// Grid box size for spatial dispersion, when enabled
    spatial_grid: Option<usize>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            minimum_area: 10,
            fluor50: false,
            spatial_grid: None,
        }
    }
}

impl ClusterOptions {
    pub fn minimum_area(&self) -> usize {
        self.minimum_area
    }

    /// Set the minimum cluster size; out-of-range input keeps the prior value.
    pub fn set_minimum_area(&mut self, pixels: usize) {
        if (MIN_CLUSTER_AREA..=MAX_CLUSTER_AREA).contains(&pixels) {
            self.minimum_area = pixels;
        } else {
            warn!(
                "Invalid minimum cluster size {} (valid {}..={}), keeping {}",
                pixels, MIN_CLUSTER_AREA, MAX_CLUSTER_AREA, self.minimum_area
            );
        }
    }

    pub fn spatial_grid(&self) -> Option<usize> {
        self.spatial_grid
    }

    /// Enable spatial dispersion with the default grid box size.
    pub fn enable_spatial(&mut self) {
        self.spatial_grid = Some(DEFAULT_GRID_BOX_SIZE);
    }

    pub fn disable_spatial(&mut self) {
        self.spatial_grid = None;
    }

    /// Set the grid box size; out-of-range input keeps the prior value.
    pub fn set_grid_box_size(&mut self, pixels: usize) {
        if (MIN_GRID_BOX_SIZE..=MAX_GRID_BOX_SIZE).contains(&pixels) {
            self.spatial_grid = Some(pixels);
        } else {
            warn!(
                "Invalid grid box size {} (valid {}..={}), keeping {:?}",
                pixels, MIN_GRID_BOX_SIZE, MAX_GRID_BOX_SIZE, self.spatial_grid
            );
        }
    }
}

/// Full analysis configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub(crate) threshold: u32,
    /// With thresholding off every nonzero pixel counts as positive
    pub threshold_enabled: bool,
    pub channel: ChannelChoice,
    pub depth: DepthPolicy,
    /// `None` disables the entire cluster analysis chain
    pub clustering: Option<ClusterOptions>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            threshold: DEFAULT_DISPLAY_THRESHOLD,
            threshold_enabled: true,
            channel: ChannelChoice::Auto,
            depth: DepthPolicy::Auto,
            clustering: None,
        }
    }
}

impl AnalysisOptions {
    /// Threshold in display units, as entered by the user.
    pub fn displayed_threshold(&self) -> u32 {
        if self.threshold_enabled {
            self.threshold
        } else {
            0
        }
    }

    /// Set the display-unit threshold; out-of-range input keeps the prior value.
    pub fn set_threshold(&mut self, value: u32) {
        if value <= MAX_DISPLAY_THRESHOLD {
            self.threshold = value;
        } else {
            warn!(
                "Invalid threshold {} (valid 0..={}), keeping {}",
                value, MAX_DISPLAY_THRESHOLD, self.threshold
            );
        }
    }

    /// Threshold in raw intensity units for the given depth multiplier.
    pub fn computed_threshold(&self, multiplier: u32) -> u32 {
        self.displayed_threshold() * multiplier
    }
}

/// How the file list is narrowed before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKindFilter {
    /// Process every TIFF found
    #[default]
    All,
    /// Only files decoding to a single-channel layout
    GreyscaleOnly,
    /// Only files decoding to RGB/RGBA
    ColourOnly,
}

/// File discovery options for the batch orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub include_subdirectories: bool,
    /// Substring that must appear in the file name
    pub keyword: Option<String>,
    pub kind: FileKindFilter,
}

impl Default for FileFilter {
    fn default() -> Self {
        FileFilter {
            include_subdirectories: true,
            keyword: None,
            kind: FileKindFilter::All,
        }
    }
}
