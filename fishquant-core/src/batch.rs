//! Batch orchestration: file discovery, per-file analysis and result routing.
//!
//! One bad file never aborts a run. Decode failures, invalid layouts and sink
//! write errors are logged and the batch moves on to the next file; a
//! cooperative cancellation flag is checked between files (never mid-image).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};

use crate::channel::{select_channel, ChannelSelection};
use crate::cluster::analyze_clusters;
use crate::decode::{decode_image, inspect_mode, ImageMode};
use crate::depth::DepthState;
use crate::dispersion::analyze_dispersion;
use crate::error::AnalysisError;
use crate::fluor50::{cumulative_shares, fluor50, rank_by_intensity};
use crate::options::{AnalysisOptions, DepthPolicy, FileFilter, FileKindFilter};
use crate::row::{ClusterColumns, ClusterRow, ResultRow};
use crate::stats::threshold_and_stats;

/// Destination for result rows. Sinks receive the options once at batch
/// start so they can fix the column schema for the whole run.
pub trait ResultSink {
    /// Called once before the first row; typically writes header rows.
    fn begin(&mut self, options: &AnalysisOptions) -> Result<(), AnalysisError>;

    fn write_row(&mut self, row: &ResultRow) -> Result<(), AnalysisError>;

    /// Per-cluster detail rows for one image. Only called when clustering
    /// is enabled; default sinks may ignore them.
    fn write_cluster_rows(&mut self, rows: &[ClusterRow]) -> Result<(), AnalysisError> {
        let _ = rows;
        Ok(())
    }
}

/// Mutable per-batch state threaded through each file's processing.
///
/// Holds the options and the bit-depth tracking state explicitly, so there
/// is no hidden coupling between files beyond the documented depth lock.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub options: AnalysisOptions,
    pub depth: DepthState,
}

impl BatchContext {
    pub fn new(options: AnalysisOptions) -> Self {
        let depth = options.depth.initial_state();
        BatchContext { options, depth }
    }

    /// Restore depth tracking to its policy baseline (new directory or run).
    pub fn reset_depth(&mut self) {
        self.depth = self.options.depth.initial_state();
    }
}

/// Outcome of a completed (or cancelled) batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub analysed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

fn is_candidate(path: &Path, keyword: Option<&str>) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    let lower = name.to_lowercase();
    if !lower.ends_with(".tif") && !lower.ends_with(".tiff") {
        return false;
    }
    keyword.map_or(true, |kwd| name.contains(kwd))
}

fn collect_files(
    dir: &Path,
    recurse: bool,
    keyword: Option<&str>,
    out: &mut Vec<PathBuf>,
) -> Result<(), AnalysisError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recurse {
                collect_files(&path, recurse, keyword, out)?;
            }
        } else if is_candidate(&path, keyword) {
            out.push(path);
        }
    }
    Ok(())
}

/// Enumerate the files a run over `dir` would analyse, in processing order.
///
/// Extension matching is case-insensitive, dotfiles are skipped, and the
/// optional keyword must appear in the file name. Mode filters open each
/// candidate to inspect its pixel layout; unreadable candidates are dropped
/// with a warning (they would be skipped during analysis anyway). The cancel
/// flag is honoured between candidate inspections.
pub fn list_files(
    dir: &Path,
    filter: &FileFilter,
    cancel: &AtomicBool,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut files = Vec::new();
    collect_files(
        dir,
        filter.include_subdirectories,
        filter.keyword.as_deref(),
        &mut files,
    )?;

    if filter.kind == FileKindFilter::All {
        return Ok(files);
    }

    let mut matching = Vec::with_capacity(files.len());
    for path in files {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        match inspect_mode(&path) {
            Ok(mode) => {
                let keep = match filter.kind {
                    FileKindFilter::All => true,
                    FileKindFilter::GreyscaleOnly => mode == ImageMode::Greyscale,
                    FileKindFilter::ColourOnly => mode == ImageMode::Colour,
                };
                if keep {
                    matching.push(path);
                }
            }
            Err(err) => {
                warn!("Unable to read {}: {}", path.display(), err);
            }
        }
    }
    Ok(matching)
}

/// Analyse one file, updating the context's depth state.
///
/// Returns the per-image row and any per-cluster detail rows. All failure
/// modes surface as [`AnalysisError`] for the caller to log and skip.
pub fn process_file(
    path: &Path,
    ctx: &mut BatchContext,
) -> Result<(ResultRow, Vec<ClusterRow>), AnalysisError> {
    let decoded = decode_image(path)?;

    let (mut plane, channel) = match select_channel(decoded, ctx.options.channel) {
        ChannelSelection::Selected { plane, channel } => (plane, channel),
        ChannelSelection::Invalid(reason) => {
            return Err(AnalysisError::InvalidImage {
                path: path.to_path_buf(),
                reason,
            });
        }
    };

    let observed_max = plane.iter().copied().max().unwrap_or(0);
    ctx.depth = ctx.depth.observe(observed_max);
    let threshold = ctx.options.computed_threshold(ctx.depth.multiplier());

    let stats = threshold_and_stats(&mut plane, threshold);

    let mut cluster_rows = Vec::new();
    let clusters = match &ctx.options.clustering {
        None => None,
        Some(clustering) => {
            let analysis = analyze_clusters(&plane, threshold, clustering.minimum_area());
            let mut retained = analysis.clusters;

            let (fluor, shares) = if clustering.fluor50 {
                rank_by_intensity(&mut retained);
                let shares = cumulative_shares(&retained);
                (Some(fluor50(&shares)), Some(shares))
            } else {
                (None, None)
            };

            let dispersion = clustering.spatial_grid().map(|box_size| {
                let centroids: Vec<(usize, usize)> =
                    retained.iter().map(|c| c.centroid).collect();
                analyze_dispersion(&centroids, plane.dim(), box_size)
            });

            for (index, cluster) in retained.into_iter().enumerate() {
                cluster_rows.push(ClusterRow {
                    file: path.to_path_buf(),
                    cluster,
                    share: shares.as_ref().and_then(|s| s.get(index).copied()),
                });
            }

            Some(ClusterColumns {
                num_clusters: analysis.num_clusters,
                num_peaks: analysis.num_peaks,
                target_clusters: analysis.target_clusters,
                num_target_peaks: analysis.num_target_peaks,
                intint_filtered: analysis.intint_filtered,
                count_filtered: analysis.count_filtered,
                fluor50: fluor,
                dispersion,
            })
        }
    };

    let row = ResultRow {
        file: path.to_path_buf(),
        stats,
        clusters,
        displayed_threshold: ctx.options.displayed_threshold(),
        computed_threshold: threshold,
        channel,
    };

    Ok((row, cluster_rows))
}

/// Run a full batch over a directory.
///
/// Walks the directory with the given filter, analyses each file in order
/// and forwards rows to the sink. Under an auto depth policy, the first
/// successfully analysed file pins the bit-depth multiplier for the rest of
/// the run. Sink failures lose that write only (a failed `begin` loses the
/// headers, a failed `write_row` that row) and later writes are still
/// attempted; file failures skip that file only. The cancel flag stops the
/// batch before the next file starts.
pub fn run_batch(
    dir: &Path,
    options: AnalysisOptions,
    filter: &FileFilter,
    sink: &mut dyn ResultSink,
    cancel: &AtomicBool,
) -> Result<BatchSummary, AnalysisError> {
    let files = list_files(dir, filter, cancel)?;
    info!("{} files to be analysed", files.len());

    if let Err(err) = sink.begin(&options) {
        error!("{}", err);
    }

    let mut ctx = BatchContext::new(options);
    let mut summary = BatchSummary::default();

    for path in &files {
        if cancel.load(Ordering::Relaxed) {
            info!("Run aborted before {}", path.display());
            summary.cancelled = true;
            break;
        }

        info!("Analysing: {}", path.display());
        match process_file(path, &mut ctx) {
            Ok((row, cluster_rows)) => {
                summary.analysed += 1;
                if let Err(err) = sink.write_row(&row) {
                    error!("{}", err);
                }
                if !cluster_rows.is_empty() {
                    if let Err(err) = sink.write_cluster_rows(&cluster_rows) {
                        error!("{}", err);
                    }
                }
                // First successful auto-detection pins scaling for the rest
                // of the run.
                if ctx.options.depth == DepthPolicy::Auto && !ctx.depth.is_locked() {
                    ctx.depth = ctx.depth.lock();
                }
            }
            Err(err) => {
                summary.skipped += 1;
                warn!("Skipping {}: {}", path.display(), err);
            }
        }
    }

    info!(
        "Run complete: {} analysed, {} skipped",
        summary.analysed, summary.skipped
    );
    Ok(summary)
}
