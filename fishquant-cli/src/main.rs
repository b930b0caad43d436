//! Batch runner: quantify fluorescent staining across a directory of TIFFs
//! and write per-image (and optionally per-cluster) CSV output.

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;

use fishquant_core::{
    cluster_headers, list_files, result_headers, run_batch, AnalysisError, AnalysisOptions,
    BitDepth, ChannelChoice, ClusterOptions, ClusterRow, DepthPolicy, FileFilter, FileKindFilter,
    ResultRow, ResultSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ChannelArg {
    Auto,
    Red,
    Green,
    Blue,
}

impl From<ChannelArg> for ChannelChoice {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Auto => ChannelChoice::Auto,
            ChannelArg::Red => ChannelChoice::Red,
            ChannelArg::Green => ChannelChoice::Green,
            ChannelArg::Blue => ChannelChoice::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DepthArg {
    Auto,
    #[value(name = "8")]
    Eight,
    #[value(name = "10")]
    Ten,
    #[value(name = "12")]
    Twelve,
    #[value(name = "16")]
    Sixteen,
}

impl From<DepthArg> for DepthPolicy {
    fn from(arg: DepthArg) -> Self {
        match arg {
            DepthArg::Auto => DepthPolicy::Auto,
            DepthArg::Eight => DepthPolicy::Manual(BitDepth::Eight),
            DepthArg::Ten => DepthPolicy::Manual(BitDepth::Ten),
            DepthArg::Twelve => DepthPolicy::Manual(BitDepth::Twelve),
            DepthArg::Sixteen => DepthPolicy::Manual(BitDepth::Sixteen),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeFilterArg {
    /// Process every TIFF found
    All,
    /// Only greyscale files
    Greyscale,
    /// Only RGB/RGBA files
    Rgb,
}

impl From<ModeFilterArg> for FileKindFilter {
    fn from(arg: ModeFilterArg) -> Self {
        match arg {
            ModeFilterArg::All => FileKindFilter::All,
            ModeFilterArg::Greyscale => FileKindFilter::GreyscaleOnly,
            ModeFilterArg::Rgb => FileKindFilter::ColourOnly,
        }
    }
}

/// Quantify fluorescent staining in zebrafish embryo TIFF images.
#[derive(Parser, Debug)]
#[command(name = "fishquant", version, about)]
struct Args {
    /// Directory of images to process
    directory: PathBuf,

    /// Output CSV file for per-image results
    #[arg(short, long, default_value = "output.csv")]
    output: PathBuf,

    /// Also write per-cluster detail rows to this CSV (requires --clusters)
    #[arg(long)]
    cluster_output: Option<PathBuf>,

    /// Minimum intensity to count, in display units (0-256)
    #[arg(short, long, default_value_t = 60)]
    threshold: u32,

    /// Disable thresholding (all nonzero pixels count)
    #[arg(long)]
    no_threshold: bool,

    /// Channel to analyse in colour images
    #[arg(long, value_enum, default_value_t = ChannelArg::Auto)]
    channel: ChannelArg,

    /// Bit depth override (disables auto-detection)
    #[arg(long, value_enum, default_value_t = DepthArg::Auto)]
    bit_depth: DepthArg,

    /// Search for large areas of staining (cluster analysis)
    #[arg(long)]
    clusters: bool,

    /// Minimum cluster size in pixels
    #[arg(long, default_value_t = 10)]
    min_area: usize,

    /// Rank clusters by intensity and report the Fluor50 metric
    #[arg(long, requires = "clusters")]
    fluor50: bool,

    /// Grid box size in pixels for spatial dispersion analysis
    #[arg(long, requires = "clusters")]
    grid_size: Option<usize>,

    /// Restrict the file list by pixel mode
    #[arg(long, value_enum, default_value_t = ModeFilterArg::All)]
    mode_filter: ModeFilterArg,

    /// Only process files whose name contains this keyword
    #[arg(long)]
    keyword: Option<String>,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_subdirectories: bool,

    /// List the files that would be analysed, then exit
    #[arg(long)]
    list_files: bool,
}

/// CSV-backed result sink; headers are written once when the batch starts.
struct CsvSink {
    results: csv::Writer<File>,
    clusters: Option<csv::Writer<File>>,
}

impl CsvSink {
    fn create(output: &PathBuf, cluster_output: Option<&PathBuf>) -> anyhow::Result<Self> {
        let results = csv::Writer::from_path(output)
            .with_context(|| format!("unable to create {}", output.display()))?;
        let clusters = match cluster_output {
            Some(path) => Some(
                csv::Writer::from_path(path)
                    .with_context(|| format!("unable to create {}", path.display()))?,
            ),
            None => None,
        };
        Ok(CsvSink { results, clusters })
    }
}

impl ResultSink for CsvSink {
    fn begin(&mut self, options: &AnalysisOptions) -> Result<(), AnalysisError> {
        self.results
            .write_record(result_headers(options))
            .and_then(|_| self.results.flush().map_err(csv::Error::from))
            .map_err(|e| AnalysisError::Sink(e.to_string()))?;
        if let Some(writer) = &mut self.clusters {
            let fluor50 = options
                .clustering
                .as_ref()
                .map(|c| c.fluor50)
                .unwrap_or(false);
            writer
                .write_record(cluster_headers(fluor50))
                .and_then(|_| writer.flush().map_err(csv::Error::from))
                .map_err(|e| AnalysisError::Sink(e.to_string()))?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &ResultRow) -> Result<(), AnalysisError> {
        self.results
            .write_record(row.to_record())
            .and_then(|_| self.results.flush().map_err(csv::Error::from))
            .map_err(|e| AnalysisError::Sink(e.to_string()))
    }

    fn write_cluster_rows(&mut self, rows: &[ClusterRow]) -> Result<(), AnalysisError> {
        let Some(writer) = &mut self.clusters else {
            return Ok(());
        };
        for row in rows {
            writer
                .write_record(row.to_record())
                .map_err(|e| AnalysisError::Sink(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| AnalysisError::Sink(e.to_string()))
    }
}

fn build_options(args: &Args) -> AnalysisOptions {
    let mut options = AnalysisOptions::default();
    options.threshold_enabled = !args.no_threshold;
    options.channel = args.channel.into();
    options.depth = args.bit_depth.into();
    options.set_threshold(args.threshold);

    if args.clusters {
        let mut clustering = ClusterOptions::default();
        clustering.fluor50 = args.fluor50;
        clustering.set_minimum_area(args.min_area);
        if let Some(size) = args.grid_size {
            clustering.enable_spatial();
            clustering.set_grid_box_size(size);
        }
        options.clustering = Some(clustering);
    }
    options
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let filter = FileFilter {
        include_subdirectories: !args.no_subdirectories,
        keyword: args.keyword.clone(),
        kind: args.mode_filter.into(),
    };

    // The core checks this between files; the CLI runs batches to completion.
    let cancel = AtomicBool::new(false);

    if args.list_files {
        let files = list_files(&args.directory, &filter, &cancel)
            .with_context(|| format!("unable to scan {}", args.directory.display()))?;
        for file in &files {
            println!("{}", file.display());
        }
        println!("{} files to be analysed", files.len());
        return Ok(());
    }

    let options = build_options(&args);
    let mut sink = CsvSink::create(&args.output, args.cluster_output.as_ref())?;

    info!("Images will be read from: {}", args.directory.display());
    info!("Data will save in: {}", args.output.display());

    let summary = run_batch(&args.directory, options, &filter, &mut sink, &cancel)?;

    println!(
        "Done: {} analysed, {} skipped",
        summary.analysed, summary.skipped
    );
    Ok(())
}
