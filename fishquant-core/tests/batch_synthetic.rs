//! End-to-end batch tests over synthetic TIFF files written to a scratch
//! directory.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use fishquant_core::{
    run_batch, AnalysisError, AnalysisOptions, Channel, ChannelChoice, ClusterOptions,
    ClusterRow, FileFilter, FileKindFilter, Fluor50, ResultRow, ResultSink,
};
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use tempfile::TempDir;

/// Sink that keeps everything in memory for assertions.
#[derive(Default)]
struct VecSink {
    began: bool,
    rows: Vec<ResultRow>,
    cluster_rows: Vec<ClusterRow>,
}

impl ResultSink for VecSink {
    fn begin(&mut self, _options: &AnalysisOptions) -> Result<(), AnalysisError> {
        self.began = true;
        Ok(())
    }

    fn write_row(&mut self, row: &ResultRow) -> Result<(), AnalysisError> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn write_cluster_rows(&mut self, rows: &[ClusterRow]) -> Result<(), AnalysisError> {
        self.cluster_rows.extend_from_slice(rows);
        Ok(())
    }
}

/// Greyscale frame with two square staining blobs on a dark background.
fn write_two_blob_grey(path: &Path) {
    let mut img = GrayImage::from_pixel(64, 64, Luma([5u8]));
    for y in 4..10 {
        for x in 4..10 {
            img.put_pixel(x, y, Luma([200u8])); // 36 px blob
        }
    }
    for y in 40..43 {
        for x in 50..53 {
            img.put_pixel(x, y, Luma([120u8])); // 9 px blob
        }
    }
    img.save(path).unwrap();
}

/// RGB frame with staining only in the green channel.
fn write_green_only_rgb(path: &Path) {
    let mut img = RgbImage::new(32, 32);
    for y in 10..16 {
        for x in 10..16 {
            img.put_pixel(x, y, Rgb([0u8, 180, 0]));
        }
    }
    img.save(path).unwrap();
}

/// RGB frame with data in two channels: invalid under auto-detection.
fn write_two_channel_rgb(path: &Path) {
    let mut img = RgbImage::new(16, 16);
    img.put_pixel(2, 2, Rgb([90u8, 0, 0]));
    img.put_pixel(8, 8, Rgb([0u8, 0, 90]));
    img.save(path).unwrap();
}

fn write_grey_16bit(path: &Path, value: u16) {
    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(32, 32);
    for y in 5..9 {
        for x in 5..9 {
            img.put_pixel(x, y, Luma([value]));
        }
    }
    img.save(path).unwrap();
}

fn cluster_options(min_area: usize, fluor50: bool, spatial: bool) -> ClusterOptions {
    let mut clustering = ClusterOptions::default();
    clustering.set_minimum_area(min_area);
    clustering.fluor50 = fluor50;
    if spatial {
        clustering.enable_spatial();
    }
    clustering
}

/// Sink that fails configurably, mimicking a locked or read-only output file.
#[derive(Default)]
struct FaultySink {
    fail_begin: bool,
    fail_every_other_row: bool,
    attempts: usize,
    rows: Vec<ResultRow>,
}

impl ResultSink for FaultySink {
    fn begin(&mut self, _options: &AnalysisOptions) -> Result<(), AnalysisError> {
        if self.fail_begin {
            return Err(AnalysisError::Sink("output file locked".to_string()));
        }
        Ok(())
    }

    fn write_row(&mut self, row: &ResultRow) -> Result<(), AnalysisError> {
        self.attempts += 1;
        if self.fail_every_other_row && self.attempts % 2 == 0 {
            return Err(AnalysisError::Sink("write rejected".to_string()));
        }
        self.rows.push(row.clone());
        Ok(())
    }
}

#[test]
fn test_batch_continues_past_corrupt_file() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("a_good.tif"));
    std::fs::write(dir.path().join("b_corrupt.tif"), b"garbage bytes").unwrap();
    write_two_blob_grey(&dir.path().join("c_good.tif"));

    let mut sink = VecSink::default();
    let cancel = AtomicBool::new(false);
    let summary = run_batch(
        dir.path(),
        AnalysisOptions::default(),
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    assert_eq!(summary.analysed, 2);
    assert_eq!(summary.skipped, 1);
    assert!(!summary.cancelled);
    assert!(sink.began);
    assert_eq!(sink.rows.len(), 2);
}

#[test]
fn test_full_cluster_chain_on_grey_image() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("fish.tif"));

    let mut options = AnalysisOptions::default();
    options.clustering = Some(cluster_options(9, true, true));
    let mut sink = VecSink::default();
    let cancel = AtomicBool::new(false);
    run_batch(
        dir.path(),
        options,
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    assert_eq!(sink.rows.len(), 1);
    let row = &sink.rows[0];
    assert_eq!(row.channel, Channel::Grey);
    // Default threshold 60 at 8-bit: the background (5) is masked out
    assert_eq!(row.computed_threshold, 60);
    assert_eq!(row.stats.positive_pixels, 36 + 9);
    assert_eq!(row.stats.max, 200);
    assert_eq!(row.stats.min, 5);

    let clusters = row.clusters.as_ref().expect("clustering enabled");
    assert_eq!(clusters.num_clusters, 2);
    assert_eq!(clusters.target_clusters, 2);
    assert_eq!(clusters.intint_filtered, 36 * 200 + 9 * 120);
    match clusters.fluor50 {
        Some(Fluor50::Value(rank)) => assert!(rank > 0.0 && rank < 1.0),
        other => panic!("expected a Fluor50 value, got {:?}", other),
    }
    let dispersion = clusters.dispersion.as_ref().expect("spatial enabled");
    assert_eq!(dispersion.total_grid_boxes, 1); // 64x64 with box 50
    assert_eq!(dispersion.positive_grid_boxes, 1);
    assert!(dispersion.max_centroid_distance > 0.0);

    // Detail rows: brightest cluster ranked first
    assert_eq!(sink.cluster_rows.len(), 2);
    assert_eq!(sink.cluster_rows[0].cluster.id, 1);
    assert_eq!(sink.cluster_rows[0].cluster.area, 36);
    let share = sink.cluster_rows[1].share.expect("fluor50 shares present");
    assert!((share.cumulative_percent - 100.0).abs() < 1e-9);
}

#[test]
fn test_rgb_auto_detection_and_ambiguous_skip() {
    let dir = TempDir::new().unwrap();
    write_green_only_rgb(&dir.path().join("green.tif"));
    write_two_channel_rgb(&dir.path().join("overlay.tif"));

    let mut sink = VecSink::default();
    let cancel = AtomicBool::new(false);
    let summary = run_batch(
        dir.path(),
        AnalysisOptions::default(),
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    assert_eq!(summary.analysed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(sink.rows[0].channel, Channel::Green);
    assert_eq!(sink.rows[0].stats.positive_pixels, 36);
}

#[test]
fn test_explicit_channel_accepts_overlay() {
    let dir = TempDir::new().unwrap();
    write_two_channel_rgb(&dir.path().join("overlay.tif"));

    let mut options = AnalysisOptions::default();
    options.channel = ChannelChoice::Blue;
    let mut sink = VecSink::default();
    let cancel = AtomicBool::new(false);
    let summary = run_batch(
        dir.path(),
        options,
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    assert_eq!(summary.analysed, 1);
    assert_eq!(sink.rows[0].channel, Channel::Blue);
    assert_eq!(sink.rows[0].stats.positive_pixels, 1);
}

#[test]
fn test_depth_pins_after_first_file() {
    let dir = TempDir::new().unwrap();
    // Processed in name order: the 12-bit image comes first and pins x16
    write_grey_16bit(&dir.path().join("a_deep.tif"), 3000);
    write_two_blob_grey(&dir.path().join("b_shallow.tif"));

    let mut sink = VecSink::default();
    let cancel = AtomicBool::new(false);
    run_batch(
        dir.path(),
        AnalysisOptions::default(),
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    assert_eq!(sink.rows.len(), 2);
    // Both rows use the pinned 12-bit multiplier: 60 * 16
    assert_eq!(sink.rows[0].computed_threshold, 960);
    assert_eq!(sink.rows[1].computed_threshold, 960);
    // The 8-bit image has nothing above the scaled threshold
    assert_eq!(sink.rows[1].stats.positive_pixels, 0);
}

#[test]
fn test_keyword_and_mode_filters() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("fish_gfp.tif"));
    write_two_blob_grey(&dir.path().join("fish_dapi.tif"));
    write_green_only_rgb(&dir.path().join("fish_gfp_rgb.tif"));

    let cancel = AtomicBool::new(false);
    let filter = FileFilter {
        keyword: Some("gfp".to_string()),
        kind: FileKindFilter::GreyscaleOnly,
        ..FileFilter::default()
    };
    let files = fishquant_core::list_files(dir.path(), &filter, &cancel).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("fish_gfp.tif"));
}

#[test]
fn test_subdirectory_inclusion_toggle() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("top.tif"));
    let sub = dir.path().join("nested");
    std::fs::create_dir(&sub).unwrap();
    write_two_blob_grey(&sub.join("below.tif"));

    let cancel = AtomicBool::new(false);
    let with_subs = fishquant_core::list_files(dir.path(), &FileFilter::default(), &cancel).unwrap();
    assert_eq!(with_subs.len(), 2);

    let filter = FileFilter {
        include_subdirectories: false,
        ..FileFilter::default()
    };
    let top_only = fishquant_core::list_files(dir.path(), &filter, &cancel).unwrap();
    assert_eq!(top_only.len(), 1);
}

#[test]
fn test_begin_failure_does_not_abort_the_run() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("a.tif"));
    write_two_blob_grey(&dir.path().join("b.tif"));

    let mut sink = FaultySink {
        fail_begin: true,
        ..FaultySink::default()
    };
    let cancel = AtomicBool::new(false);
    let summary = run_batch(
        dir.path(),
        AnalysisOptions::default(),
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    // Headers are lost but every file is still analysed and written
    assert_eq!(summary.analysed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(sink.rows.len(), 2);
}

#[test]
fn test_row_write_failure_loses_only_that_row() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("a.tif"));
    write_two_blob_grey(&dir.path().join("b.tif"));
    write_two_blob_grey(&dir.path().join("c.tif"));

    let mut sink = FaultySink {
        fail_every_other_row: true,
        ..FaultySink::default()
    };
    let cancel = AtomicBool::new(false);
    let summary = run_batch(
        dir.path(),
        AnalysisOptions::default(),
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    // All three files analysed; the second row was rejected and is gone,
    // the third was still attempted and landed.
    assert_eq!(summary.analysed, 3);
    assert_eq!(sink.attempts, 3);
    assert_eq!(sink.rows.len(), 2);
}

#[test]
fn test_cancellation_stops_before_next_file() {
    let dir = TempDir::new().unwrap();
    write_two_blob_grey(&dir.path().join("a.tif"));
    write_two_blob_grey(&dir.path().join("b.tif"));

    let mut sink = VecSink::default();
    let cancel = AtomicBool::new(false);
    cancel.store(true, Ordering::Relaxed);
    let summary = run_batch(
        dir.path(),
        AnalysisOptions::default(),
        &FileFilter::default(),
        &mut sink,
        &cancel,
    )
    .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.analysed, 0);
    assert!(sink.rows.is_empty());
}
