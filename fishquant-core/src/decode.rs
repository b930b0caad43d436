//! TIFF decoding into ndarray intensity buffers.
//!
//! Pixel values are widened to `u16` without rescaling, so an 8-bit image
//! keeps its 0..256 range and bit-depth detection downstream sees the raw
//! values the file carried.

use std::path::Path;

use image::DynamicImage;
use ndarray::{Array2, Array3};

use crate::channel::DecodedImage;
use crate::error::AnalysisError;

/// Pixel layout of a file, used by the file-list mode filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// Single channel, with or without alpha
    Greyscale,
    /// RGB or RGBA
    Colour,
    /// Anything else (e.g. float formats)
    Other,
}

/// Decode a TIFF (or any format `image` recognises) into a raw intensity array.
pub fn decode_image(path: &Path) -> Result<DecodedImage, AnalysisError> {
    let dynamic = image::open(path).map_err(|source| AnalysisError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(to_decoded(dynamic))
}

/// Inspect a file's pixel mode without keeping the pixel data around.
pub fn inspect_mode(path: &Path) -> Result<ImageMode, AnalysisError> {
    let dynamic = image::open(path).map_err(|source| AnalysisError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = match dynamic {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => ImageMode::Greyscale,
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => ImageMode::Colour,
        _ => ImageMode::Other,
    };
    Ok(mode)
}

fn to_decoded(dynamic: DynamicImage) -> DecodedImage {
    match dynamic {
        DynamicImage::ImageLuma8(buf) => {
            let (width, height) = buf.dimensions();
            let data = buf.into_raw().into_iter().map(u16::from).collect();
            DecodedImage::Grey(grey_plane(height, width, data))
        }
        DynamicImage::ImageLuma16(buf) => {
            let (width, height) = buf.dimensions();
            DecodedImage::Grey(grey_plane(height, width, buf.into_raw()))
        }
        DynamicImage::ImageLumaA8(buf) => {
            let (width, height) = buf.dimensions();
            let data = buf.into_raw().into_iter().map(u16::from).collect();
            DecodedImage::Multi(channel_stack(height, width, 2, data))
        }
        DynamicImage::ImageLumaA16(buf) => {
            let (width, height) = buf.dimensions();
            DecodedImage::Multi(channel_stack(height, width, 2, buf.into_raw()))
        }
        DynamicImage::ImageRgb8(buf) => {
            let (width, height) = buf.dimensions();
            let data = buf.into_raw().into_iter().map(u16::from).collect();
            DecodedImage::Multi(channel_stack(height, width, 3, data))
        }
        DynamicImage::ImageRgba8(buf) => {
            let (width, height) = buf.dimensions();
            let data = buf.into_raw().into_iter().map(u16::from).collect();
            DecodedImage::Multi(channel_stack(height, width, 4, data))
        }
        DynamicImage::ImageRgb16(buf) => {
            let (width, height) = buf.dimensions();
            DecodedImage::Multi(channel_stack(height, width, 3, buf.into_raw()))
        }
        DynamicImage::ImageRgba16(buf) => {
            let (width, height) = buf.dimensions();
            DecodedImage::Multi(channel_stack(height, width, 4, buf.into_raw()))
        }
        // Float and future formats: widen via an RGBA8 rendering. The channel
        // selector decides whether the result is analysable.
        other => to_decoded(DynamicImage::ImageRgba8(other.to_rgba8())),
    }
}

fn grey_plane(height: u32, width: u32, data: Vec<u16>) -> Array2<u16> {
    Array2::from_shape_vec((height as usize, width as usize), data)
        .expect("decoded buffer length matches its dimensions")
}

fn channel_stack(height: u32, width: u32, channels: usize, data: Vec<u16>) -> Array3<u16> {
    Array3::from_shape_vec((height as usize, width as usize, channels), data)
        .expect("decoded buffer length matches its dimensions")
}
