//! Channel selection: reduce a decoded image to the single intensity plane
//! the rest of the pipeline operates on.
//!
//! Everything downstream of this module assumes a 2-D single-channel array.
//! Multi-channel images are only accepted when exactly one plane is relevant,
//! either because the caller named it or because auto-detection found data in
//! exactly one colour channel. Anything else is classified invalid and the
//! orchestrator skips the file; selection itself never fails loudly.

use std::fmt;

use ndarray::{Array2, Array3, Axis};

/// Intensity channel a result row was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Grey,
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn label(self) -> &'static str {
        match self {
            Channel::Grey => "Grey",
            Channel::Red => "Red",
            Channel::Green => "Green",
            Channel::Blue => "Blue",
        }
    }

}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which channel to analyse in colour images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelChoice {
    /// Scan the colour channels and require exactly one to contain data.
    #[default]
    Auto,
    Red,
    Green,
    Blue,
}

impl ChannelChoice {
    /// Explicitly requested channel and its index in an RGB(A) stack.
    fn explicit(self) -> Option<(Channel, usize)> {
        match self {
            ChannelChoice::Auto => None,
            ChannelChoice::Red => Some((Channel::Red, 0)),
            ChannelChoice::Green => Some((Channel::Green, 1)),
            ChannelChoice::Blue => Some((Channel::Blue, 2)),
        }
    }
}

/// A decoded image, before channel selection.
///
/// Pixel values are widened to `u16` at decode time; the values themselves
/// are raw (an 8-bit source stays in 0..256) so that bit-depth detection sees
/// the original range.
#[derive(Debug, Clone)]
pub enum DecodedImage {
    /// Single-channel image, `(rows, cols)`
    Grey(Array2<u16>),
    /// Multi-channel image, `(rows, cols, channels)` with 2, 3 or 4 channels
    Multi(Array3<u16>),
}

impl DecodedImage {
    /// Image dimensions as `(rows, cols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            DecodedImage::Grey(plane) => plane.dim(),
            DecodedImage::Multi(stack) => {
                let (rows, cols, _) = stack.dim();
                (rows, cols)
            }
        }
    }
}

/// Why an image was rejected by channel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No colour channel contains any nonzero pixel
    Blank,
    /// More than one colour channel contains data and none was specified
    AmbiguousChannels,
    /// Channel count the pipeline does not handle (e.g. grey+alpha)
    UnsupportedLayout,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidReason::Blank => "image appears to be blank",
            InvalidReason::AmbiguousChannels => {
                "multiple channels contain data but no channel was specified"
            }
            InvalidReason::UnsupportedLayout => "unsupported channel layout",
        };
        f.write_str(text)
    }
}

/// Outcome of channel selection.
#[derive(Debug, Clone)]
pub enum ChannelSelection {
    /// The single-channel plane to analyse, and the label it carries.
    Selected { plane: Array2<u16>, channel: Channel },
    /// The image cannot be analysed; the orchestrator logs and skips it.
    Invalid(InvalidReason),
}

/// Reduce a decoded image to the intensity plane of interest.
///
/// Greyscale images pass straight through. Colour images either have the
/// requested channel extracted, or are scanned for the single populated
/// colour channel when the choice is [`ChannelChoice::Auto`]. The alpha
/// plane of RGBA images is ignored by the scan.
pub fn select_channel(image: DecodedImage, choice: ChannelChoice) -> ChannelSelection {
    let stack = match image {
        DecodedImage::Grey(plane) => {
            return ChannelSelection::Selected {
                plane,
                channel: Channel::Grey,
            };
        }
        DecodedImage::Multi(stack) => stack,
    };

    let channels = stack.dim().2;
    if channels != 3 && channels != 4 {
        return ChannelSelection::Invalid(InvalidReason::UnsupportedLayout);
    }

    if let Some((channel, index)) = choice.explicit() {
        let plane = stack.index_axis(Axis(2), index).to_owned();
        return ChannelSelection::Selected { plane, channel };
    }

    // Auto-detect: list the colour channels (never alpha) containing data.
    let populated: Vec<usize> = (0..3)
        .filter(|&c| stack.index_axis(Axis(2), c).iter().any(|&p| p > 0))
        .collect();

    match populated.as_slice() {
        [index] => {
            let channel = match index {
                0 => Channel::Red,
                1 => Channel::Green,
                _ => Channel::Blue,
            };
            ChannelSelection::Selected {
                plane: stack.index_axis(Axis(2), *index).to_owned(),
                channel,
            }
        }
        [] => ChannelSelection::Invalid(InvalidReason::Blank),
        _ => ChannelSelection::Invalid(InvalidReason::AmbiguousChannels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array3};

    fn rgb_with_data_in(channel: usize) -> Array3<u16> {
        let mut stack = Array3::zeros((4, 4, 3));
        stack[[1, 2, channel]] = 80;
        stack[[2, 2, channel]] = 120;
        stack
    }

    #[test]
    fn test_greyscale_passthrough() {
        let plane = arr2(&[[0u16, 10], [20, 30]]);
        let selection = select_channel(DecodedImage::Grey(plane.clone()), ChannelChoice::Auto);
        match selection {
            ChannelSelection::Selected {
                plane: out,
                channel,
            } => {
                assert_eq!(out, plane);
                assert_eq!(channel, Channel::Grey);
            }
            ChannelSelection::Invalid(reason) => panic!("unexpected invalid: {}", reason),
        }
    }

    #[test]
    fn test_auto_detect_single_populated_channel() {
        for (index, expected) in [(0, Channel::Red), (1, Channel::Green), (2, Channel::Blue)] {
            let stack = rgb_with_data_in(index);
            let reference = stack.index_axis(Axis(2), index).to_owned();
            match select_channel(DecodedImage::Multi(stack), ChannelChoice::Auto) {
                ChannelSelection::Selected { plane, channel } => {
                    assert_eq!(channel, expected);
                    // Selected plane is the channel's data, unmodified
                    assert_eq!(plane, reference);
                }
                ChannelSelection::Invalid(reason) => panic!("unexpected invalid: {}", reason),
            }
        }
    }

    #[test]
    fn test_auto_detect_ignores_alpha() {
        let mut stack = Array3::zeros((3, 3, 4));
        stack[[0, 0, 1]] = 50; // green data
        for pixel in stack.index_axis_mut(Axis(2), 3).iter_mut() {
            *pixel = 255; // opaque alpha everywhere
        }
        match select_channel(DecodedImage::Multi(stack), ChannelChoice::Auto) {
            ChannelSelection::Selected { channel, .. } => assert_eq!(channel, Channel::Green),
            ChannelSelection::Invalid(reason) => panic!("unexpected invalid: {}", reason),
        }
    }

    #[test]
    fn test_blank_image_is_invalid() {
        let stack = Array3::zeros((3, 3, 3));
        match select_channel(DecodedImage::Multi(stack), ChannelChoice::Auto) {
            ChannelSelection::Invalid(InvalidReason::Blank) => {}
            other => panic!("expected blank classification, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_channel_overlay_is_invalid() {
        let mut stack = Array3::zeros((3, 3, 3));
        stack[[0, 0, 0]] = 10;
        stack[[1, 1, 2]] = 10;
        match select_channel(DecodedImage::Multi(stack), ChannelChoice::Auto) {
            ChannelSelection::Invalid(InvalidReason::AmbiguousChannels) => {}
            other => panic!("expected ambiguous classification, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_choice_overrides_detection() {
        // Data in two channels would be ambiguous under auto-detect
        let mut stack = Array3::zeros((3, 3, 3));
        stack[[0, 0, 0]] = 10;
        stack[[1, 1, 2]] = 99;
        match select_channel(DecodedImage::Multi(stack), ChannelChoice::Blue) {
            ChannelSelection::Selected { plane, channel } => {
                assert_eq!(channel, Channel::Blue);
                assert_eq!(plane[[1, 1]], 99);
                assert_eq!(plane[[0, 0]], 0);
            }
            ChannelSelection::Invalid(reason) => panic!("unexpected invalid: {}", reason),
        }
    }

    #[test]
    fn test_unsupported_channel_count_is_invalid() {
        let stack = Array3::zeros((3, 3, 2));
        match select_channel(DecodedImage::Multi(stack), ChannelChoice::Auto) {
            ChannelSelection::Invalid(InvalidReason::UnsupportedLayout) => {}
            other => panic!("expected unsupported layout, got {:?}", other),
        }
    }
}
