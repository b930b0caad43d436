//! Bit-depth detection and threshold scaling for mixed-depth image batches.
//!
//! Microscopy exports frequently mix nominal bit depths within one directory
//! (8-bit overviews alongside 12- or 16-bit captures). Thresholds are entered
//! in 8-bit display units and scaled to raw intensity units by a per-depth
//! multiplier, so the depth tracked for a batch must not drift downward once
//! a high-depth image has been seen.

use log::info;

/// Nominal intensity depth of an image, classified from its brightest pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BitDepth {
    /// Values below 256
    Eight,
    /// Values in [256, 1024)
    Ten,
    /// Values in [1024, 4096)
    Twelve,
    /// Everything above
    Sixteen,
}

impl BitDepth {
    /// Classify a raw maximum pixel value into a depth tier.
    pub fn classify(max_value: u16) -> Self {
        match max_value {
            0..=255 => BitDepth::Eight,
            256..=1023 => BitDepth::Ten,
            1024..=4095 => BitDepth::Twelve,
            _ => BitDepth::Sixteen,
        }
    }

    /// Factor converting display-unit thresholds (0..256) to raw intensity units.
    pub fn multiplier(self) -> u32 {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Ten => 4,
            BitDepth::Twelve => 16,
            BitDepth::Sixteen => 256,
        }
    }

    /// Exclusive upper bound of the raw intensity range at this depth.
    pub fn max_range(self) -> u32 {
        match self {
            BitDepth::Eight => 256,
            BitDepth::Ten => 1024,
            BitDepth::Twelve => 4096,
            BitDepth::Sixteen => 65536,
        }
    }

    /// Human-readable name, as logged and shown to users.
    pub fn label(self) -> &'static str {
        match self {
            BitDepth::Eight => "8-bit",
            BitDepth::Ten => "10-bit",
            BitDepth::Twelve => "12-bit",
            BitDepth::Sixteen => "16-bit",
        }
    }
}

/// Batch-scoped depth tracking state.
///
/// Transitions are pure: `observe` and `lock` return the successor state and
/// never mutate in place, which keeps the monotonic-upgrade invariant easy to
/// test in isolation. Within an auto-detecting batch the depth only ever
/// increases; it is reset explicitly when a new run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    depth: BitDepth,
    locked: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        DepthState {
            depth: BitDepth::Eight,
            locked: false,
        }
    }
}

impl DepthState {
    /// State pinned to an explicit user-chosen depth. Detection is disabled.
    pub fn manual(depth: BitDepth) -> Self {
        DepthState {
            depth,
            locked: true,
        }
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Shorthand for the multiplier of the currently tracked depth.
    pub fn multiplier(&self) -> u32 {
        self.depth.multiplier()
    }

    /// Feed the maximum pixel value of a newly decoded image through detection.
    ///
    /// No-op when locked. Otherwise upgrades to the detected depth only when
    /// it is strictly higher than the tracked one; a depth change is logged so
    /// the caller's event sink picks it up.
    #[must_use]
    pub fn observe(self, max_value: u16) -> Self {
        if self.locked {
            return self;
        }
        let detected = BitDepth::classify(max_value);
        if detected > self.depth {
            info!("Detected bit depth: {}", detected.label());
            DepthState {
                depth: detected,
                locked: false,
            }
        } else {
            self
        }
    }

    /// Pin the current depth for the remainder of the batch.
    #[must_use]
    pub fn lock(self) -> Self {
        DepthState {
            depth: self.depth,
            locked: true,
        }
    }

    /// Restore the 8-bit auto-detecting baseline (new directory or new run).
    #[must_use]
    pub fn reset(self) -> Self {
        DepthState::default()
    }
}
