//! Parameters for the edge map pipeline

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::FrameSize;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the edge map pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EdgeMapParams {
    /// Size every incoming frame must have.
    ///
    /// Units: pixels
    pub frame_size: FrameSize,

    /// Side length of the square Gaussian smoothing kernel. Must be odd.
    ///
    /// Units: pixels
    pub blur_kernel_size: usize,

    /// Canny hysteresis low threshold, on the L1 gradient magnitude.
    pub canny_low_threshold: i32,

    /// Canny hysteresis high threshold, on the L1 gradient magnitude.
    pub canny_high_threshold: i32,

    /// Birdview warp geometry
    pub birdview: BirdviewParams,
}

/// Geometry of the birdview warp.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BirdviewParams {
    /// Size of the warped output canvas.
    ///
    /// Units: pixels
    pub output_size: FrameSize,

    /// The upper source points sit at `height / horizon_divisor`.
    pub horizon_divisor: u32,

    /// Distance the bottom corners are moved inwards in the output.
    ///
    /// Units: pixels
    pub bottom_inset_px: f64,

    /// Distance the upper points are moved outwards past the canvas edges in the output.
    ///
    /// Units: pixels
    pub top_overshoot_px: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for EdgeMapParams {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::default(),
            blur_kernel_size: 11,
            canny_low_threshold: 150,
            canny_high_threshold: 200,
            birdview: BirdviewParams::default(),
        }
    }
}

impl Default for BirdviewParams {
    fn default() -> Self {
        Self {
            output_size: FrameSize::default(),
            horizon_divisor: 3,
            bottom_inset_px: 90.0,
            top_overshoot_px: 10.0,
        }
    }
}
