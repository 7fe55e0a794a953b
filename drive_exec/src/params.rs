//! # Drive Executable Parameters
//!
//! This module provide parameters for the replay executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveExecParams {
    /// Target period of one cycle, 0 runs as fast as possible.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Save the debug images on every nth frame, 0 disables saving.
    pub debug_image_interval: u64,

    /// Stop after this many frames, 0 for no limit.
    pub max_frames: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriveExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.0,
            debug_image_interval: 0,
            max_frames: 0,
        }
    }
}

impl DriveExecParams {
    /// Returns true if `num_frames` frames is the configured limit.
    pub fn frame_limit_reached(&self, num_frames: u64) -> bool {
        self.max_frames > 0 && num_frames >= self.max_frames
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_limit() {
        let mut params = DriveExecParams::default();
        assert!(!params.frame_limit_reached(1_000_000));

        params.max_frames = 3;
        assert!(!params.frame_limit_reached(2));
        assert!(params.frame_limit_reached(3));
    }

    #[test]
    fn test_load() {
        let params: DriveExecParams =
            util::params::from_str("cycle_period_s = 0.05\ndebug_image_interval = 10").unwrap();

        assert_eq!(params.cycle_period_s, 0.05);
        assert_eq!(params.debug_image_interval, 10);
        assert_eq!(params.max_frames, 0);
    }
}
