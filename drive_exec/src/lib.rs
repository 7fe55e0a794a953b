//! # Drive library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the drive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Clock sources - monotonic time for the controller and a settable clock for tests
pub mod clock;

/// Control policy - runs the whole lane-centring controller for each frame
pub mod ctrl_policy;

/// Data store - global state of the replay executable
pub mod data_store;

/// Debug images - optional observation of the intermediate pipeline images
pub mod debug_img;

/// Edge map pipeline - converts a camera frame into a birdview edge map
pub mod edge_map;

/// Lane scanner - finds the lane boundaries on the edge map
pub mod lane_scan;

/// Lateral control - PID controller converting lane offset into steering
pub mod lat_ctrl;

/// Executable parameters
pub mod params;

/// Sign feed - bounded channel from the sign classifier
pub mod sign_feed;

/// Sign override - time-decaying memory of directional signs
pub mod sign_override;
