//! # Communications interface crate.
//!
//! Provides the data contracts shared between the drive controller and its
//! collaborators: the simulator telemetry, the camera and the traffic sign
//! classifier.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment interfaces (camera frames)
pub mod eqpt;

/// Traffic sign classifier output
pub mod sign;

/// Telemetry and control messages exchanged with the simulator
pub mod telemetry;
