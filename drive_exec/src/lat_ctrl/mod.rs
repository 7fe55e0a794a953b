//! # Lateral control
//!
//! Converts the lateral offset of the lane centre into a steering demand using a continuous-time
//! PID controller.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod pid;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

pub use pid::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Lateral controller tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatCtrlParams {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Target lateral offset.
    ///
    /// Units: pixels
    pub setpoint: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LatCtrlParams {
    fn default() -> Self {
        Self {
            k_p: 0.03,
            k_i: 0.0,
            k_d: 0.0,
            setpoint: 0.0,
        }
    }
}
