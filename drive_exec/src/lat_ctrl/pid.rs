//! PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use super::LatCtrlParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Substituted for a zero time step, and for the state change on the first call.
pub const PID_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
///
/// The derivative term is computed from the change in the measured state rather than the change
/// in error. With a constant setpoint the two are the same.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Target value of the measured state
    setpoint: f64,

    /// The integral accumulation, already scaled by `k_i`
    integral: f64,

    /// Previous measured state
    prev_state: Option<f64>,

    /// Time of the previous sample
    prev_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    ///
    /// `start_time_s` is used as the previous sample time for the first call.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, setpoint: f64, start_time_s: f64) -> Self {
        Self {
            k_p, k_i, k_d, setpoint,
            integral: 0f64,
            prev_state: None,
            prev_time_s: start_time_s,
        }
    }

    /// Create a new controller from the parameters.
    pub fn from_params(params: &LatCtrlParams, start_time_s: f64) -> Self {
        Self::new(params.k_p, params.k_i, params.k_d, params.setpoint, start_time_s)
    }

    /// Get the value of the controller for the given measured state at time `now_s`.
    ///
    /// The controller's memory (previous state and time) is updated on every call.
    pub fn step(&mut self, state: f64, now_s: f64) -> f64 {
        let error = self.setpoint - state;

        // Change in state, first call has nothing to compare against
        let d_state = match self.prev_state {
            Some(s) => state - s,
            None => PID_EPSILON
        };
        let d_error = -d_state;

        let mut dt = now_s - self.prev_time_s;
        if dt == 0.0 {
            dt = PID_EPSILON;
        }

        // Integral is unbounded
        self.integral += self.k_i * error * dt;

        let proportional = self.k_p * error;
        let derivative = self.k_d * d_error / dt;

        let out = proportional + self.integral + derivative;

        trace!(
            "PID: error {:.3}, p {:.4}, i {:.4}, d {:.4}, dt {:.4}",
            error, proportional, self.integral, derivative, dt
        );

        // Remember the previous state and time
        self.prev_state = Some(state);
        self.prev_time_s = now_s;

        out
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_state(&self) -> Option<f64> {
        self.prev_state
    }

    pub fn prev_time_s(&self) -> f64 {
        self.prev_time_s
    }
}
