//! # Sign override
//!
//! Remembers when directional signs were last seen and keeps an override active for a fixed
//! window afterwards. While an override is active the lane scanner drops the boundary opposite to
//! the sign's direction, biasing the lane centre towards the turn.
//!
//! This is a level triggered timer: a single detection arms the window, detections inside the
//! window extend it, and there is no debouncing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::sign::SignVector;
use log::debug;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignOverrideParams {
    /// How long an override lasts after the last detection.
    ///
    /// Units: seconds
    pub window_s: f64,
}

/// Time-decaying memory of directional sign detections.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct OverrideState {
    /// Last time a left-indicating sign was seen, `None` if never.
    ///
    /// Units: seconds, on the controller's clock
    pub last_left_seen_s: Option<f64>,

    /// Last time a right-indicating sign was seen, `None` if never.
    ///
    /// Units: seconds, on the controller's clock
    pub last_right_seen_s: Option<f64>,

    /// The right boundary shall be treated as not found.
    pub force_left: bool,

    /// The left boundary shall be treated as not found.
    pub force_right: bool,
}

/// The override state together with its parameters.
#[derive(Debug, Clone, Default)]
pub struct SignOverride {
    params: SignOverrideParams,
    state: OverrideState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SignOverrideParams {
    fn default() -> Self {
        Self { window_s: 2.0 }
    }
}

impl SignOverride {
    pub fn new(params: SignOverrideParams) -> Self {
        Self {
            params,
            state: OverrideState::default(),
        }
    }

    /// Update the override from this frame's sign vector and return a snapshot of the new state.
    pub fn update(&mut self, signs: &SignVector, now_s: f64) -> OverrideState {
        let prev = self.state;
        self.state.update(signs, now_s, self.params.window_s);

        if prev.force_left != self.state.force_left {
            debug!("Left sign override {}", on_off(self.state.force_left));
        }
        if prev.force_right != self.state.force_right {
            debug!("Right sign override {}", on_off(self.state.force_right));
        }

        self.state
    }

    /// Current state without updating.
    pub fn state(&self) -> &OverrideState {
        &self.state
    }
}

impl OverrideState {
    /// Record the detections in `signs` at `now_s` and recompute both flags.
    pub fn update(&mut self, signs: &SignVector, now_s: f64, window_s: f64) -> &Self {
        if signs.right_indicated() {
            self.last_right_seen_s = Some(now_s);
        }
        if signs.left_indicated() {
            self.last_left_seen_s = Some(now_s);
        }

        self.force_left = within(self.last_left_seen_s, now_s, window_s);
        self.force_right = within(self.last_right_seen_s, now_s, window_s);

        self
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn within(last_seen_s: Option<f64>, now_s: f64, window_s: f64) -> bool {
    match last_seen_s {
        Some(t) => now_s - t < window_s,
        None => false,
    }
}

fn on_off(active: bool) -> &'static str {
    if active {
        "armed"
    } else {
        "expired"
    }
}
