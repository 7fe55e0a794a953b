//! Parameters for the control policy

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    edge_map::EdgeMapParams,
    lane_scan::LaneScanParams,
    lat_ctrl::LatCtrlParams,
    sign_override::SignOverrideParams,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the whole lane-centring controller, loaded from `lane_ctrl.toml`.
///
/// Any missing table or key takes its default value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Throttle demanded when no stop sign is active, as a fraction of the maximum.
    pub cruise_throttle: f64,

    pub edge_map: EdgeMapParams,

    pub lane_scan: LaneScanParams,

    pub sign_override: SignOverrideParams,

    pub lat_ctrl: LatCtrlParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            cruise_throttle: 0.5,
            edge_map: EdgeMapParams::default(),
            lane_scan: LaneScanParams::default(),
            sign_override: SignOverrideParams::default(),
            lat_ctrl: LatCtrlParams::default(),
        }
    }
}
