//! # Lane boundary scanner
//!
//! Finds the left and right lane boundaries on a single row of the edge map by scanning outwards
//! from the image centre.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use crate::edge_map::EdgeMap;
use crate::sign_override::OverrideState;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Value of a boundary coordinate which was not found.
pub const NOT_FOUND: i32 = -1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the scanner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LaneScanParams {
    /// Height of the scan row as a fraction of the map height, rounded down.
    pub scan_row_fraction: f64,

    /// Assumed lane width used to place a boundary that was not seen.
    ///
    /// Units: pixels
    pub lane_width_px: i32,
}

/// The scanner itself.
#[derive(Debug, Clone, Default)]
pub struct LaneScanner {
    params: LaneScanParams,
}

/// Boundaries found on the scan row.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BoundaryPair {
    /// Left boundary column, or `NOT_FOUND`
    pub left_x: i32,

    /// Right boundary column, or `NOT_FOUND`
    pub right_x: i32,

    /// Centre column of the image
    pub center_x: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LaneScanParams {
    fn default() -> Self {
        Self {
            scan_row_fraction: 0.7,
            lane_width_px: 100,
        }
    }
}

impl LaneScanner {
    pub fn new(params: LaneScanParams) -> Self {
        Self { params }
    }

    /// Row of the map which gets scanned.
    pub fn scan_row(&self, map: &EdgeMap) -> u32 {
        let y = (map.height() as f64 * self.params.scan_row_fraction).floor();
        (y.max(0.0) as u32).min(map.height().saturating_sub(1))
    }

    /// Scan the edge map for the lane boundaries.
    ///
    /// The raw boundaries are found with [`find_boundaries`](Self::find_boundaries), then the
    /// override removes the boundary opposite to each active sign direction, and finally if only
    /// one boundary is left the other one is placed a lane width away from it.
    pub fn scan(&self, map: &EdgeMap, overrides: &OverrideState) -> BoundaryPair {
        let raw = self.find_boundaries(map);
        let pair = raw
            .apply_override(overrides)
            .fill_missing(self.params.lane_width_px);

        trace!("Scan: raw {:?}, final {:?}", raw, pair);

        pair
    }

    /// Find the boundaries on the scan row without any override or fallback.
    ///
    /// Scanning runs leftwards from the centre column down to column 1, and rightwards from the
    /// column after the centre up to the last column.
    pub fn find_boundaries(&self, map: &EdgeMap) -> BoundaryPair {
        let width = map.width() as i32;
        let center_x = width / 2;

        if map.height() == 0 || width == 0 {
            return BoundaryPair::none(center_x);
        }

        let y = self.scan_row(map);

        let left_x = (1..=center_x)
            .rev()
            .find(|&x| map.is_evidence(x as u32, y))
            .unwrap_or(NOT_FOUND);
        let right_x = (center_x + 1..width)
            .find(|&x| map.is_evidence(x as u32, y))
            .unwrap_or(NOT_FOUND);

        BoundaryPair {
            left_x,
            right_x,
            center_x,
        }
    }
}

impl BoundaryPair {
    /// A pair with neither boundary found.
    pub fn none(center_x: i32) -> Self {
        Self {
            left_x: NOT_FOUND,
            right_x: NOT_FOUND,
            center_x,
        }
    }

    /// Drop the boundary opposite to each active override.
    ///
    /// A right sign means the road bends right, so the left boundary is treated as not found,
    /// and the other way round for a left sign.
    pub fn apply_override(mut self, overrides: &OverrideState) -> Self {
        if overrides.force_right {
            self.left_x = NOT_FOUND;
        }
        if overrides.force_left {
            self.right_x = NOT_FOUND;
        }
        self
    }

    /// If exactly one boundary is missing place it `lane_width` away from the other.
    pub fn fill_missing(mut self, lane_width: i32) -> Self {
        match (self.left_x, self.right_x) {
            (NOT_FOUND, NOT_FOUND) => (),
            (l, NOT_FOUND) => self.right_x = l + lane_width,
            (NOT_FOUND, r) => self.left_x = r - lane_width,
            _ => (),
        }
        self
    }

    /// Returns true if both boundaries are known.
    pub fn is_complete(&self) -> bool {
        self.left_x != NOT_FOUND && self.right_x != NOT_FOUND
    }

    /// Offset of the lane centre from the image centre, positive when the lane centre is to the
    /// right. `None` unless both boundaries are known.
    pub fn lateral_offset(&self) -> Option<i32> {
        if self.is_complete() {
            Some((self.left_x + self.right_x).div_euclid(2) - self.center_x)
        } else {
            None
        }
    }
}
