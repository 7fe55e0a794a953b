//! # Control policy
//!
//! Runs the edge map pipeline, the sign override, the lane scanner and the lateral controller
//! for each frame, and derives the throttle from the stop sign channel.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use crate::edge_map::EdgeMapError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while processing a frame.
#[derive(Debug, thiserror::Error)]
pub enum CtrlPolicyError {
    #[error("Could not build the edge map: {0}")]
    EdgeMapError(#[from] EdgeMapError),
}

/// Errors raised while initialising the controller.
#[derive(Debug, thiserror::Error)]
pub enum CtrlPolicyInitError {
    #[error("Could not load the parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Could not create the archives: {0}")]
    ArchiveError(#[from] ArchiveError),
}
