//! # Equipment Interface
//!
//! This module defines the interface structures produced by the vehicle's equipment.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Camera frames
pub mod cam;
