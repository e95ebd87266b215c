//! Hardware drivers for the strain node.
//!
//! This module contains device drivers for the sensors on the node's
//! acquisition bus.

/// NAU7802 24-bit bridge ADC driver
pub mod nau7802;
