//! Application layer for the strain node.
//!
//! - [`strain_app`]: owns the bridge ADC and produces conditioned records
//! - [`link_app`]: streams records to the host over USB CDC ACM and forwards
//!   tare requests back

pub mod link_app;
pub mod strain_app;
