//! Strain node acquisition library.
//!
//! Hardware-independent half of the strain node firmware:
//! - [`drivers::nau7802`]: the 24-bit bridge ADC driver (bring-up, calibration,
//!   conversion-ready state machine, estimators, tare and unit conversion)
//! - [`record`]: conditioned strain records and the console reports streamed to
//!   the host logger
//!
//! Everything here is generic over `embedded-hal-async` traits so it runs
//! unchanged on the STM32H753 and under host unit tests.

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod logging;

pub mod drivers;
pub mod record;
