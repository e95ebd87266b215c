//! NAU7802 24-bit strain-gauge bridge ADC
//!
//! The node digitizes a single quarter-bridge strain gauge through the NAU7802
//! over I2C. The driver is split by concern:
//! - `registers`: register map and PU_CTRL decoding
//! - `bus`: register transport over `embedded-hal-async` I2C
//! - `config`: gain, rate and bridge model
//! - `filter`: mean, median and trimmed-mean estimators
//! - `convert`: sign extension and voltage/strain conversion
//! - `driver`: bring-up, calibration and the conversion state machine

pub mod bus;
pub mod config;
pub mod convert;
pub mod driver;
pub mod error;
pub mod filter;
pub mod registers;

#[cfg(test)]
pub mod sim;

pub use config::{BridgeConfig, BridgeModel, Gain, SampleRate};
pub use driver::{ConversionState, Nau7802};
pub use error::{BridgeError, BringUpStep};
pub use registers::PowerStatus;
