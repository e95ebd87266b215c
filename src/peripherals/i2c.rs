//! I2C bus for the strain-gauge bridge ADC.
//!
//! The NAU7802 sits alone on I2C1 (PB6/PB7). Transfers use DMA so the
//! executor can run the serial link while a register burst is in flight.

use embassy_stm32::{
    bind_interrupts,
    i2c::{self, Config as I2cConfig, I2c},
    mode::Async,
    peripherals::{self as stm32_peripherals, DMA1_CH2, DMA1_CH3, I2C1, PB6, PB7},
    time::Hertz,
    Peri,
};

/// Peripheral collection for the bridge ADC bus
pub struct BridgeI2cClaims<'d> {
    pub i2c1: Peri<'d, I2C1>,
    pub scl: Peri<'d, PB6>,
    pub sda: Peri<'d, PB7>,
    pub dma_tx: Peri<'d, DMA1_CH2>,
    pub dma_rx: Peri<'d, DMA1_CH3>,
}

/// Macro to claim peripherals for the bridge ADC bus
#[macro_export]
macro_rules! claim_bridge_i2c {
    ($peripherals:expr) => {{
        $crate::peripherals::i2c::BridgeI2cClaims {
            i2c1: $peripherals.I2C1,
            scl: $peripherals.PB6,
            sda: $peripherals.PB7,
            dma_tx: $peripherals.DMA1_CH2,
            dma_rx: $peripherals.DMA1_CH3,
        }
    }};
}

bind_interrupts!(
    /// I2C1 event and error handlers
    pub struct BridgeI2cInterrupts {
        I2C1_EV => i2c::EventInterruptHandler<stm32_peripherals::I2C1>;
        I2C1_ER => i2c::ErrorInterruptHandler<stm32_peripherals::I2C1>;
    }
);

/// Standard-mode clock; the bridge runs off long field cabling
const BRIDGE_I2C_FREQUENCY: Hertz = Hertz(100_000);

/// Async I2C handle implementing `embedded_hal_async::i2c::I2c`
pub type BridgeI2c<'d> = I2c<'d, Async>;

/// Create the bridge ADC bus
pub fn new_bridge_i2c(claims: BridgeI2cClaims<'_>) -> BridgeI2c<'_> {
    let mut config = I2cConfig::default();
    config.frequency = BRIDGE_I2C_FREQUENCY;
    // The breakout board carries its own pull-ups
    config.scl_pullup = false;
    config.sda_pullup = false;

    I2c::new(
        claims.i2c1,
        claims.scl,
        claims.sda,
        BridgeI2cInterrupts,
        claims.dma_tx,
        claims.dma_rx,
        config,
    )
}
