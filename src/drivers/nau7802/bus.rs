//! Register transport for the NAU7802 over an async I2C bus.

use super::error::BridgeError;
use super::registers::Register;
use embedded_hal_async::i2c::I2c;

/// Register-level access to one device on a shared I2C bus.
///
/// All transactions are single-byte register writes, or a 1-byte register
/// address write followed by an N-byte read. Any bus failure is reported as
/// [`BridgeError::Bus`].
pub struct I2cRegisters<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> I2cRegisters<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check that the device acknowledges its address
    ///
    /// An empty write is the cheapest transaction that exercises the address phase.
    pub async fn probe(&mut self) -> bool {
        self.i2c.write(self.address, &[]).await.is_ok()
    }

    /// Read a single register
    pub async fn read_register(&mut self, reg: Register) -> Result<u8, BridgeError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg.addr()], &mut value)
            .await
            .map_err(|_| BridgeError::Bus)?;
        Ok(value[0])
    }

    /// Write a single register
    pub async fn write_register(&mut self, reg: Register, value: u8) -> Result<(), BridgeError> {
        self.i2c
            .write(self.address, &[reg.addr(), value])
            .await
            .map_err(|_| BridgeError::Bus)
    }

    /// Read consecutive registers starting at `reg`
    ///
    /// The NAU7802 auto-increments the register pointer, so one transaction
    /// returns `buffer.len()` registers.
    pub async fn read_register_burst(&mut self, reg: Register, buffer: &mut [u8]) -> Result<(), BridgeError> {
        self.i2c
            .write_read(self.address, &[reg.addr()], buffer)
            .await
            .map_err(|_| BridgeError::Bus)
    }

    /// Read-modify-write: clear `mask`, then OR in `bits`
    pub async fn modify(&mut self, reg: Register, mask: u8, bits: u8) -> Result<(), BridgeError> {
        let value = self.read_register(reg).await?;
        self.write_register(reg, (value & !mask) | bits).await
    }

    pub async fn set_bit(&mut self, reg: Register, bit: u8) -> Result<(), BridgeError> {
        self.modify(reg, 0, 1 << bit).await
    }

    pub async fn clear_bit(&mut self, reg: Register, bit: u8) -> Result<(), BridgeError> {
        self.modify(reg, 1 << bit, 0).await
    }

    pub async fn get_bit(&mut self, reg: Register, bit: u8) -> Result<bool, BridgeError> {
        Ok(self.read_register(reg).await? & (1 << bit) != 0)
    }

    /// Give back the I2C bus
    pub fn release(self) -> I {
        self.i2c
    }
}
