//! NAU7802 24-bit bridge ADC driver
//!
//! This driver digitizes a quarter-bridge strain gauge. It handles:
//! - Power-up sequencing (reset, digital/analog power, LDO excitation)
//! - PGA gain and conversion-rate configuration
//! - AFE offset/gain calibration
//! - Conversion-ready polling with bounded timeouts and stall recovery
//! - Mean, median and outlier-trimmed estimators over raw samples
//! - Tare (zero offset) and voltage/strain conversion
//!
//! The device has no interrupt line in this design. Freshness is inferred from
//! the conversion-ready flag: wait for it to rise, read the sample, then wait
//! for it to fall so the next read belongs to a new conversion cycle. That
//! last step is best-effort; at high rates the flag can rise again before the
//! poll observes it low.

use super::bus::I2cRegisters;
use super::config::{BridgeConfig, Gain, SampleRate, DEFAULT_VREF};
use super::convert::{raw_to_voltage, sign_extend_24, voltage_to_strain};
use super::error::{BridgeError, BringUpStep};
use super::filter::{self, clamp_samples, AVERAGE_SAMPLES, FILTERED_SAMPLES, MAX_SAMPLES, MEDIAN_SAMPLES};
use super::registers::{ctrl1, ctrl2, power, pu_ctrl, PowerStatus, Register};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

/// Hold time for the register-reset bit, and again after releasing it
const RESET_DELAY_MS: u32 = 10;
/// Settling time after enabling digital and analog power
const POWER_UP_DELAY_MS: u32 = 200;
/// Settling time for the internal LDO
const LDO_SETTLE_MS: u32 = 100;
/// Settling time for the PGA after a gain change
const PGA_SETTLE_MS: u32 = 50;
/// Upper bound on AFE calibration, which typically takes ~350 ms
const CALIBRATION_TIMEOUT_MS: u32 = 500;
/// Time for the first conversion after setting cycle start
const CONVERSION_START_MS: u32 = 100;
/// Conversion-ready poll bound; covers one 10 SPS period with margin
const READY_TIMEOUT_MS: u32 = 500;
/// Bound on waiting for conversion-ready to drop after a read
const READY_CLEAR_TIMEOUT_MS: u32 = 150;
/// Time for CR to update after the data registers are read
const CR_UPDATE_DELAY_MS: u32 = 2;
const POLL_INTERVAL_MS: u32 = 1;

/// Conversion state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub enum ConversionState {
    /// Conversions not started
    Idle,
    /// Cycle start set, waiting for a conversion-ready pulse
    Running,
    /// Conversion-ready observed set and the sample read
    DataReady,
    /// Conversion-ready observed cleared after a read; next pulse is a new sample
    Consumed,
    /// Conversion-ready failed to assert within the poll bound
    Stalled,
}

/// NAU7802 driver instance
///
/// Owns the bus handle, the applied gain and rate, the initialization flag and
/// the zero offset. Not internally synchronized: a single owner drives it, and
/// callers sharing the physical bus must serialize access themselves.
pub struct Nau7802<I, D> {
    bus: I2cRegisters<I>,
    delay: D,
    config: BridgeConfig,
    gain: Gain,
    sample_rate: SampleRate,
    initialized: bool,
    zero_offset: i32,
    state: ConversionState,
}

impl<I: I2c, D: DelayNs> Nau7802<I, D> {
    /// Create a new NAU7802 driver instance
    ///
    /// # Arguments
    /// * `i2c` - Bus the device is attached to
    /// * `delay` - Delay provider used for settling times and polling
    /// * `config` - Address, gain and rate to apply in [`Self::initialize`]
    pub fn new(i2c: I, delay: D, config: BridgeConfig) -> Self {
        Self {
            bus: I2cRegisters::new(i2c, config.address),
            delay,
            config,
            gain: config.gain,
            sample_rate: config.sample_rate,
            initialized: false,
            zero_offset: 0,
            state: ConversionState::Idle,
        }
    }

    /// Whether the last [`Self::initialize`] completed every bring-up step
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current conversion state machine state
    pub fn state(&self) -> ConversionState {
        self.state
    }

    /// Gain from the last successful CTRL1 write
    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Conversion rate from the last successful CTRL2 write
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Raw offset captured by the last tare, in ADC counts
    pub fn zero_offset(&self) -> i32 {
        self.zero_offset
    }

    /// Give back the I2C bus and delay provider
    pub fn release(self) -> (I, D) {
        (self.bus.release(), self.delay)
    }

    /// Check if the device acknowledges its address
    pub async fn is_connected(&mut self) -> bool {
        self.bus.probe().await
    }

    /// Read the conversion-ready (CR) flag
    pub async fn is_data_ready(&mut self) -> Result<bool, BridgeError> {
        self.bus.get_bit(Register::PuCtrl, pu_ctrl::CR).await
    }

    /// Read and decode PU_CTRL
    pub async fn power_status(&mut self) -> Result<PowerStatus, BridgeError> {
        Ok(PowerStatus::from_raw(self.bus.read_register(Register::PuCtrl).await?))
    }

    /// Initialize the NAU7802
    ///
    /// This function:
    /// 1. Probes the device address
    /// 2. Resets all registers
    /// 3. Powers up the digital and analog sections
    /// 4. Enables the LDO for bridge excitation
    /// 5. Applies the configured gain and conversion rate
    /// 6. Calibrates the AFE
    /// 7. Starts conversions
    ///
    /// The handle is marked initialized only once every step has succeeded.
    pub async fn initialize(&mut self) -> Result<PowerStatus, BridgeError> {
        self.initialized = false;
        self.state = ConversionState::Idle;

        if !self.is_connected().await {
            log_error!("NAU7802: Sensor not found at 0x{:02X}", self.bus.address());
            return Err(BridgeError::DeviceNotFound);
        }
        log_info!("NAU7802: Device detected, starting initialization...");
        log_debug!("NAU7802: Config: {:?}", self.config);

        self.power_up().await?;
        self.enable_ldo().await?;

        let config = self.config;
        self.set_gain(config.gain)
            .await
            .map_err(|e| e.during(BringUpStep::Gain))?;
        self.set_sample_rate(config.sample_rate)
            .await
            .map_err(|e| e.during(BringUpStep::SampleRate))?;
        self.calibrate()
            .await
            .map_err(|e| e.during(BringUpStep::Calibration))?;

        let status = self.start_conversions().await?;

        self.initialized = true;
        log_info!("NAU7802: Initialized successfully");
        Ok(status)
    }

    async fn power_up(&mut self) -> Result<(), BridgeError> {
        self.bus
            .set_bit(Register::PuCtrl, pu_ctrl::RR)
            .await
            .map_err(|e| e.during(BringUpStep::Reset))?;
        self.delay.delay_ms(RESET_DELAY_MS).await;

        self.bus
            .clear_bit(Register::PuCtrl, pu_ctrl::RR)
            .await
            .map_err(|e| e.during(BringUpStep::ClearReset))?;
        self.delay.delay_ms(RESET_DELAY_MS).await;

        self.bus
            .set_bit(Register::PuCtrl, pu_ctrl::PUD)
            .await
            .map_err(|e| e.during(BringUpStep::PowerUpDigital))?;
        self.bus
            .set_bit(Register::PuCtrl, pu_ctrl::PUA)
            .await
            .map_err(|e| e.during(BringUpStep::PowerUpAnalog))?;
        self.delay.delay_ms(POWER_UP_DELAY_MS).await;

        // Some parts report power late; a missing flag is only a warning
        let status = self
            .power_status()
            .await
            .map_err(|e| e.during(BringUpStep::PowerCheck))?;
        log_debug!("NAU7802: PU_CTRL = 0x{:02X}", status.raw);
        if !status.analog_powered() {
            log_warn!("NAU7802: Analog power not ready!");
        }
        if !status.digital_powered() {
            log_warn!("NAU7802: Digital power not ready!");
        }
        Ok(())
    }

    async fn enable_ldo(&mut self) -> Result<(), BridgeError> {
        log_info!("NAU7802: Enabling LDO...");
        self.bus
            .modify(Register::Power, 0, power::PGA_LDOMODE)
            .await
            .map_err(|e| e.during(BringUpStep::LdoMode))?;
        self.bus
            .modify(Register::Ctrl1, 0, ctrl1::VLDO_3V3)
            .await
            .map_err(|e| e.during(BringUpStep::LdoVoltage))?;
        self.delay.delay_ms(LDO_SETTLE_MS).await;
        Ok(())
    }

    async fn start_conversions(&mut self) -> Result<PowerStatus, BridgeError> {
        log_info!("NAU7802: Starting conversions...");
        self.bus
            .set_bit(Register::PuCtrl, pu_ctrl::CS)
            .await
            .map_err(|e| e.during(BringUpStep::StartConversions))?;
        self.state = ConversionState::Running;
        self.delay.delay_ms(CONVERSION_START_MS).await;

        let status = self
            .power_status()
            .await
            .map_err(|e| e.during(BringUpStep::StartConversions))?;
        status.log("NAU7802 after CS");
        Ok(status)
    }

    /// Set the PGA gain
    ///
    /// Rewrites CTRL1 bits 0-2 and waits for the PGA to settle. The recorded
    /// gain changes only if the write succeeds. Re-issuing the active gain
    /// repeats the write and the settling delay.
    ///
    /// The zero offset is not rescaled; tare again after changing gain.
    pub async fn set_gain(&mut self, gain: Gain) -> Result<(), BridgeError> {
        self.bus
            .modify(Register::Ctrl1, ctrl1::GAIN_MASK, gain.code())
            .await?;
        self.gain = gain;
        self.delay.delay_ms(PGA_SETTLE_MS).await;
        log_debug!("NAU7802: Gain set to x{}", gain.multiplier());
        Ok(())
    }

    /// Set the conversion rate (CTRL2 bits 4-6)
    ///
    /// Does not start conversions.
    pub async fn set_sample_rate(&mut self, rate: SampleRate) -> Result<(), BridgeError> {
        self.bus
            .modify(Register::Ctrl2, ctrl2::CRS_MASK, rate.code() << ctrl2::CRS_SHIFT)
            .await?;
        self.sample_rate = rate;
        log_debug!("NAU7802: Sample rate set to {} SPS", rate.samples_per_second());
        Ok(())
    }

    /// Run the internal AFE offset/gain calibration
    ///
    /// Sets CALS, polls for it to self-clear within the calibration bound,
    /// then checks CAL_ERR. A part that never clears CALS is checked once the
    /// bound expires, which matches a fixed-delay wait.
    pub async fn calibrate(&mut self) -> Result<(), BridgeError> {
        self.bus.set_bit(Register::Ctrl2, ctrl2::CALS).await?;

        let mut remaining = CALIBRATION_TIMEOUT_MS;
        while self.bus.get_bit(Register::Ctrl2, ctrl2::CALS).await? {
            if remaining == 0 {
                log_debug!("NAU7802: CALS still set after {} ms", CALIBRATION_TIMEOUT_MS);
                break;
            }
            self.delay.delay_ms(POLL_INTERVAL_MS).await;
            remaining -= 1;
        }

        if self.bus.get_bit(Register::Ctrl2, ctrl2::CAL_ERR).await? {
            log_error!("NAU7802: Calibration error!");
            return Err(BridgeError::CalibrationFailure);
        }
        Ok(())
    }

    /// Poll CR until it equals `expected`, for at most `timeout_ms` poll intervals
    async fn wait_for_ready(&mut self, expected: bool, timeout_ms: u32) -> Result<bool, BridgeError> {
        let mut remaining = timeout_ms;
        loop {
            if self.is_data_ready().await? == expected {
                return Ok(true);
            }
            if remaining == 0 {
                return Ok(false);
            }
            self.delay.delay_ms(POLL_INTERVAL_MS).await;
            remaining -= 1;
        }
    }

    /// Read one raw signed 24-bit sample
    ///
    /// Waits up to 500 ms for conversion-ready. On timeout the state machine
    /// moves to [`ConversionState::Stalled`], PU_CTRL is logged, cycle start is
    /// re-asserted once, and [`BridgeError::AcquisitionTimeout`] is returned
    /// whether or not the restart took. The caller decides whether to retry.
    pub async fn read_raw(&mut self) -> Result<i32, BridgeError> {
        if !self.initialized {
            log_error!("NAU7802: Not initialized!");
            return Err(BridgeError::NotInitialized);
        }

        if !self.wait_for_ready(true, READY_TIMEOUT_MS).await? {
            self.state = ConversionState::Stalled;
            log_warn!("NAU7802: Data timeout!");
            self.recover_stalled().await;
            return Err(BridgeError::AcquisitionTimeout);
        }
        self.state = ConversionState::DataReady;

        let mut data = [0u8; 3];
        self.bus.read_register_burst(Register::AdcoB2, &mut data).await?;
        let value = sign_extend_24(data);

        // Wait for CR to drop so the next call waits for a new conversion
        self.delay.delay_ms(CR_UPDATE_DELAY_MS).await;
        match self.wait_for_ready(false, READY_CLEAR_TIMEOUT_MS).await {
            Ok(true) => self.state = ConversionState::Consumed,
            Ok(false) => log_debug!("NAU7802: CR still set after read, next sample may repeat"),
            Err(e) => log_debug!("NAU7802: CR check after read failed: {:?}", e),
        }

        Ok(value)
    }

    /// Single recovery attempt after a data-ready timeout
    async fn recover_stalled(&mut self) {
        match self.power_status().await {
            Ok(status) => status.log("NAU7802 stall"),
            Err(e) => log_error!("NAU7802: Could not read PU_CTRL: {:?}", e),
        }

        log_info!("NAU7802: Attempting to restart conversions...");
        if self.bus.set_bit(Register::PuCtrl, pu_ctrl::CS).await.is_err() {
            log_error!("NAU7802: Failed to set CS bit!");
            return;
        }
        self.delay.delay_ms(CONVERSION_START_MS).await;
        if let Ok(true) = self.is_data_ready().await {
            log_info!("NAU7802: Conversions restarted");
            self.state = ConversionState::Running;
        } else {
            log_warn!("NAU7802: Still no data ready");
        }
    }

    /// Check conversion status and restart conversions if cycle start is clear
    ///
    /// Returns whether a conversion is ready afterwards.
    pub async fn restart_conversions(&mut self) -> Result<bool, BridgeError> {
        let status = self.power_status().await?;
        status.log("NAU7802 restart");

        if !status.cycle_started() {
            log_info!("NAU7802: CS bit not set - starting conversions...");
            self.bus.set_bit(Register::PuCtrl, pu_ctrl::CS).await?;
            self.delay.delay_ms(CONVERSION_START_MS).await;
        }

        let ready = self.is_data_ready().await?;
        if ready {
            self.state = ConversionState::Running;
        } else {
            log_warn!("NAU7802: Still no data ready");
        }
        Ok(ready)
    }

    async fn collect(&mut self, buffer: &mut [i32]) -> Result<(), BridgeError> {
        for slot in buffer.iter_mut() {
            *slot = self.read_raw().await?;
        }
        Ok(())
    }

    /// Arithmetic mean of `samples` raw reads, clamped to 1..=50
    pub async fn read_average(&mut self, samples: u8) -> Result<i32, BridgeError> {
        let count = clamp_samples(samples, &AVERAGE_SAMPLES);
        let mut buffer = [0i32; MAX_SAMPLES];
        self.collect(&mut buffer[..count]).await?;
        Ok(filter::mean(&buffer[..count]))
    }

    /// Median of `samples` raw reads, clamped to 3..=25
    pub async fn read_median(&mut self, samples: u8) -> Result<i32, BridgeError> {
        let count = clamp_samples(samples, &MEDIAN_SAMPLES);
        let mut buffer = [0i32; MAX_SAMPLES];
        self.collect(&mut buffer[..count]).await?;
        Ok(filter::median(&mut buffer[..count]))
    }

    /// Mean of `samples` raw reads with one minimum and one maximum discarded,
    /// clamped to 5..=50
    pub async fn read_filtered(&mut self, samples: u8) -> Result<i32, BridgeError> {
        let count = clamp_samples(samples, &FILTERED_SAMPLES);
        let mut buffer = [0i32; MAX_SAMPLES];
        self.collect(&mut buffer[..count]).await?;
        Ok(filter::trimmed_mean(&buffer[..count]))
    }

    /// Capture the zero offset from an outlier-trimmed batch
    ///
    /// Must be repeated after any gain change. Returns the new offset.
    pub async fn tare(&mut self, samples: u8) -> Result<i32, BridgeError> {
        if !self.initialized {
            log_error!("NAU7802: Not initialized!");
            return Err(BridgeError::NotInitialized);
        }

        log_info!(
            "NAU7802: Taring with {} samples (outliers removed)...",
            clamp_samples(samples, &FILTERED_SAMPLES)
        );
        let offset = self.read_filtered(samples).await?;
        self.zero_offset = offset;
        log_info!("NAU7802: Zero offset set to {}", offset);
        Ok(offset)
    }

    /// One raw sample with the zero offset removed
    pub async fn get_reading(&mut self) -> Result<i32, BridgeError> {
        Ok(self.read_raw().await? - self.zero_offset)
    }

    /// Bridge output voltage for `raw` at the current gain
    pub fn calculate_voltage(&self, raw: i32, vref: f32) -> f32 {
        raw_to_voltage(raw, vref, self.gain)
    }

    /// Quarter-bridge strain for `raw`, using [`DEFAULT_VREF`] for the voltage
    pub fn calculate_strain(&self, raw: i32, excitation: f32, gauge_factor: f32) -> f32 {
        voltage_to_strain(self.calculate_voltage(raw, DEFAULT_VREF), excitation, gauge_factor)
    }
}
