//! Gain, sample-rate and model configuration for the NAU7802.

/// Default 7-bit I2C address of the NAU7802
pub const DEFAULT_ADDRESS: u8 = 0x2A;

/// Reference voltage used when the caller has no better value
pub const DEFAULT_VREF: f32 = 3.3;

/// Gauge factor of a typical metal foil strain gauge
pub const DEFAULT_GAUGE_FACTOR: f32 = 2.0;

/// Programmable gain amplifier setting.
///
/// The discriminant is the 3-bit CTRL1 code; the multiplier is `2^code`.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub enum Gain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
    X128 = 7,
}

impl Gain {
    pub const ALL: [Gain; 8] = [
        Gain::X1,
        Gain::X2,
        Gain::X4,
        Gain::X8,
        Gain::X16,
        Gain::X32,
        Gain::X64,
        Gain::X128,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn multiplier(self) -> u32 {
        1 << self.code()
    }
}

/// Output conversion rate.
///
/// Selecting a rate does not start conversions; that is the PU_CTRL cycle-start bit.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub enum SampleRate {
    Sps10 = 0,
    Sps20 = 1,
    Sps40 = 2,
    Sps80 = 3,
    Sps320 = 7,
}

impl SampleRate {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn samples_per_second(self) -> u32 {
        match self {
            SampleRate::Sps10 => 10,
            SampleRate::Sps20 => 20,
            SampleRate::Sps40 => 40,
            SampleRate::Sps80 => 80,
            SampleRate::Sps320 => 320,
        }
    }

    /// Nominal time between conversion-ready pulses
    pub const fn period_us(self) -> u32 {
        1_000_000 / self.samples_per_second()
    }
}

/// Bring-up configuration for the bridge ADC
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub struct BridgeConfig {
    /// 7-bit bus address
    pub address: u8,
    /// PGA gain applied during initialization
    pub gain: Gain,
    /// Conversion rate applied during initialization
    pub sample_rate: SampleRate,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            // 128x saturates with the node's 365R completion resistors against a 350R gauge
            gain: Gain::X32,
            // Slowest rate gives the best noise rejection
            sample_rate: SampleRate::Sps10,
        }
    }
}

/// Electrical model of the quarter bridge used for unit conversion
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub struct BridgeModel {
    /// ADC reference voltage in volts
    pub vref: f32,
    /// Bridge excitation voltage in volts
    pub excitation: f32,
    /// Strain gauge gauge factor
    pub gauge_factor: f32,
}

impl Default for BridgeModel {
    fn default() -> Self {
        Self {
            vref: DEFAULT_VREF,
            excitation: 3.3,
            gauge_factor: DEFAULT_GAUGE_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_multiplier_is_two_to_the_code() {
        for (index, gain) in Gain::ALL.iter().enumerate() {
            assert_eq!(gain.code() as usize, index);
            assert_eq!(gain.multiplier(), 1 << index);
        }
    }

    #[test]
    fn slowest_rate_period_fits_inside_ready_timeout() {
        assert_eq!(SampleRate::Sps10.period_us(), 100_000);
        assert_eq!(SampleRate::Sps320.code(), 7);
    }
}
