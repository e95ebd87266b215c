//! Conditioned strain records and the console reports streamed to the host.
//!
//! One monitor cycle reads a raw sample, a mean batch and a trimmed batch,
//! removes the zero offset and converts to microstrain. The resulting record is
//! rendered as the CSV row the host capture tool parses:
//!
//! ```text
//! elapsed_s,sample_ms,raw,average,filtered,zeroed,strain_uE
//! 12.345,4204,-1203,-1187,-1190,23,4.81
//! ```

use crate::drivers::nau7802::convert::voltage_to_strain;
use crate::drivers::nau7802::{BridgeError, BridgeModel, Nau7802};
use core::fmt;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

/// Console banner printed when a tare starts
pub const TARE_BANNER: &str = "=== TARING STRAIN GAUGE ===";
/// Console line the capture tool waits for after a tare
pub const TARE_SUCCESS: &str = "Strain gauge zeroed successfully!";
pub const TARE_FAILURE: &str = "Failed to zero strain gauge!";
pub const TARE_FOOTER: &str = "===========================";

/// Tunables for the record stream
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub struct MonitorConfig {
    /// Batch size for the average and filtered columns
    pub samples_per_record: u8,
    /// Absolute microstrain above which a record also raises an event
    pub threshold_microstrain: f32,
    /// Batch size used by a tare request
    pub tare_samples: u8,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            samples_per_record: 20,
            threshold_microstrain: 50.0,
            tare_samples: 10,
        }
    }
}

/// One conditioned measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub struct StrainRecord {
    /// Time since the monitor started
    pub elapsed_ms: u64,
    /// Time taken to acquire this record
    pub sample_ms: u32,
    pub raw: i32,
    pub average: i32,
    pub filtered: i32,
    /// Filtered value with the zero offset removed
    pub zeroed: i32,
    pub microstrain: f32,
}

impl fmt::Display for StrainRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03},{},{},{},{},{},{:.2}",
            self.elapsed_ms / 1_000,
            self.elapsed_ms % 1_000,
            self.sample_ms,
            self.raw,
            self.average,
            self.filtered,
            self.zeroed,
            self.microstrain
        )
    }
}

/// Messages from the acquisition task to the serial link
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub enum Report {
    Record(StrainRecord),
    TareStarted,
    TareComplete(i32),
    TareFailed,
    /// A record whose strain exceeded the configured threshold
    Event(StrainRecord),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Record(record) => write!(f, "{}", record),
            Report::TareStarted => f.write_str(TARE_BANNER),
            Report::TareComplete(offset) => {
                write!(f, "{}\r\nZero offset: {}\r\n{}", TARE_SUCCESS, offset, TARE_FOOTER)
            }
            Report::TareFailed => write!(f, "{}\r\n{}", TARE_FAILURE, TARE_FOOTER),
            Report::Event(record) => write!(
                f,
                "!!! EVENT TRIGGERED !!! {:.2} uE at {}.{:03} s",
                record.microstrain,
                record.elapsed_ms / 1_000,
                record.elapsed_ms % 1_000
            ),
        }
    }
}

/// Turns driver reads into [`StrainRecord`]s
pub struct StrainMonitor {
    config: MonitorConfig,
    model: BridgeModel,
    started_ms: u64,
}

impl StrainMonitor {
    /// Create a monitor whose elapsed time counts from `started_ms`
    pub fn new(config: MonitorConfig, model: BridgeModel, started_ms: u64) -> Self {
        Self {
            config,
            model,
            started_ms,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Acquire one record
    ///
    /// `now_ms` reads the monotonic clock; it is sampled before and after the
    /// batch reads to fill the elapsed and sample-duration columns.
    pub async fn sample<I: I2c, D: DelayNs>(
        &self,
        driver: &mut Nau7802<I, D>,
        now_ms: impl Fn() -> u64,
    ) -> Result<StrainRecord, BridgeError> {
        let start = now_ms();

        let raw = driver.read_raw().await?;
        let average = driver.read_average(self.config.samples_per_record).await?;
        let filtered = driver.read_filtered(self.config.samples_per_record).await?;
        let zeroed = filtered - driver.zero_offset();
        let vout = driver.calculate_voltage(zeroed, self.model.vref);
        let microstrain = voltage_to_strain(vout, self.model.excitation, self.model.gauge_factor) * 1e6;

        let finish = now_ms();
        Ok(StrainRecord {
            elapsed_ms: start.saturating_sub(self.started_ms),
            sample_ms: u32::try_from(finish.saturating_sub(start)).unwrap_or(u32::MAX),
            raw,
            average,
            filtered,
            zeroed,
            microstrain,
        })
    }

    /// Whether the record's strain magnitude is above the event threshold
    pub fn exceeds_threshold(&self, record: &StrainRecord) -> bool {
        let magnitude = if record.microstrain < 0.0 {
            -record.microstrain
        } else {
            record.microstrain
        };
        magnitude > self.config.threshold_microstrain
    }

    /// Run a tare and describe the outcome as console reports
    ///
    /// Returns the banner and the result report, in the order they should be sent.
    pub async fn tare<I: I2c, D: DelayNs>(&self, driver: &mut Nau7802<I, D>) -> [Report; 2] {
        match driver.tare(self.config.tare_samples).await {
            Ok(offset) => [Report::TareStarted, Report::TareComplete(offset)],
            Err(e) => {
                log_error!("Tare failed: {:?}", e);
                [Report::TareStarted, Report::TareFailed]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::nau7802::sim::Simulator;
    use crate::drivers::nau7802::Gain;
    use embassy_futures::block_on;
    use std::format;

    fn record(elapsed_ms: u64, microstrain: f32) -> StrainRecord {
        StrainRecord {
            elapsed_ms,
            sample_ms: 4204,
            raw: -1203,
            average: -1187,
            filtered: -1190,
            zeroed: 23,
            microstrain,
        }
    }

    #[test]
    fn record_renders_capture_row() {
        assert_eq!(
            format!("{}", record(12_345, 4.8123)),
            "12.345,4204,-1203,-1187,-1190,23,4.81"
        );
        assert_eq!(
            format!("{}", record(7, -12.349)),
            "0.007,4204,-1203,-1187,-1190,23,-12.35"
        );
    }

    #[test]
    fn tare_reports_use_console_lines() {
        assert_eq!(format!("{}", Report::TareStarted), "=== TARING STRAIN GAUGE ===");
        let done = format!("{}", Report::TareComplete(-42));
        assert!(done.starts_with("Strain gauge zeroed successfully!"));
        assert!(done.contains("-42"));
        assert!(done.ends_with("==========================="));
        assert!(format!("{}", Report::TareFailed).starts_with("Failed to zero strain gauge!"));
    }

    #[test]
    fn threshold_applies_to_magnitude() {
        let monitor = StrainMonitor::new(MonitorConfig::default(), BridgeModel::default(), 0);
        assert!(!monitor.exceeds_threshold(&record(0, 50.0)));
        assert!(monitor.exceeds_threshold(&record(0, 50.5)));
        assert!(monitor.exceeds_threshold(&record(0, -75.0)));
        assert!(!monitor.exceeds_threshold(&record(0, -12.0)));
    }

    #[test]
    fn sample_removes_zero_offset_and_times_the_batch() {
        let sim = Simulator::new();
        sim.with(|state| state.baseline = 1_000);
        let mut driver = sim.driver();
        block_on(driver.initialize()).unwrap();
        block_on(driver.set_gain(Gain::X1)).unwrap();
        block_on(driver.tare(10)).unwrap();

        sim.with(|state| state.baseline = 3_542);
        let monitor = StrainMonitor::new(MonitorConfig::default(), BridgeModel::default(), sim.now_ms());
        let record = block_on(monitor.sample(&mut driver, || sim.now_ms())).unwrap();

        assert_eq!(record.raw, 3_542);
        assert_eq!(record.average, 3_542);
        assert_eq!(record.filtered, 3_542);
        assert_eq!(record.zeroed, 2_542);
        // 2542 counts at unity gain is ~1 mV, ~606 microstrain
        assert!((record.microstrain - 606.06).abs() < 0.5, "{}", record.microstrain);
        // One raw read plus two 20-sample batches at 10 SPS
        assert!(record.sample_ms >= 4_000, "{}", record.sample_ms);
        assert!(record.elapsed_ms < 100);
    }

    #[test]
    fn strain_follows_model_reference_voltage() {
        let sim = Simulator::new();
        sim.with(|state| state.baseline = 2_542);
        let mut driver = sim.driver();
        block_on(driver.initialize()).unwrap();
        block_on(driver.set_gain(Gain::X1)).unwrap();

        let config = MonitorConfig {
            samples_per_record: 5,
            ..MonitorConfig::default()
        };
        let full = StrainMonitor::new(config, BridgeModel::default(), 0);
        let reduced = StrainMonitor::new(
            config,
            BridgeModel {
                vref: 1.2,
                ..BridgeModel::default()
            },
            0,
        );

        let at_full = block_on(full.sample(&mut driver, || sim.now_ms())).unwrap();
        let at_reduced = block_on(reduced.sample(&mut driver, || sim.now_ms())).unwrap();

        assert_eq!(at_full.zeroed, at_reduced.zeroed);
        assert!((at_full.microstrain - 606.06).abs() < 0.5, "{}", at_full.microstrain);
        let expected = at_full.microstrain * 1.2 / 3.3;
        assert!((at_reduced.microstrain - expected).abs() < 0.01, "{}", at_reduced.microstrain);
    }

    #[test]
    fn sample_propagates_stall() {
        let sim = Simulator::new();
        let mut driver = sim.driver();
        block_on(driver.initialize()).unwrap();
        sim.with(|state| state.stalled = true);

        let monitor = StrainMonitor::new(MonitorConfig::default(), BridgeModel::default(), 0);
        assert_eq!(
            block_on(monitor.sample(&mut driver, || sim.now_ms())),
            Err(BridgeError::AcquisitionTimeout)
        );
    }

    #[test]
    fn tare_outcome_maps_to_reports() {
        let sim = Simulator::new();
        sim.with(|state| state.baseline = -77);
        let mut driver = sim.driver();
        let monitor = StrainMonitor::new(MonitorConfig::default(), BridgeModel::default(), 0);

        assert_eq!(block_on(monitor.tare(&mut driver)), [Report::TareStarted, Report::TareFailed]);

        block_on(driver.initialize()).unwrap();
        assert_eq!(
            block_on(monitor.tare(&mut driver)),
            [Report::TareStarted, Report::TareComplete(-77)]
        );
    }
}
