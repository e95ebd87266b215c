//! Strain acquisition task.
//!
//! Owns the NAU7802 driver for the lifetime of the firmware. Each cycle produces
//! one conditioned record; tare requests from the serial link are served
//! between cycles. Reports are queued for the link app and dropped when the
//! queue is full so a missing host never stalls acquisition.

use crate::peripherals::{new_bridge_i2c, i2c::BridgeI2cClaims, BridgeI2c};
use defmt::{error, info, warn};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Delay, Duration, Instant, Timer};
use strainnode::drivers::nau7802::{BridgeConfig, BridgeError, BridgeModel, Nau7802};
use strainnode::record::{MonitorConfig, Report, StrainMonitor};

/// Reports waiting to be sent to the host
pub static REPORTS: Channel<CriticalSectionRawMutex, Report, 8> = Channel::new();

/// Set by the link app when the host asks for a tare
pub static TARE_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Delay before retrying after a bring-up or bus failure
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct StrainApp<'d> {
    bridge: Nau7802<BridgeI2c<'d>, Delay>,
    monitor: StrainMonitor,
}

impl<'d> StrainApp<'d> {
    pub fn new(i2c: BridgeI2c<'d>, config: BridgeConfig, monitor: MonitorConfig) -> Self {
        Self {
            bridge: Nau7802::new(i2c, Delay, config),
            monitor: StrainMonitor::new(monitor, BridgeModel::default(), Instant::now().as_millis()),
        }
    }

    fn publish(report: Report) {
        if REPORTS.try_send(report).is_err() {
            warn!("Report queue full, dropping report");
        }
    }

    /// Bring up the bridge ADC and stream records until the bus fails
    ///
    /// Only returns on bring-up failure or a bus error; acquisition timeouts
    /// are logged and the next cycle retries.
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        info!("Starting strain task - initializing NAU7802...");
        let status = self.bridge.initialize().await?;
        info!("NAU7802 ready, PU_CTRL = {=u8:#04x}", status.raw);

        // Zero against whatever load is present at power-up
        for report in self.monitor.tare(&mut self.bridge).await {
            Self::publish(report);
        }

        loop {
            if TARE_REQUEST.try_take().is_some() {
                for report in self.monitor.tare(&mut self.bridge).await {
                    Self::publish(report);
                }
            }

            match self.monitor.sample(&mut self.bridge, || Instant::now().as_millis()).await {
                Ok(record) => {
                    Self::publish(Report::Record(record));
                    if self.monitor.exceeds_threshold(&record) {
                        info!("Strain event: {} uE", record.microstrain);
                        Self::publish(Report::Event(record));
                    }
                }
                Err(BridgeError::AcquisitionTimeout) => {
                    warn!("Strain sample timed out, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Embassy task running the strain acquisition with error recovery.
///
/// A failed bring-up or bus error is logged and the whole sequence restarts
/// after five seconds.
#[embassy_executor::task]
pub async fn task(claims: BridgeI2cClaims<'static>) -> ! {
    let i2c = new_bridge_i2c(claims);
    let mut app = StrainApp::new(i2c, BridgeConfig::default(), MonitorConfig::default());

    loop {
        match app.run().await {
            Ok(()) => info!("Strain task unexpectedly returned Ok(())"),
            Err(e) => {
                error!("Strain task error: {:?}, restarting in 5 seconds...", e);
                Timer::after(RETRY_DELAY).await;
            }
        }
    }
}
