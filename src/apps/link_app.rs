//! Serial link between the strain task and the host capture tool.
//!
//! Outbound, every [`Report`] is rendered as text lines terminated by CRLF.
//! Inbound, the single byte `z` requests a tare; anything else is ignored.

use super::strain_app::{REPORTS, TARE_REQUEST};
use crate::peripherals::usb_system::MAX_PACKET_SIZE;
use crate::peripherals::{AcmConnection, Disconnected};
use core::fmt::Write;
use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_time::Timer;
use heapless::String;
use strainnode::record::Report;

const BUFFER_SIZE: usize = MAX_PACKET_SIZE as usize;

/// Longest rendered report, including the CRLF
const LINE_CAPACITY: usize = 128;

/// Host command requesting a tare
const TARE_COMMAND: u8 = b'z';

const RECONNECT_DELAY_MS: u64 = 100;

pub struct LinkApp<'d> {
    acm: AcmConnection<'d>,
}

impl<'d> LinkApp<'d> {
    pub const fn new(acm: AcmConnection<'d>) -> Self {
        Self { acm }
    }

    /// Serve the link forever, waiting for the host to reconnect after each drop
    pub async fn run(&mut self) -> ! {
        info!("Link application started");

        loop {
            self.acm.wait_connection().await;
            info!("Link app: Host connected, streaming records");

            if let Err(Disconnected) = self.stream().await {
                warn!("Link app: Connection lost, will reconnect...");
                Timer::after_millis(RECONNECT_DELAY_MS).await;
            }
        }
    }

    async fn stream(&mut self) -> Result<(), Disconnected> {
        let mut buffer = [0u8; BUFFER_SIZE];

        loop {
            let event = select(self.acm.receive_packet(&mut buffer), REPORTS.receive()).await;
            match event {
                Either::First(received) => {
                    let data = &buffer[..received?];
                    if data.contains(&TARE_COMMAND) {
                        info!("Link app: Tare requested");
                        TARE_REQUEST.signal(());
                    } else {
                        debug!("Link app: Ignoring {} byte packet: {:02x}", data.len(), data);
                    }
                }
                Either::Second(report) => self.send_report(&report).await?,
            }
        }
    }

    async fn send_report(&mut self, report: &Report) -> Result<(), Disconnected> {
        let mut line: String<LINE_CAPACITY> = String::new();
        if write!(line, "{}\r\n", report).is_err() {
            warn!("Link app: Report does not fit in {} bytes, dropped", LINE_CAPACITY);
            return Ok(());
        }
        self.acm.send(line.as_bytes()).await
    }
}

#[embassy_executor::task]
pub async fn task(acm: AcmConnection<'static>) -> ! {
    let mut app = LinkApp::new(acm);
    app.run().await
}
