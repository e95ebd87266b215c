//! CDC ACM serial link to the host capture tool.
//!
//! Carries the text record stream out and single-byte commands in.

use defmt::{info, warn};
use embassy_stm32::{peripherals::USB_OTG_HS, usb::Driver};
pub use embassy_usb::class::cdc_acm::State;
use embassy_usb::{class::cdc_acm::CdcAcmClass, driver::EndpointError, Builder};
use static_cell::StaticCell;

use super::usb_system::MAX_PACKET_SIZE;

pub static ACM_STATE: StaticCell<State<'static>> = StaticCell::new();

/// Peripheral collection for ACM interface
pub struct AcmClaims<'d> {
    /// Class state, which must outlive the USB device
    pub acm_state: &'d mut State<'d>,
}

/// Macro to claim peripherals for AcmConnection
#[macro_export]
macro_rules! claim_acm {
    () => {{
        $crate::peripherals::acm::AcmClaims {
            acm_state: $crate::peripherals::acm::ACM_STATE.init(embassy_usb::class::cdc_acm::State::new()),
        }
    }};
}

/// The host closed the port or unplugged the cable
#[derive(Debug, Clone, Copy)]
pub struct Disconnected;

impl From<EndpointError> for Disconnected {
    fn from(error: EndpointError) -> Self {
        match error {
            EndpointError::BufferOverflow => {
                warn!("CDC ACM buffer overflow, dropping connection");
                Disconnected
            }
            EndpointError::Disabled => Disconnected,
        }
    }
}

/// Packet-level CDC ACM connection.
///
/// Carries the CRLF-terminated report lines out and host commands in.
///
/// # Example
///
/// ```rust,ignore
/// let mut acm = AcmConnection::new(usb_builder, claim_acm!());
/// acm.wait_connection().await;
/// acm.send(b"=== TARING STRAIN GAUGE ===\r\n").await?;
/// ```
pub struct AcmConnection<'d> {
    class: CdcAcmClass<'d, Driver<'d, USB_OTG_HS>>,
}

impl<'d> AcmConnection<'d> {
    /// Register the CDC ACM class on the USB builder
    ///
    /// # Arguments
    ///
    /// * `builder` - USB device builder, before the device is built
    /// * `claims` - AcmClaims struct containing ACM state
    pub fn new(builder: &mut Builder<'d, Driver<'d, USB_OTG_HS>>, claims: AcmClaims<'d>) -> Self {
        Self {
            class: CdcAcmClass::new(builder, claims.acm_state, MAX_PACKET_SIZE),
        }
    }

    /// Wait for the host to open the port (DTR set)
    pub async fn wait_connection(&mut self) {
        self.class.wait_connection().await;
        info!("CDC ACM connection established");
    }

    /// Send a single USB packet to the host.
    ///
    /// # Arguments
    ///
    /// * `data` - Packet data, at most MAX_PACKET_SIZE bytes
    ///
    /// # Returns
    ///
    /// * `Ok(())` if sent successfully
    /// * `Err(Disconnected)` if the host disconnected
    pub async fn send_packet(&mut self, data: &[u8]) -> Result<(), Disconnected> {
        self.class.write_packet(data).await.map_err(Into::into)
    }

    /// Send `data` split into endpoint-sized packets
    ///
    /// A transfer that ends exactly on a packet boundary is terminated with a
    /// zero-length packet so the host flushes it.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), Disconnected> {
        let max = MAX_PACKET_SIZE as usize;
        for chunk in data.chunks(max) {
            self.send_packet(chunk).await?;
        }
        if !data.is_empty() && data.len() % max == 0 {
            self.send_packet(&[]).await?;
        }
        Ok(())
    }

    /// Receive a single USB packet from the host.
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer for the packet, at least MAX_PACKET_SIZE bytes
    ///
    /// # Returns
    ///
    /// * `Ok(bytes_received)` - Number of bytes received (0 to MAX_PACKET_SIZE)
    /// * `Err(Disconnected)` - If the host disconnected
    pub async fn receive_packet(&mut self, buffer: &mut [u8]) -> Result<usize, Disconnected> {
        self.class.read_packet(buffer).await.map_err(Into::into)
    }
}
