//! USB device for the strain node's serial link (OTG_HS with ULPI PHY).

use defmt::{info, warn};
use embassy_stm32::{
    bind_interrupts, peripherals as stm32_peripherals,
    peripherals::{PA3, PA5, PB0, PB1, PB10, PB11, PB12, PB13, PB5, PC0, PC2, PC3, USB_OTG_HS},
    usb::{self, Driver, InterruptHandler},
    Peri,
};
use embassy_usb::{Builder, UsbDevice};
use static_cell::ConstStaticCell;

/// Peripheral collection for the USB device
pub struct UsbClaims<'d> {
    pub usb_otg_hs: Peri<'d, USB_OTG_HS>,
    pub ulpi_clk: Peri<'d, PA5>, // USB_OTG_HS_ULPI_CK
    pub ulpi_dir: Peri<'d, PC2>, // USB_OTG_HS_ULPI_DIR
    pub ulpi_nxt: Peri<'d, PC3>, // USB_OTG_HS_ULPI_NXT
    pub ulpi_stp: Peri<'d, PC0>, // USB_OTG_HS_ULPI_STP
    pub ulpi_d0: Peri<'d, PA3>, // USB_OTG_HS_ULPI_D0
    pub ulpi_d1: Peri<'d, PB0>, // USB_OTG_HS_ULPI_D1
    pub ulpi_d2: Peri<'d, PB1>, // USB_OTG_HS_ULPI_D2
    pub ulpi_d3: Peri<'d, PB10>, // USB_OTG_HS_ULPI_D3
    pub ulpi_d4: Peri<'d, PB11>, // USB_OTG_HS_ULPI_D4
    pub ulpi_d5: Peri<'d, PB12>, // USB_OTG_HS_ULPI_D5
    pub ulpi_d6: Peri<'d, PB13>, // USB_OTG_HS_ULPI_D6
    pub ulpi_d7: Peri<'d, PB5>, // USB_OTG_HS_ULPI_D7
    /// Statically allocated endpoint and descriptor buffers
    pub usb_buffers: &'d mut UsbBuffers,
}

/// Macro to claim peripherals for UsbSystem
#[macro_export]
macro_rules! claim_usb {
    ($peripherals:expr) => {{
        $crate::peripherals::usb_system::UsbClaims {
            usb_otg_hs: $peripherals.USB_OTG_HS,
            ulpi_clk: $peripherals.PA5, // USB_OTG_HS_ULPI_CK
            ulpi_dir: $peripherals.PC2, // USB_OTG_HS_ULPI_DIR
            ulpi_nxt: $peripherals.PC3, // USB_OTG_HS_ULPI_NXT
            ulpi_stp: $peripherals.PC0, // USB_OTG_HS_ULPI_STP
            ulpi_d0: $peripherals.PA3, // USB_OTG_HS_ULPI_D0
            ulpi_d1: $peripherals.PB0, // USB_OTG_HS_ULPI_D1
            ulpi_d2: $peripherals.PB1, // USB_OTG_HS_ULPI_D2
            ulpi_d3: $peripherals.PB10, // USB_OTG_HS_ULPI_D3
            ulpi_d4: $peripherals.PB11, // USB_OTG_HS_ULPI_D4
            ulpi_d5: $peripherals.PB12, // USB_OTG_HS_ULPI_D5
            ulpi_d6: $peripherals.PB13, // USB_OTG_HS_ULPI_D6
            ulpi_d7: $peripherals.PB5, // USB_OTG_HS_ULPI_D7
            usb_buffers: $crate::peripherals::usb_system::USB_BUFFERS.take(),
        }
    }};
}

/// Maximum packet size for the high-speed bulk endpoints.
/// Record lines are far shorter, so one report normally fits in one packet.
pub const MAX_PACKET_SIZE: u16 = 512;

bind_interrupts!(
    /// USB interrupt handlers
    pub struct UsbInterrupts {
        OTG_HS => InterruptHandler<stm32_peripherals::USB_OTG_HS>;
    }
);

/// Buffers the USB stack borrows for the lifetime of the device
#[repr(C, align(32))]
pub struct UsbBuffers {
    /// Endpoint output buffer, double buffered
    pub ep_out_buffer: [u8; MAX_PACKET_SIZE as usize * 2],
    /// USB configuration descriptor buffer
    pub config_descriptor: [u8; 256],
    /// USB BOS descriptor buffer
    pub bos_descriptor: [u8; 256],
    /// USB control transfer buffer
    pub control_buf: [u8; 64],
}
pub static USB_BUFFERS: ConstStaticCell<UsbBuffers> = ConstStaticCell::new(UsbBuffers::new());

impl UsbBuffers {
    /// Zeroed buffers, usable in a `static` initializer
    pub const fn new() -> Self {
        Self {
            ep_out_buffer: [0u8; MAX_PACKET_SIZE as usize * 2],
            config_descriptor: [0u8; 256],
            bos_descriptor: [0u8; 256],
            control_buf: [0u8; 64],
        }
    }
}

impl Default for UsbBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// USB device with its builder, before and after class registration
pub struct UsbSystem<'d> {
    /// The built device, present once [`UsbSystem::run`] has started
    usb_device: Option<UsbDevice<'d, Driver<'d, stm32_peripherals::USB_OTG_HS>>>,
    /// The builder, consumed when the device is built
    builder: Option<Builder<'d, Driver<'d, stm32_peripherals::USB_OTG_HS>>>,
}

impl<'d> UsbSystem<'d> {
    /// Create the USB driver and builder
    ///
    /// # Arguments
    /// * `claims` - UsbClaims struct containing all required peripherals and buffers
    pub fn new(claims: UsbClaims<'d>) -> Self {
        info!("Initializing USB system...");

        let mut config = embassy_usb::Config::new(0xc0de, 0xcafe);
        config.manufacturer = Some("NUbots");
        config.product = Some("StrainNode");
        config.serial_number = Some("SN-0001");

        let mut usb_config = usb::Config::default();
        // The node is bus powered from the capture laptop; VBUS marks a host
        usb_config.vbus_detection = true;

        let driver = Driver::new_hs_ulpi(
            claims.usb_otg_hs,
            UsbInterrupts,
            claims.ulpi_clk,
            claims.ulpi_dir,
            claims.ulpi_nxt,
            claims.ulpi_stp,
            claims.ulpi_d0,
            claims.ulpi_d1,
            claims.ulpi_d2,
            claims.ulpi_d3,
            claims.ulpi_d4,
            claims.ulpi_d5,
            claims.ulpi_d6,
            claims.ulpi_d7,
            &mut claims.usb_buffers.ep_out_buffer,
            usb_config,
        );

        let builder = Builder::new(
            driver,
            config,
            &mut claims.usb_buffers.config_descriptor,
            &mut claims.usb_buffers.bos_descriptor,
            &mut [], // No Microsoft OS descriptors
            &mut claims.usb_buffers.control_buf,
        );

        Self {
            usb_device: None,
            builder: Some(builder),
        }
    }

    /// Builder for class registration, `None` once the device has been built
    ///
    /// The CDC ACM link registers its endpoints here before the device task is
    /// spawned.
    pub fn builder(&mut self) -> Option<&mut Builder<'d, Driver<'d, stm32_peripherals::USB_OTG_HS>>> {
        self.builder.as_mut()
    }

    /// Build the device on first call and run it forever
    ///
    /// Classes registered after this point are never enumerated.
    pub async fn run(&mut self) -> ! {
        if let Some(builder) = self.builder.take() {
            self.usb_device = Some(builder.build());
            info!("USB device built");
        }

        match self.usb_device.as_mut() {
            Some(device) => device.run().await,
            None => {
                warn!("USB device missing, link disabled");
                loop {
                    embassy_time::Timer::after_secs(60).await;
                }
            }
        }
    }
}

/// USB device task; the link app talks to the host through the class it registered
#[embassy_executor::task]
pub async fn task(mut usb_system: UsbSystem<'static>) -> ! {
    usb_system.run().await
}
