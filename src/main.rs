//! Firmware entry point for the strain node.
//!
//! Brings up the STM32H753, then spawns the USB device, the serial link and the
//! strain acquisition task.

#![no_std]
#![no_main]

mod apps;
mod peripherals;

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use peripherals::{init_system, AcmConnection, UsbSystem};

#[cfg(not(feature = "debug"))]
use panic_halt as _;
#[cfg(feature = "debug")]
use panic_probe as _;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting strain node firmware v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = init_system();

    let mut usb_system = UsbSystem::new(claim_usb!(peripherals));
    let acm = match usb_system.builder() {
        Some(builder) => AcmConnection::new(builder, claim_acm!()),
        None => defmt::panic!("USB builder consumed before class registration"),
    };

    info!("System initialized, spawning tasks...");

    spawner.spawn(peripherals::usb_system::task(usb_system)).unwrap();
    spawner.spawn(apps::link_app::task(acm)).unwrap();
    spawner
        .spawn(apps::strain_app::task(claim_bridge_i2c!(peripherals)))
        .unwrap();

    loop {
        embassy_time::Timer::after(embassy_time::Duration::from_secs(60)).await;
        info!("System heartbeat - all tasks running");
    }
}
