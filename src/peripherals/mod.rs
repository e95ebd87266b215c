pub mod acm;
pub mod i2c;
pub mod system;
pub mod usb_system;

pub use acm::{AcmConnection, Disconnected};
pub use i2c::{new_bridge_i2c, BridgeI2c};
pub use system::init_system;
pub use usb_system::UsbSystem;
