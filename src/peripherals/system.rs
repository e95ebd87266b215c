//! System initialization and clock configuration for the STM32H753 strain node.

use embassy_stm32::{rcc::*, Config, Peripherals};

/// Initialize the STM32H753 clocks and return the peripheral singletons.
///
/// The node is battery powered and acquisition is bounded by the 10 SPS
/// bridge ADC, so the core runs below its maximum:
/// - **400 MHz** system clock from PLL1 on the HSI
/// - **200 MHz** AHB, **100 MHz** APB (I2C1 kernel clock comes from APB1)
/// - **48 MHz** HSI48 for USB, trimmed from USB SOF
/// - **Scale1** voltage scaling
pub fn init_system() -> Peripherals {
    let mut config = Config::default();

    config.rcc.hsi = Some(HSIPrescaler::DIV1);
    config.rcc.csi = true;
    config.rcc.hsi48 = Some(Hsi48Config { sync_from_usb: true });

    // HSI(16MHz) / 4 * 200 = 800MHz VCO, / 2 = 400MHz
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL200,
        divp: Some(PllDiv::DIV2),
        divq: None,
        divr: None,
    });

    config.rcc.sys = Sysclk::PLL1_P;
    config.rcc.ahb_pre = AHBPrescaler::DIV2;
    config.rcc.apb1_pre = APBPrescaler::DIV2;
    config.rcc.apb2_pre = APBPrescaler::DIV2;
    config.rcc.apb3_pre = APBPrescaler::DIV2;
    config.rcc.apb4_pre = APBPrescaler::DIV2;
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config.rcc.mux.usbsel = mux::Usbsel::HSI48;
    config.rcc.mux.i2c1235sel = mux::I2c1235sel::PCLK1;

    embassy_stm32::init(config)
}
