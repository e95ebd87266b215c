//! NAU7802 register map and bit assignments.

/// Register addresses for the NAU7802
///
/// These correspond to the register map in the NAU7802 datasheet.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    PuCtrl = 0x00,
    Ctrl1 = 0x01,
    Ctrl2 = 0x02,
    AdcoB2 = 0x12,
    AdcoB1 = 0x13,
    AdcoB0 = 0x14,
    Power = 0x1C,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// PU_CTRL bit positions
pub mod pu_ctrl {
    /// Register reset
    pub const RR: u8 = 0;
    /// Power up digital
    pub const PUD: u8 = 1;
    /// Power up analog
    pub const PUA: u8 = 2;
    /// Power up ready
    pub const PUR: u8 = 3;
    /// Cycle start
    pub const CS: u8 = 4;
    /// Conversion ready
    pub const CR: u8 = 5;
}

/// CTRL1 fields
pub mod ctrl1 {
    /// PGA gain select, bits 0-2
    pub const GAIN_MASK: u8 = 0b0000_0111;
    /// LDO output voltage pattern for 3.3 V bridge excitation
    pub const VLDO_3V3: u8 = 0b1100_0000;
}

/// CTRL2 fields
pub mod ctrl2 {
    /// Calibration start, self-clearing when the calibration finishes
    pub const CALS: u8 = 2;
    /// Calibration error
    pub const CAL_ERR: u8 = 3;
    /// Conversion rate select, bits 4-6
    pub const CRS_MASK: u8 = 0b0111_0000;
    pub const CRS_SHIFT: u8 = 4;
}

/// POWER register fields
pub mod power {
    /// Route the PGA through the internal LDO
    pub const PGA_LDOMODE: u8 = 0b1000_0000;
}

/// Decoded snapshot of the PU_CTRL register, used for bring-up checks and
/// stall diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub struct PowerStatus {
    pub raw: u8,
}

impl PowerStatus {
    pub const fn from_raw(raw: u8) -> Self {
        Self { raw }
    }

    const fn bit(&self, bit: u8) -> bool {
        self.raw & (1 << bit) != 0
    }

    pub const fn digital_powered(&self) -> bool {
        self.bit(pu_ctrl::PUD)
    }

    pub const fn analog_powered(&self) -> bool {
        self.bit(pu_ctrl::PUA)
    }

    pub const fn power_ready(&self) -> bool {
        self.bit(pu_ctrl::PUR)
    }

    pub const fn cycle_started(&self) -> bool {
        self.bit(pu_ctrl::CS)
    }

    pub const fn conversion_ready(&self) -> bool {
        self.bit(pu_ctrl::CR)
    }

    /// Log the decoded flags with a short prefix naming the caller's context.
    pub fn log(&self, context: &str) {
        log_info!(
            "{}: PU_CTRL = 0x{:02X} (CS={}, CR={}, PUA={}, PUD={})",
            context,
            self.raw,
            self.cycle_started() as u8,
            self.conversion_ready() as u8,
            self.analog_powered() as u8,
            self.digital_powered() as u8
        );
    }
}
