/// Step of the bring-up sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub enum BringUpStep {
    Reset,
    ClearReset,
    PowerUpDigital,
    PowerUpAnalog,
    PowerCheck,
    LdoMode,
    LdoVoltage,
    Gain,
    SampleRate,
    Calibration,
    StartConversions,
}

/// Bridge ADC driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "firmware", derive(defmt::Format))]
pub enum BridgeError {
    /// Acquisition requested before `initialize` succeeded
    NotInitialized,
    /// Address probe was not acknowledged
    DeviceNotFound,
    /// A register operation of the bring-up sequence failed
    BringUpFailure(BringUpStep),
    /// CAL_ERR was set after AFE calibration
    CalibrationFailure,
    /// Conversion-ready flag never asserted within the poll bound
    AcquisitionTimeout,
    /// I2C communication error
    Bus,
}

impl BridgeError {
    /// Attribute a bus error to the bring-up step that issued it, leaving
    /// more specific errors untouched.
    pub(crate) fn during(self, step: BringUpStep) -> Self {
        match self {
            BridgeError::Bus => BridgeError::BringUpFailure(step),
            other => other,
        }
    }
}
