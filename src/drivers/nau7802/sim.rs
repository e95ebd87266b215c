//! Simulated NAU7802 for host tests.
//!
//! Models the register file behind an [`I2c`] implementation and a virtual
//! clock shared with a [`DelayNs`] implementation, so every wait the driver
//! performs advances simulated time instead of wall time. Conversion-ready
//! pulses follow the rate programmed into CTRL2.

use super::config::{BridgeConfig, SampleRate, DEFAULT_ADDRESS};
use super::driver::Nau7802;
use super::registers::{ctrl2, pu_ctrl, Register};
use core::cell::{Cell, RefCell};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

const REGISTER_COUNT: usize = 0x20;

/// Bus error reported for every rejected transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusError;

impl Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

/// Observable and injectable device state
#[derive(Debug)]
pub struct SimState {
    pub regs: [u8; REGISTER_COUNT],
    /// Device acknowledges its address
    pub present: bool,
    /// Writes to this register are not acknowledged
    pub fail_writes_to: Option<Register>,
    /// The write with this zero-based attempt number is not acknowledged
    pub fail_write_number: Option<usize>,
    /// Conversion-ready never asserts
    pub stalled: bool,
    /// Conversion-ready stays asserted after the data registers are read
    pub ready_stays_high: bool,
    /// PUD/PUA read back as cleared
    pub power_flags_lag: bool,
    /// CAL_ERR is reported when calibration finishes
    pub calibration_error: bool,
    /// CALS self-clears this long after it is set; `None` keeps it set
    pub calibration_us: Option<u64>,
    /// Every register write, in order
    pub writes: Vec<(u8, u8)>,
    /// Samples produced by successive conversions; `baseline` once empty
    pub samples: VecDeque<i32>,
    pub baseline: i32,
    running: bool,
    next_ready_at: u64,
    calibration_done_at: Option<u64>,
    write_attempts: usize,
}

impl SimState {
    fn new() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
            present: true,
            fail_writes_to: None,
            fail_write_number: None,
            stalled: false,
            ready_stays_high: false,
            power_flags_lag: false,
            calibration_error: false,
            calibration_us: Some(350_000),
            writes: Vec::new(),
            samples: VecDeque::new(),
            baseline: 0,
            running: false,
            next_ready_at: 0,
            calibration_done_at: None,
            write_attempts: 0,
        }
    }

    fn period_us(&self) -> u64 {
        let rate = match (self.regs[Register::Ctrl2 as usize] & ctrl2::CRS_MASK) >> ctrl2::CRS_SHIFT {
            1 => SampleRate::Sps20,
            2 => SampleRate::Sps40,
            3 => SampleRate::Sps80,
            7 => SampleRate::Sps320,
            _ => SampleRate::Sps10,
        };
        u64::from(rate.period_us())
    }

    fn ready(&self, now: u64) -> bool {
        self.running && !self.stalled && now >= self.next_ready_at
    }

    fn current_sample(&self) -> i32 {
        self.samples.front().copied().unwrap_or(self.baseline)
    }

    /// Number of writes to PU_CTRL that set the cycle-start bit
    pub fn cycle_start_writes(&self) -> usize {
        self.writes
            .iter()
            .filter(|(reg, value)| *reg == Register::PuCtrl as u8 && value & (1 << pu_ctrl::CS) != 0)
            .count()
    }

    fn read(&mut self, reg: u8, now: u64) -> u8 {
        let index = reg as usize % REGISTER_COUNT;
        match reg {
            r if r == Register::PuCtrl as u8 => {
                let mut value = self.regs[index] & !(1 << pu_ctrl::CR);
                if self.ready(now) {
                    value |= 1 << pu_ctrl::CR;
                }
                if self.power_flags_lag {
                    value &= !((1 << pu_ctrl::PUD) | (1 << pu_ctrl::PUA));
                }
                value
            }
            r if r == Register::Ctrl2 as u8 => {
                if let Some(done_at) = self.calibration_done_at {
                    if now >= done_at {
                        self.calibration_done_at = None;
                        self.regs[index] &= !(1 << ctrl2::CALS);
                        if self.calibration_error {
                            self.regs[index] |= 1 << ctrl2::CAL_ERR;
                        }
                    }
                }
                self.regs[index]
            }
            r if r == Register::AdcoB2 as u8 => self.current_sample().to_be_bytes()[1],
            r if r == Register::AdcoB1 as u8 => self.current_sample().to_be_bytes()[2],
            r if r == Register::AdcoB0 as u8 => {
                let byte = self.current_sample().to_be_bytes()[3];
                // Reading the last data byte ends the cycle and starts the next conversion
                if self.ready(now) && !self.ready_stays_high {
                    self.samples.pop_front();
                    self.next_ready_at = now + self.period_us();
                }
                byte
            }
            _ => self.regs[index],
        }
    }

    fn write(&mut self, reg: u8, value: u8, now: u64) -> Result<(), SimBusError> {
        let attempt = self.write_attempts;
        self.write_attempts += 1;
        if self.fail_writes_to.map(|r| r as u8) == Some(reg) || self.fail_write_number == Some(attempt) {
            return Err(SimBusError);
        }
        self.writes.push((reg, value));
        let index = reg as usize % REGISTER_COUNT;
        match reg {
            r if r == Register::PuCtrl as u8 => {
                if value & (1 << pu_ctrl::RR) != 0 {
                    self.regs = [0; REGISTER_COUNT];
                    self.regs[index] = 1 << pu_ctrl::RR;
                    self.running = false;
                    return Ok(());
                }
                let mut stored = value & !((1 << pu_ctrl::CR) | (1 << pu_ctrl::PUR));
                let powered = (1 << pu_ctrl::PUD) | (1 << pu_ctrl::PUA);
                if stored & powered == powered {
                    stored |= 1 << pu_ctrl::PUR;
                }
                let cycle_start = stored & (1 << pu_ctrl::CS) != 0;
                if cycle_start && !self.running {
                    self.next_ready_at = now + self.period_us();
                }
                self.running = cycle_start;
                self.regs[index] = stored;
            }
            r if r == Register::Ctrl2 as u8 => {
                self.regs[index] = value;
                if value & (1 << ctrl2::CALS) != 0 {
                    self.regs[index] &= !(1 << ctrl2::CAL_ERR);
                    self.calibration_done_at = self.calibration_us.map(|us| now + us);
                }
            }
            _ => self.regs[index] = value,
        }
        Ok(())
    }
}

/// I2C side of the simulator
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
    clock: Rc<Cell<u64>>,
}

impl ErrorType for SimBus {
    type Error = SimBusError;
}

impl I2c for SimBus {
    async fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if !state.present || address != DEFAULT_ADDRESS {
            return Err(SimBusError);
        }
        let now = self.clock.get();
        let mut pointer = 0u8;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((&reg, values)) = bytes.split_first() {
                        pointer = reg;
                        for (offset, &value) in values.iter().enumerate() {
                            state.write(reg.wrapping_add(offset as u8), value, now)?;
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for (offset, byte) in buffer.iter_mut().enumerate() {
                        *byte = state.read(pointer.wrapping_add(offset as u8), now);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay side of the simulator, advancing the shared virtual clock
pub struct SimDelay {
    clock: Rc<Cell<u64>>,
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.set(self.clock.get() + u64::from(ns).div_ceil(1_000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.clock.set(self.clock.get() + u64::from(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.clock.set(self.clock.get() + u64::from(ms) * 1_000);
    }
}

/// Handle used by tests to build a driver and inspect the device afterwards
pub struct Simulator {
    state: Rc<RefCell<SimState>>,
    clock: Rc<Cell<u64>>,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new())),
            clock: Rc::new(Cell::new(0)),
        }
    }

    pub fn driver(&self) -> Nau7802<SimBus, SimDelay> {
        self.driver_with(BridgeConfig::default())
    }

    pub fn driver_with(&self, config: BridgeConfig) -> Nau7802<SimBus, SimDelay> {
        let bus = SimBus {
            state: Rc::clone(&self.state),
            clock: Rc::clone(&self.clock),
        };
        let delay = SimDelay {
            clock: Rc::clone(&self.clock),
        };
        Nau7802::new(bus, delay, config)
    }

    /// Virtual time elapsed since the simulator was created, in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.clock.get() / 1_000
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    pub fn push_samples(&self, samples: &[i32]) {
        self.with(|state| state.samples.extend(samples.iter().copied()));
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.with(|state| state.regs[reg as usize])
    }
}
