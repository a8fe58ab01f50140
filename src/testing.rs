//! Host-side stand-ins for the hardware seams, used by unit tests.

use core::{cell::Cell, convert::Infallible};

use embedded_hal::{delay::DelayNs, digital};

use crate::{
    buffer::RawCapture,
    config::{ConverterConfig, MultimodeConfig, TransferConfig},
    converter::{
        Converter, DmaEventSource, DmaEvents, Instant, Monotonic, Multimode, TransferChannel,
    },
};

/// Data register address a [`FakeConverter`] hands to the DMA channel.
pub const DATA_REGISTER: u32 = 0x5000_000C;

/// Commands issued to a [`FakeConverter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Configure(u8),
    LinkSecondary,
    EnableRegulator,
    StartCalibration,
    Enable,
    StartConversion,
}

/// Converter that records commands and answers queries from its public fields.
#[derive(Debug, Clone, Default)]
pub struct FakeConverter {
    pub ops: Vec<Op>,
    /// Every configuration applied, in order
    pub configs: Vec<ConverterConfig>,
    /// Last pairing applied
    pub multimode: Option<MultimodeConfig>,
    /// Pending overrun flag, cleared when taken
    pub overrun: bool,
    /// Withhold the DMA source even once configured
    pub no_dma_source: bool,
    pub enabled: bool,
    pub disable_ongoing: bool,
    pub conversion_ongoing: bool,
    /// Number of polls that still report calibration ongoing after it starts
    pub calibration_polls: usize,
    pub never_ready: bool,
    calibrating: bool,
    polls: Cell<usize>,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Converter for FakeConverter {
    fn configure(&mut self, config: &ConverterConfig) {
        self.ops.push(Op::Configure(config.channel));
        self.configs.push(*config);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_disable_ongoing(&self) -> bool {
        self.disable_ongoing
    }

    fn is_conversion_ongoing(&self) -> bool {
        self.conversion_ongoing
    }

    fn enable_regulator(&mut self) {
        self.ops.push(Op::EnableRegulator);
    }

    fn start_calibration(&mut self) {
        self.ops.push(Op::StartCalibration);
        self.calibrating = true;
        self.polls.set(0);
    }

    fn is_calibration_ongoing(&self) -> bool {
        if !self.calibrating {
            return false;
        }
        let polls = self.polls.get();
        self.polls.set(polls.saturating_add(1));
        polls < self.calibration_polls
    }

    fn enable(&mut self) {
        self.ops.push(Op::Enable);
        self.enabled = true;
    }

    fn is_ready(&self) -> bool {
        self.enabled && !self.never_ready
    }

    fn start_conversion(&mut self) {
        self.ops.push(Op::StartConversion);
        self.conversion_ongoing = true;
    }
}

impl Multimode for FakeConverter {
    type Source = u32;

    fn link_secondary(&mut self, config: &MultimodeConfig) {
        self.ops.push(Op::LinkSecondary);
        self.multimode = Some(*config);
    }

    fn dma_source(&self) -> Option<u32> {
        (!self.no_dma_source && !self.configs.is_empty()).then_some(DATA_REGISTER)
    }

    fn take_overrun(&mut self) -> bool {
        core::mem::take(&mut self.overrun)
    }
}

/// Clock that advances by a fixed step on every read.
pub struct FakeClock {
    now: Cell<u64>,
    step: u64,
}

impl FakeClock {
    pub fn new(step_us: u64) -> Self {
        Self {
            now: Cell::new(0),
            step: step_us,
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.now.get()
    }
}

impl Monotonic for FakeClock {
    fn now(&self) -> Instant {
        let now = self.now.get() + self.step;
        self.now.set(now);
        Instant::from_ticks(now)
    }
}

/// Delay that returns immediately, remembering every requested wait.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits_ns: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_ns.push(ns);
    }
}

/// Output pin remembering every level driven.
#[derive(Debug, Default)]
pub struct FakePin {
    pub levels: Vec<bool>,
}

impl digital::ErrorType for FakePin {
    type Error = Infallible;
}

impl digital::OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

/// DMA channel remembering how it was programmed.
#[derive(Debug, Default)]
pub struct FakeDma {
    pub config: Option<TransferConfig>,
    pub source: Option<u32>,
    pub target: usize,
    pub enabled: bool,
}

impl<'a> TransferChannel<'a, u32> for FakeDma {
    fn configure(&mut self, config: &TransferConfig, source: u32, target: &'a RawCapture) {
        self.config = Some(*config);
        self.source = Some(source);
        self.target = target.as_mut_ptr() as usize;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }
}

/// Event source replaying queued interrupts, then reporting nothing.
#[derive(Debug, Default)]
pub struct FakeRing {
    pub pending: Vec<DmaEvents>,
    pub taken: usize,
}

impl FakeRing {
    pub fn with(pending: impl IntoIterator<Item = DmaEvents>) -> Self {
        Self {
            pending: pending.into_iter().collect(),
            taken: 0,
        }
    }
}

impl DmaEventSource for FakeRing {
    fn take_events(&mut self) -> DmaEvents {
        self.taken += 1;
        if self.pending.is_empty() {
            DmaEvents::default()
        } else {
            self.pending.remove(0)
        }
    }
}
