//! Hardware seams of the pipeline.
//!
//! Board support implements these for the actual converter and DMA peripherals; everything above
//! them is hardware independent.

use crate::{
    buffer::RawCapture,
    config::{ConverterConfig, MultimodeConfig, TransferConfig},
};

/// Microsecond timestamps of a [`Monotonic`] clock.
pub type Instant = fugit::TimerInstantU64<1_000_000>;
/// Microsecond durations of a [`Monotonic`] clock.
pub type Duration = fugit::TimerDurationU64<1_000_000>;

/// One analog-to-digital converter.
///
/// Status queries read hardware flags; commands return immediately and their effect is observed
/// through the queries.
pub trait Converter {
    /// Apply regular group settings. Only valid while the converter is disabled.
    fn configure(&mut self, config: &ConverterConfig);

    /// Converter is enabled.
    fn is_enabled(&self) -> bool;

    /// A disable command has been issued and not yet completed.
    fn is_disable_ongoing(&self) -> bool;

    /// A regular conversion sequence is running.
    fn is_conversion_ongoing(&self) -> bool;

    /// Power up the internal voltage regulator.
    fn enable_regulator(&mut self);

    /// Start single-ended self-calibration.
    fn start_calibration(&mut self);

    /// Self-calibration has been started and not yet finished.
    fn is_calibration_ongoing(&self) -> bool;

    /// Enable the converter.
    fn enable(&mut self);

    /// Converter reports ready to convert.
    fn is_ready(&self) -> bool;

    /// Issue a software start of the regular group.
    fn start_conversion(&mut self);
}

/// Converter that can drive a second, hardware-chained converter.
pub trait Multimode {
    /// Handle the DMA engine reads the concatenated results through.
    type Source;

    /// Pair the chained converter with this one. Only valid while both are disabled.
    fn link_secondary(&mut self, config: &MultimodeConfig);

    /// DMA source of the pair, available once the converter has been configured.
    fn dma_source(&self) -> Option<Self::Source>;

    /// A result was overwritten before being read. Reading acknowledges the flag.
    fn take_overrun(&mut self) -> bool;
}

/// DMA channel moving concatenated words from the converter pair into memory.
pub trait TransferChannel<'a, S> {
    /// Program the channel to fill `target` from `source` according to `config`.
    fn configure(&mut self, config: &TransferConfig, source: S, target: &'a RawCapture);

    /// Arm the channel. Words move once the converters raise requests.
    fn enable(&mut self);
}

/// Completion and error flags of the DMA channel, as seen by one interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaEvents {
    /// First half written
    pub half: bool,
    /// Second half written
    pub full: bool,
    /// Bus or transfer error
    pub error: bool,
}

/// Source of [`DmaEvents`], read and acknowledged from the DMA interrupt.
pub trait DmaEventSource {
    /// Read and acknowledge pending events.
    fn take_events(&mut self) -> DmaEvents;
}

/// Monotonic microsecond clock used for bounded polls.
pub trait Monotonic {
    /// Current time.
    fn now(&self) -> Instant;
}
