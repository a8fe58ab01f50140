//! Capture configuration: fixed buffer geometry plus the runtime [`CaptureConfig`].

use fugit::{HertzU32, MicrosDurationU32, MillisDurationU32};

/// Number of concatenated 32-bit words in the circular raw buffer.
pub const BUFFER_LEN: usize = 256;
/// Words demultiplexed by each half/full transfer event.
pub const HALF_LEN: usize = BUFFER_LEN / 2;
/// Analog reference voltage (Vref+ tied to VDDA), in millivolts.
pub const VDDA_MV: u32 = 3300;

/// Conversion resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 12-bit results, the only mode usable with the concatenated 12/10-bit multimode word
    Bits12,
    /// 10-bit results
    Bits10,
    /// 8-bit results
    Bits8,
    /// 6-bit results
    Bits6,
}

impl Resolution {
    /// Largest raw value a conversion can produce.
    pub const fn full_scale(self) -> u32 {
        match self {
            Resolution::Bits12 => 0xFFF,
            Resolution::Bits10 => 0x3FF,
            Resolution::Bits8 => 0xFF,
            Resolution::Bits6 => 0x3F,
        }
    }
}

/// Event starting a regular conversion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerSource {
    /// Started by a software command, see
    /// [`Converter::start_conversion`](crate::converter::Converter::start_conversion)
    Software,
}

/// Per-converter regular group settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConverterConfig {
    /// Analog input channel
    pub channel: u8,
    /// Conversion resolution
    pub resolution: Resolution,
    /// Restart conversions automatically after each one
    pub continuous: bool,
    /// Source of the conversion start
    pub trigger: TriggerSource,
    /// Number of ranks in the regular sequencer
    pub sequence_len: u8,
    /// Keep converting and overwrite the data register on overrun
    pub overwrite_on_overrun: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            resolution: Resolution::Bits12,
            continuous: true,
            trigger: TriggerSource::Software,
            sequence_len: 1,
            overwrite_on_overrun: true,
        }
    }
}

/// Multimode pairing of the two converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairMode {
    /// Both converters sample the regular group alternately with a fixed phase delay
    DualInterleaved,
}

/// Common settings of the converter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultimodeConfig {
    /// Pairing mode
    pub mode: PairMode,
    /// Converter clock cycles between the primary and secondary sampling phases
    pub sampling_delay_cycles: u8,
    /// One DMA request carries both results concatenated into a single word
    pub shared_dma_word: bool,
}

impl Default for MultimodeConfig {
    fn default() -> Self {
        Self {
            mode: PairMode::DualInterleaved,
            sampling_delay_cycles: 5,
            shared_dma_word: true,
        }
    }
}

/// DMA addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// Restart at the beginning of the buffer once the last word is written
    Circular,
}

/// DMA channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferConfig {
    /// Addressing mode
    pub mode: TransferMode,
    /// Number of 32-bit words per buffer pass
    pub len: usize,
    /// Increment the memory address after each word
    pub memory_increment: bool,
    /// Increment the peripheral address after each word
    pub peripheral_increment: bool,
    /// Use the high-priority arbitration level
    pub high_priority: bool,
    /// Raise an interrupt when the first half has been written
    pub half_transfer_irq: bool,
    /// Raise an interrupt when the second half has been written
    pub full_transfer_irq: bool,
    /// Raise an interrupt on a transfer error
    pub error_irq: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::Circular,
            len: BUFFER_LEN,
            memory_increment: true,
            peripheral_increment: false,
            high_priority: true,
            half_transfer_irq: true,
            full_transfer_irq: true,
            error_irq: true,
        }
    }
}

/// Delays and timeouts of the activation sequence.
///
/// Timeouts are sized above the worst case (slowest converter clock, largest prescaler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BringUpTiming {
    /// Core clock, used to turn settle delays into busy-wait cycles
    pub core_clock: HertzU32,
    /// Internal regulator stabilization time
    pub regulator_settle: MicrosDurationU32,
    /// Bound on the self-calibration poll
    pub calibration_timeout: MillisDurationU32,
    /// Bound on the ready-flag poll
    pub ready_timeout: MillisDurationU32,
    /// Core cycles between the end of calibration and enabling the converter
    pub calibration_to_enable_cycles: u32,
}

impl BringUpTiming {
    /// Converter clock cycles required between calibration and enable.
    pub const CALIBRATION_TO_ENABLE_ADC_CYCLES: u32 = 4;
    /// Core/converter clock ratio assumed for the calibration settle delay.
    pub const CORE_TO_ADC_CLOCK_RATIO: u32 = 32;

    /// Regulator settle delay expressed in core clock cycles.
    pub fn regulator_settle_cycles(&self) -> u32 {
        let cycles = u64::from(self.regulator_settle.ticks()) * u64::from(self.core_clock.to_Hz())
            / 1_000_000;
        u32::try_from(cycles).unwrap_or(u32::MAX)
    }

    /// Length of `cycles` core clock cycles, in nanoseconds.
    pub fn cycles_to_ns(&self, cycles: u32) -> u32 {
        let hz = u64::from(self.core_clock.to_Hz().max(1));
        let ns = (u64::from(cycles) * 1_000_000_000).div_ceil(hz);
        u32::try_from(ns).unwrap_or(u32::MAX)
    }
}

impl Default for BringUpTiming {
    fn default() -> Self {
        Self {
            core_clock: HertzU32::MHz(64),
            regulator_settle: MicrosDurationU32::micros(10),
            calibration_timeout: MillisDurationU32::millis(1),
            ready_timeout: MillisDurationU32::millis(1),
            calibration_to_enable_cycles: Self::CALIBRATION_TO_ENABLE_ADC_CYCLES
                * Self::CORE_TO_ADC_CLOCK_RATIO,
        }
    }
}

/// Complete pipeline configuration.
///
/// ```
/// use interleaved_capture::config::CaptureConfig;
/// use fugit::RateExtU32;
///
/// let config = CaptureConfig::default()
///     .with_channel(2)
///     .with_core_clock(125.MHz());
/// assert_eq!(config.secondary.channel, 2);
/// assert_eq!(config.bring_up.regulator_settle_cycles(), 1250);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    /// Primary converter regular group
    pub primary: ConverterConfig,
    /// Secondary converter regular group, same channel as the primary in interleaved mode
    pub secondary: ConverterConfig,
    /// Pair settings
    pub multimode: MultimodeConfig,
    /// DMA channel settings
    pub transfer: TransferConfig,
    /// Activation delays and timeouts
    pub bring_up: BringUpTiming,
    /// Toggle period of the fatal indicator pattern
    pub fatal_blink_period: MillisDurationU32,
}

impl CaptureConfig {
    /// Sample `channel` on both converters.
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.primary.channel = channel;
        self.secondary.channel = channel;
        self
    }

    /// Core clock the settle delays are computed against.
    pub fn with_core_clock(mut self, core_clock: HertzU32) -> Self {
        self.bring_up.core_clock = core_clock;
        self
    }

    /// Phase delay between the two converters.
    pub fn with_sampling_delay(mut self, cycles: u8) -> Self {
        self.multimode.sampling_delay_cycles = cycles;
        self
    }

    /// Bounds on the calibration and ready polls.
    pub fn with_bring_up_timeouts(
        mut self,
        calibration: MillisDurationU32,
        ready: MillisDurationU32,
    ) -> Self {
        self.bring_up.calibration_timeout = calibration;
        self.bring_up.ready_timeout = ready;
        self
    }

    /// Toggle period of the fatal indicator pattern.
    pub fn with_fatal_blink_period(mut self, period: MillisDurationU32) -> Self {
        self.fatal_blink_period = period;
        self
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            primary: ConverterConfig::default(),
            secondary: ConverterConfig::default(),
            multimode: MultimodeConfig::default(),
            transfer: TransferConfig::default(),
            bring_up: BringUpTiming::default(),
            fatal_blink_period: MillisDurationU32::millis(100),
        }
    }
}
