//! RP2040 implementations of the hardware seams.
//!
//! The RP2040 has a single SAR converter, so the pair is emulated: the converter free-runs on one
//! input and consecutive results alternate between the primary and secondary role. The DMA
//! engine moves 16-bit results out of the converter FIFO into [`RawCapture`], so raw word `i`
//! holds result `2i` in its low half and result `2i + 1` in its high half, which is the
//! concatenated multimode layout.
//!
//! Two channels share the buffer through the HAL's double-buffered transfer: each completion hands
//! back the half just written, which is queued again behind the half now being filled. The first
//! half completing is the half-transfer event, the second half completing is the full-transfer
//! event.
//!
//! There is no regulator or self-calibration on this converter: those steps are no-ops and
//! calibration is never reported as ongoing.

use rp2040_hal::{
    adc::{Adc, AdcChannel, AdcFifo, AdcPin, DmaReadTarget},
    dma::{
        double_buffer::{Config, Transfer, WriteNext},
        Channel, SingleChannel, CH0, CH1,
    },
    gpio::{
        bank0::{Gpio15, Gpio25, Gpio26},
        FunctionSioInput, FunctionSioOutput, Pin, PullDown, PullNone, PullUp,
    },
    pac, Timer,
};

use crate::{
    buffer::{Half, RawCapture},
    config::{
        ConverterConfig, MultimodeConfig, PairMode, Resolution, TransferConfig, TransferMode,
        TriggerSource, BUFFER_LEN, HALF_LEN,
    },
    converter::{
        Converter, DmaEventSource, DmaEvents, Instant, Monotonic, Multimode, TransferChannel,
    },
    pipeline::Acquisition,
};

/// Status LED on the Pico board
pub type StatusLed = Pin<Gpio25, FunctionSioOutput, PullDown>;
/// Active-low trigger button
pub type TriggerButton = Pin<Gpio15, FunctionSioInput, PullUp>;
/// Analog input sampled by both roles
pub type AnalogInput = AdcPin<Pin<Gpio26, FunctionSioInput, PullNone>>;
/// Controller as wired on the board
pub type Capture = Acquisition<'static, PrimaryAdc, SecondarySlot, StatusLed>;

/// Interrupt flags of channels 0 and 1 in `INTS0`
const RING_IRQ_MASK: u32 = 0b11;

/// Converter state owned by [`PrimaryAdc`].
enum AdcStage {
    /// Not configured yet
    Idle(&'static mut Adc),
    /// FIFO running into the DMA request line, conversions paused until started
    Armed(AdcFifo<'static, u16>),
}

/// The converter, in its primary role: owns the FIFO and receives the start command.
///
/// The HAL powers the converter when it is created. The enabled state here tracks the activation
/// of the role.
pub struct PrimaryAdc {
    /// `None` only while the FIFO is being rebuilt
    stage: Option<AdcStage>,
    /// Input the FIFO samples
    input: AnalogInput,
    /// Set by [`Converter::enable`]
    enabled: bool,
    /// Set once conversions have been resumed
    running: bool,
}

impl PrimaryAdc {
    /// Take the converter and its input, leaving the role disabled.
    pub fn new(adc: &'static mut Adc, input: AnalogInput) -> Self {
        Self {
            stage: Some(AdcStage::Idle(adc)),
            input,
            enabled: false,
            running: false,
        }
    }

    fn fifo(&mut self) -> Option<&mut AdcFifo<'static, u16>> {
        match &mut self.stage {
            Some(AdcStage::Armed(fifo)) => Some(fifo),
            _ => None,
        }
    }
}

impl Converter for PrimaryAdc {
    fn configure(&mut self, config: &ConverterConfig) {
        if config.resolution != Resolution::Bits12 {
            warn!(
                "Converter only runs at 12 bits, ignoring {:?}",
                config.resolution
            );
        }
        if !config.continuous {
            warn!("Single conversions are not supported, converter free-runs");
        }
        if config.sequence_len != 1 {
            warn!(
                "Sequence of {} ranks not supported, sampling one input",
                config.sequence_len
            );
        }
        if !config.overwrite_on_overrun {
            warn!("FIFO keeps converting on overrun and flags it");
        }
        let input = self.input.channel();
        if input != config.channel {
            warn!("Input pin is channel {}, not {}", input, config.channel);
        }
        match config.trigger {
            TriggerSource::Software => {}
        }

        let adc = match self.stage.take() {
            Some(AdcStage::Idle(adc)) => adc,
            Some(AdcStage::Armed(fifo)) => fifo.stop(),
            None => {
                error!("Converter lost while reconfiguring");
                return;
            }
        };
        // Free-running at the full converter clock, paused until the trigger
        let fifo = adc
            .build_fifo()
            .set_channel(&mut self.input)
            .clock_divider(0, 0)
            .enable_dma()
            .start_paused();
        self.stage = Some(AdcStage::Armed(fifo));
        self.running = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_disable_ongoing(&self) -> bool {
        // Disabling takes effect immediately
        false
    }

    fn is_conversion_ongoing(&self) -> bool {
        self.running
    }

    fn enable_regulator(&mut self) {}

    fn start_calibration(&mut self) {}

    fn is_calibration_ongoing(&self) -> bool {
        false
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn is_ready(&self) -> bool {
        self.enabled && matches!(self.stage, Some(AdcStage::Armed(_)))
    }

    fn start_conversion(&mut self) {
        let Some(fifo) = self.fifo() else {
            warn!("Converter not configured, ignoring start");
            return;
        };
        fifo.resume();
        self.running = true;
    }
}

impl Multimode for PrimaryAdc {
    type Source = DmaReadTarget<u16>;

    fn link_secondary(&mut self, config: &MultimodeConfig) {
        match config.mode {
            PairMode::DualInterleaved => {}
        }
        if !config.shared_dma_word {
            warn!("Results are always packed in pairs on this board");
        }
        debug!(
            "Secondary slot follows the primary one, sampling delay of {} cycles ignored",
            config.sampling_delay_cycles
        );
    }

    fn dma_source(&self) -> Option<DmaReadTarget<u16>> {
        match &self.stage {
            Some(AdcStage::Armed(fifo)) => Some(fifo.dma_read_target()),
            _ => None,
        }
    }

    fn take_overrun(&mut self) -> bool {
        self.fifo().is_some_and(|fifo| fifo.is_over())
    }
}

/// The converter, in its secondary role: every odd result.
///
/// Has no hardware of its own and never issues commands.
#[derive(Default)]
pub struct SecondarySlot {
    /// Set by [`Converter::enable`]
    enabled: bool,
}

impl SecondarySlot {
    /// Secondary role of the converter held by [`PrimaryAdc`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl Converter for SecondarySlot {
    fn configure(&mut self, config: &ConverterConfig) {
        debug!(
            "Secondary slot shares the primary input, requested channel {}",
            config.channel
        );
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_disable_ongoing(&self) -> bool {
        false
    }

    fn is_conversion_ongoing(&self) -> bool {
        false
    }

    fn enable_regulator(&mut self) {}

    fn start_calibration(&mut self) {}

    fn is_calibration_ongoing(&self) -> bool {
        false
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn is_ready(&self) -> bool {
        self.enabled
    }

    fn start_conversion(&mut self) {
        warn!("Secondary slot is driven by the primary converter, ignoring start");
    }
}

/// One half of the capture buffer, as a DMA write target of 16-bit results.
pub struct HalfSlot {
    /// Buffer the half belongs to
    raw: &'static RawCapture,
    /// Which half
    half: Half,
}

// SAFETY: the pointer covers exactly one half of a 'static buffer, and each half is owned by a
// single slot that the transfer holds while writing it
unsafe impl embedded_dma::WriteBuffer for HalfSlot {
    type Word = u16;

    unsafe fn write_buffer(&mut self) -> (*mut u16, usize) {
        let start = self.raw.as_mut_ptr().wrapping_add(self.half.range().start);
        (start.cast(), HALF_LEN * 2)
    }
}

/// Double-buffered transfer while it is being filled
type Filling =
    Transfer<Channel<CH0>, Channel<CH1>, DmaReadTarget<u16>, HalfSlot, WriteNext<HalfSlot>>;

/// Progress of [`RingTransfer`]
enum RingState {
    /// Channels not programmed yet
    Idle(Channel<CH0>, Channel<CH1>),
    /// First half queued, second half waiting for [`TransferChannel::enable`]
    Prepared(
        Config<Channel<CH0>, Channel<CH1>, DmaReadTarget<u16>, HalfSlot>,
        HalfSlot,
    ),
    /// Halves handed back and re-queued from the DMA interrupt
    Filling(Filling),
}

/// Two DMA channels filling [`RawCapture`] half by half, forever.
pub struct RingTransfer {
    /// `None` only while changing state
    state: Option<RingState>,
}

impl RingTransfer {
    /// Take channels 0 and 1, from [`rp2040_hal::dma::DMAExt::split`].
    pub fn new(first: Channel<CH0>, second: Channel<CH1>) -> Self {
        Self {
            state: Some(RingState::Idle(first, second)),
        }
    }

    /// Re-queue the half that just completed, if any.
    fn advance(&mut self) -> Option<Half> {
        match self.state.take() {
            Some(RingState::Filling(transfer)) if transfer.is_done() => {
                let (done, transfer) = transfer.wait();
                let half = done.half;
                self.state = Some(RingState::Filling(transfer.write_next(done)));
                Some(half)
            }
            other => {
                self.state = other;
                None
            }
        }
    }
}

fn dma_regs() -> &'static pac::dma::RegisterBlock {
    // SAFETY: only the interrupt and error flags of channels 0 and 1 are touched, which
    // `RingTransfer` owns
    unsafe { &*pac::DMA::ptr() }
}

impl TransferChannel<'static, DmaReadTarget<u16>> for RingTransfer {
    fn configure(
        &mut self,
        config: &TransferConfig,
        source: DmaReadTarget<u16>,
        target: &'static RawCapture,
    ) {
        match config.mode {
            TransferMode::Circular => {}
        }
        if config.len != BUFFER_LEN {
            warn!(
                "Ring always covers {} words, ignoring {}",
                BUFFER_LEN, config.len
            );
        }
        if !config.memory_increment || config.peripheral_increment {
            warn!("Ring always writes incrementing memory from the fixed FIFO address");
        }
        if config.high_priority {
            debug!("Double-buffered channels use the default arbitration level");
        }
        if !config.error_irq {
            warn!("Bus errors are reported through the completion interrupts only");
        }

        let (mut first, mut second) = match self.state.take() {
            Some(RingState::Idle(first, second)) => (first, second),
            other => {
                warn!("DMA ring already configured, ignoring");
                self.state = other;
                return;
            }
        };
        if config.half_transfer_irq {
            first.enable_irq0();
        }
        if config.full_transfer_irq {
            second.enable_irq0();
        }

        let slot = |half| HalfSlot { raw: target, half };
        let transfer = Config::new((first, second), source, slot(Half::First));
        self.state = Some(RingState::Prepared(transfer, slot(Half::Second)));
        debug!("DMA ring prepared, {} results per half", HALF_LEN * 2);
    }

    fn enable(&mut self) {
        self.state = match self.state.take() {
            // Words move once the converter FIFO raises its first request
            Some(RingState::Prepared(transfer, second)) => {
                Some(RingState::Filling(transfer.start().write_next(second)))
            }
            other => {
                warn!("DMA ring not prepared, ignoring enable");
                other
            }
        };
    }
}

impl DmaEventSource for RingTransfer {
    fn take_events(&mut self) -> DmaEvents {
        let dma = dma_regs();
        let pending = dma.ints0().read().bits() & RING_IRQ_MASK;
        // SAFETY: write-1-to-clear of the two channels' flags only
        dma.ints0().write(|w| unsafe { w.bits(pending) });

        let error = [0, 1]
            .into_iter()
            .any(|ch| dma.ch(ch).ch_ctrl_trig().read().ahb_error().bit_is_set());
        if error {
            return DmaEvents {
                error,
                ..DmaEvents::default()
            };
        }

        let mut events = DmaEvents::default();
        for _ in 0..pending.count_ones() {
            match self.advance() {
                Some(Half::First) => events.half = true,
                Some(Half::Second) => events.full = true,
                None => break,
            }
        }
        events
    }
}

impl Monotonic for Timer {
    fn now(&self) -> Instant {
        self.get_counter()
    }
}
