//! The acquisition controller and the state it shares with the foreground loop.
//!
//! [`AcquisitionContext`] holds everything the hardware and the foreground need to see: the raw
//! DMA buffer, the demultiplexed sample arrays and the transfer status. [`Acquisition`] owns the
//! converters and the status indicator, and is the only writer of the context. Its event
//! handlers are meant to be called from the matching interrupt handlers.

use core::{
    cell::RefCell,
    convert::Infallible,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

use critical_section::Mutex;
use embedded_hal::{delay::DelayNs, digital::OutputPin};
use fugit::MillisDurationU32;

use crate::{
    activation::{self, Activation},
    buffer::{Half, RawCapture, SampleBuffers},
    components::StatusIndicator,
    config::{BringUpTiming, CaptureConfig},
    converter::{Converter, DmaEvents, Monotonic, Multimode, TransferChannel},
    error::{AcquisitionError, ConverterId, Result, StartBlocker},
    status::{SharedStatus, TransferStatus},
};

/// Buffers and flags shared between interrupt handlers and the foreground loop.
///
/// Meant to live in a `static` (see [`CONTEXT`](crate::interrupt::CONTEXT)) so the raw buffer and
/// sample arrays sit at a fixed address a debugger can watch.
pub struct AcquisitionContext {
    raw: RawCapture,
    samples: Mutex<RefCell<SampleBuffers>>,
    status: SharedStatus,
    faulted: AtomicBool,
    cycles: AtomicU32,
}

impl AcquisitionContext {
    /// Empty context, not started.
    pub const fn new() -> Self {
        Self {
            raw: RawCapture::new(),
            samples: Mutex::new(RefCell::new(SampleBuffers::new())),
            status: SharedStatus::new(),
            faulted: AtomicBool::new(false),
            cycles: AtomicU32::new(0),
        }
    }

    /// Raw buffer the DMA engine writes into.
    pub fn raw(&self) -> &RawCapture {
        &self.raw
    }

    /// Current transfer status.
    pub fn status(&self) -> TransferStatus {
        self.status.load()
    }

    /// A fatal error has been latched by the controller.
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// Number of full-buffer passes demultiplexed so far (wrapping).
    pub fn completed_cycles(&self) -> u32 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Run `f` on the sample arrays inside a critical section.
    ///
    /// Returns the status observed in the same critical section, so the caller knows whether the
    /// arrays held a complete buffer or a partially refreshed one.
    pub fn read_samples<R>(&self, f: impl FnOnce(&SampleBuffers) -> R) -> (TransferStatus, R) {
        critical_section::with(|cs| {
            let samples = self.samples.borrow_ref(cs);
            (self.status(), f(&samples))
        })
    }

    fn demux(&self, half: Half) {
        critical_section::with(|cs| {
            self.samples
                .borrow_ref_mut(cs)
                .demux(half, self.raw.half(half));
        });
    }

    fn clear_first_samples(&self) {
        critical_section::with(|cs| self.samples.borrow_ref_mut(cs).clear_first());
    }

    fn count_cycle(&self) {
        let cycles = self.cycles.load(Ordering::Relaxed).wrapping_add(1);
        self.cycles.store(cycles, Ordering::Release);
    }

    fn reset(&self) {
        self.status.store(TransferStatus::NotStarted);
        self.faulted.store(false, Ordering::Release);
        self.cycles.store(0, Ordering::Release);
    }
}

impl Default for AcquisitionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// The start command was issued
    Started,
    /// Acquisition was already running, nothing was done
    AlreadyArmed,
}

/// Controller of the interleaved converter pair.
///
/// Every error is fatal: it is latched, the indicator switches to its fatal pattern, and every
/// later call returns the latched error without touching the hardware or the context.
pub struct Acquisition<'a, P, S, L> {
    context: &'a AcquisitionContext,
    primary: P,
    secondary: S,
    indicator: StatusIndicator<L>,
    fault: Option<AcquisitionError>,
}

impl<'a, P, S, L> Acquisition<'a, P, S, L>
where
    P: Converter,
    S: Converter,
    L: OutputPin<Error = Infallible>,
{
    /// Take ownership of the converters and indicator, resetting `context` to
    /// [`TransferStatus::NotStarted`].
    pub fn new(
        context: &'a AcquisitionContext,
        primary: P,
        secondary: S,
        indicator: StatusIndicator<L>,
    ) -> Self {
        context.reset();
        Self {
            context,
            primary,
            secondary,
            indicator,
            fault: None,
        }
    }

    /// Configure the converter pairing, both converters, then the DMA channel.
    ///
    /// Both converters must be disabled; otherwise nothing is written and
    /// [`AcquisitionError::ConfiguredWhileEnabled`] is latched. The DMA channel reads from the
    /// source the configured pair exposes and is enabled last.
    pub fn configure<D>(&mut self, dma: &mut D, config: &CaptureConfig) -> Result<()>
    where
        P: Multimode,
        D: TransferChannel<'a, P::Source> + ?Sized,
    {
        self.check_fault()?;
        if self.primary.is_enabled() {
            return Err(self.fail(AcquisitionError::ConfiguredWhileEnabled(ConverterId::Primary)));
        }
        if self.secondary.is_enabled() {
            return Err(self.fail(AcquisitionError::ConfiguredWhileEnabled(
                ConverterId::Secondary,
            )));
        }

        self.primary.link_secondary(&config.multimode);
        self.primary.configure(&config.primary);
        self.secondary.configure(&config.secondary);

        let Some(source) = self.primary.dma_source() else {
            return Err(self.fail(AcquisitionError::MissingDmaSource));
        };
        dma.configure(&config.transfer, source, &self.context.raw);
        dma.enable();

        debug!(
            "Converters and DMA configured, {} words per pass",
            config.transfer.len
        );
        Ok(())
    }

    /// Activate the primary converter, then the secondary one.
    pub fn activate<C, D>(
        &mut self,
        timing: &BringUpTiming,
        clock: &C,
        delay: &mut D,
    ) -> Result<()>
    where
        C: Monotonic + ?Sized,
        D: DelayNs + ?Sized,
    {
        self.check_fault()?;
        if let Err(err) = self.activate_pair(timing, clock, delay) {
            return Err(self.fail(err));
        }
        info!("Converters ready, waiting for trigger");
        Ok(())
    }

    fn activate_pair<C, D>(
        &mut self,
        timing: &BringUpTiming,
        clock: &C,
        delay: &mut D,
    ) -> Result<()>
    where
        C: Monotonic + ?Sized,
        D: DelayNs + ?Sized,
    {
        let primary = activation::activate(
            &mut self.primary,
            ConverterId::Primary,
            timing,
            clock,
            delay,
        )?;
        let secondary = activation::activate(
            &mut self.secondary,
            ConverterId::Secondary,
            timing,
            clock,
            delay,
        )?;
        if primary == Activation::AlreadyEnabled && secondary == Activation::AlreadyEnabled {
            warn!("Both converters were already enabled before activation");
        }
        Ok(())
    }

    /// Handle the external trigger.
    ///
    /// Only the first trigger has an effect: it marks the transfer in progress and starts
    /// continuous conversion on the primary converter, which drives the secondary one.
    pub fn on_trigger(&mut self) -> Result<Trigger> {
        self.check_fault()?;
        if self.context.status() != TransferStatus::NotStarted {
            return Ok(Trigger::AlreadyArmed);
        }

        self.context.status.store(TransferStatus::InProgress);
        if let Some(blocker) = self.start_blocker() {
            return Err(self.fail(AcquisitionError::PreconditionViolation(blocker)));
        }

        self.primary.start_conversion();
        info!("Interleaved acquisition started");
        Ok(Trigger::Started)
    }

    /// First half of the raw buffer has been written.
    pub fn on_half_transfer(&mut self) -> Result<()> {
        self.check_fault()?;
        self.context.demux(Half::First);
        self.context.status.store(TransferStatus::InProgress);
        self.indicator.show_partial();
        Ok(())
    }

    /// Second half of the raw buffer has been written; the DMA engine wraps next.
    pub fn on_full_transfer(&mut self) -> Result<()> {
        self.check_fault()?;
        self.context.demux(Half::Second);
        self.context.status.store(TransferStatus::Complete);
        self.context.count_cycle();
        self.indicator.show_complete();
        Ok(())
    }

    /// The DMA engine reported a transfer error. Always fatal.
    ///
    /// A [`TransferStatus::Complete`] status is downgraded to [`TransferStatus::InProgress`]; other
    /// statuses are left as they are. The pair at index 0 is zeroed as well; it is not a marker,
    /// and the other indices keep their last values.
    pub fn on_transfer_error(&mut self) -> AcquisitionError {
        if let Some(fault) = self.fault {
            return fault;
        }
        if self.context.status() == TransferStatus::Complete {
            self.context.status.store(TransferStatus::InProgress);
        }
        self.context.clear_first_samples();
        self.fail(AcquisitionError::TransferError)
    }

    /// The converter overwrote a result the DMA engine had not read. Always fatal.
    pub fn on_overrun(&mut self) -> AcquisitionError {
        if let Some(fault) = self.fault {
            return fault;
        }
        self.fail(AcquisitionError::Overrun)
    }

    /// Dispatch the events seen by one DMA interrupt.
    ///
    /// A transfer error, then a converter overrun, take precedence over completions; no sample is
    /// demultiplexed once either is seen. When both halves are pending the first one is handled
    /// first.
    pub fn on_dma_events(&mut self, events: DmaEvents) -> Result<()>
    where
        P: Multimode,
    {
        self.check_fault()?;
        if events.error {
            return Err(self.on_transfer_error());
        }
        if self.primary.take_overrun() {
            return Err(self.on_overrun());
        }
        if events.half {
            self.on_half_transfer()?;
        }
        if events.full {
            self.on_full_transfer()?;
        }
        Ok(())
    }

    /// Latched fatal error, if any.
    pub fn fault(&self) -> Option<AcquisitionError> {
        self.fault
    }

    /// Status indicator.
    pub fn indicator(&self) -> &StatusIndicator<L> {
        &self.indicator
    }

    /// Primary and secondary converters.
    #[cfg(test)]
    pub(crate) fn converters(&self) -> (&P, &S) {
        (&self.primary, &self.secondary)
    }

    /// Terminal action for a latched fault: blink the indicator forever.
    pub fn halt<D: DelayNs>(self, delay: &mut D, period: MillisDurationU32) -> ! {
        self.indicator.halt(delay, period)
    }

    fn start_blocker(&self) -> Option<StartBlocker> {
        if !self.primary.is_enabled() {
            Some(StartBlocker::NotEnabled)
        } else if self.primary.is_disable_ongoing() {
            Some(StartBlocker::DisableOngoing)
        } else if self.primary.is_conversion_ongoing() {
            Some(StartBlocker::ConversionOngoing)
        } else {
            None
        }
    }

    fn check_fault(&self) -> Result<()> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: AcquisitionError) -> AcquisitionError {
        error!(
            "Error encountered during acquisition:\n{}\nReset required to resume acquisition.",
            err
        );
        self.fault = Some(err);
        self.context.faulted.store(true, Ordering::Release);
        self.indicator.engage_fatal();
        err
    }
}
