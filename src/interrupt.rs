//! Interrupt-shared statics, plus [`Mutex`]-guarded peripherals on the board.

#[cfg(feature = "rp2040")]
use core::cell::RefCell;
use core::convert::Infallible;

#[cfg(feature = "rp2040")]
use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

#[cfg(feature = "rp2040")]
use crate::board::{Capture, RingTransfer, TriggerButton};
use crate::{
    converter::{Converter, DmaEventSource, Multimode},
    error::Result,
    pipeline::{Acquisition, AcquisitionContext},
};

/// Raw buffer, sample arrays and status, at a fixed address for debugger watches
pub static CONTEXT: AcquisitionContext = AcquisitionContext::new();

/// Acquisition controller for access in interrupts
#[cfg(feature = "rp2040")]
pub static ACQUISITION: Mutex<RefCell<Option<Capture>>> = Mutex::new(RefCell::new(None));

/// DMA ring, to acknowledge transfer events
#[cfg(feature = "rp2040")]
pub static DMA_RING: Mutex<RefCell<Option<RingTransfer>>> = Mutex::new(RefCell::new(None));

/// Trigger button, to acknowledge its edge interrupt
#[cfg(feature = "rp2040")]
pub static TRIGGER_BUTTON: Mutex<RefCell<Option<TriggerButton>>> =
    Mutex::new(RefCell::new(None));

/// Acknowledge the events pending on `ring` and forward them to the controller.
///
/// Events are acknowledged even once a fault is latched, so the interrupt does not fire again.
pub fn service_dma<R, P, S, L>(
    ring: &mut R,
    acquisition: &mut Acquisition<'_, P, S, L>,
) -> Result<()>
where
    R: DmaEventSource + ?Sized,
    P: Converter + Multimode,
    S: Converter,
    L: OutputPin<Error = Infallible>,
{
    let events = ring.take_events();
    trace!("DMA events: {:?}", events);
    acquisition.on_dma_events(events)
}

/// `DMA_IRQ_0` body: service the board's ring and controller.
#[cfg(feature = "rp2040")]
pub fn service_dma_irq(cs: critical_section::CriticalSection) {
    let mut ring = DMA_RING.borrow_ref_mut(cs);
    let mut acquisition = ACQUISITION.borrow_ref_mut(cs);
    if let (Some(ring), Some(acquisition)) = (ring.as_mut(), acquisition.as_mut()) {
        // Errors are logged and latched by the controller
        let _ = service_dma(ring, acquisition);
    }
}

/// Acknowledge the trigger edge and forward it to the controller.
#[cfg(feature = "rp2040")]
pub fn service_trigger(cs: critical_section::CriticalSection) {
    use rp2040_hal::gpio::Interrupt::EdgeLow;

    if let Some(button) = TRIGGER_BUTTON.borrow_ref_mut(cs).as_mut() {
        button.clear_interrupt(EdgeLow);
    }
    if let Some(acquisition) = ACQUISITION.borrow_ref_mut(cs).as_mut() {
        // Errors are logged and latched by the controller
        if let Ok(trigger) = acquisition.on_trigger() {
            debug!("Trigger: {:?}", trigger);
        }
    }
}
