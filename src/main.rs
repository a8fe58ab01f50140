//! Captures one analog input at double rate on a Raspberry Pi Pico, starting on a button press.
#![no_std]
#![no_main]
#![warn(missing_docs)]

use defmt::{debug, info, warn};
#[allow(unused_imports)]
use defmt_rtt as _;
#[allow(unused_imports)]
use panic_probe as _;
use rp2040_hal::{
    adc::{Adc, AdcPin},
    clocks::init_clocks_and_plls,
    dma::DMAExt,
    entry,
    gpio::{Interrupt::EdgeLow, Pins},
    pac::{self, interrupt},
    Clock, Sio, Timer, Watchdog,
};

use interleaved_capture::{
    board::{PrimaryAdc, RingTransfer, SecondarySlot},
    buffer::to_millivolts,
    components::StatusIndicator,
    config::{CaptureConfig, VDDA_MV},
    interrupt::{
        service_dma_irq, service_trigger, ACQUISITION, CONTEXT, DMA_RING, TRIGGER_BUTTON,
    },
    pipeline::Acquisition,
};

/// Second-stage bootloader, from [rp2040-boot2](https://docs.rs/rp2040-boot2)
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;
/// External high-speed crystal on the pico board is 12Mhz
pub const XOSC_FREQ_HZ: u32 = 12_000_000;
/// Log the first sample pair once per this many completed buffer passes
const REPORT_EVERY: u32 = 1024;

/// Bring-up, then report samples while interrupts do the work
#[entry]
fn main() -> ! {
    info!("Interleaved capture startup");
    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let sio = Sio::new(pac.SIO);

    let clocks = init_clocks_and_plls(
        XOSC_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let clock = timer;

    let config = CaptureConfig::default().with_core_clock(clocks.system_clock.freq());
    debug!("Capture configuration: {}", config);

    // The FIFO borrows the converter for as long as the capture runs
    let adc = cortex_m::singleton!(: Adc = Adc::new(pac.ADC, &mut pac.RESETS)).unwrap();
    let input = AdcPin::new(pins.gpio26.into_floating_input()).unwrap();
    let dma = pac.DMA.split(&mut pac.RESETS);
    let mut ring = RingTransfer::new(dma.ch0, dma.ch1);

    let indicator = StatusIndicator::new(pins.gpio25.into_push_pull_output());
    let mut acquisition = Acquisition::new(
        &CONTEXT,
        PrimaryAdc::new(adc, input),
        SecondarySlot::new(),
        indicator,
    );
    let ready = acquisition
        .configure(&mut ring, &config)
        .and_then(|()| acquisition.activate(&config.bring_up, &clock, &mut timer));
    if let Err(err) = ready {
        warn!("Bring-up failed: {}", err);
        acquisition.halt(&mut timer, config.fatal_blink_period);
    }

    let mut button = pins.gpio15.into_pull_up_input();
    button.set_interrupt_enabled(EdgeLow, true);
    debug!("critical_section: hand controller, DMA ring and button to interrupts");
    critical_section::with(|cs| {
        ACQUISITION.replace(cs, Some(acquisition));
        DMA_RING.replace(cs, Some(ring));
        TRIGGER_BUTTON.replace(cs, Some(button));
    });
    unsafe {
        pac::NVIC::unmask(pac::Interrupt::DMA_IRQ_0);
        pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
    }
    info!("Waiting for trigger on GPIO15");

    let mut reported = 0;
    loop {
        cortex_m::asm::wfi();

        if CONTEXT.is_faulted() {
            pac::NVIC::mask(pac::Interrupt::DMA_IRQ_0);
            pac::NVIC::mask(pac::Interrupt::IO_IRQ_BANK0);
            match critical_section::with(|cs| ACQUISITION.take(cs)) {
                Some(acquisition) => {
                    if let Some(fault) = acquisition.fault() {
                        warn!("Halting on {}", fault);
                    }
                    acquisition.halt(&mut timer, config.fatal_blink_period)
                }
                None => warn!("Fault latched but the controller is gone"),
            }
        }

        let cycles = CONTEXT.completed_cycles();
        if cycles.wrapping_sub(reported) >= REPORT_EVERY {
            reported = cycles;
            let (status, (primary, secondary)) =
                CONTEXT.read_samples(|samples| (samples.primary()[0], samples.secondary()[0]));
            let resolution = config.primary.resolution;
            info!(
                "Pass {}, {}: primary {} mV, secondary {} mV",
                cycles,
                status,
                to_millivolts(primary, resolution, VDDA_MV),
                to_millivolts(secondary, resolution, VDDA_MV)
            );
        }
    }
}

/// DMA completion and error events
#[interrupt]
fn DMA_IRQ_0() {
    critical_section::with(service_dma_irq);
}

/// Trigger button edge
#[interrupt]
fn IO_IRQ_BANK0() {
    critical_section::with(service_trigger);
}
