//! Status indicator driven by the acquisition events
use core::convert::Infallible;

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use fugit::MillisDurationU32;

/// All patterns shown by the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorPattern {
    /// Off: the buffer is partially demultiplexed (or nothing has been captured yet)
    Off,
    /// Steady on: the buffer has been fully demultiplexed
    On,
    /// Fast toggling, reserved for fatal errors. Never left once entered.
    FatalBlink,
}

/// Drives the single status LED.
///
/// Half and full transfer events alternate [`show_partial`](Self::show_partial) and
/// [`show_complete`](Self::show_complete), giving a visible heartbeat while samples flow.
pub struct StatusIndicator<P> {
    pin: P,
    pattern: IndicatorPattern,
    lit: bool,
}

impl<P> StatusIndicator<P>
where
    P: OutputPin<Error = Infallible>,
{
    /// Take control of `pin`, starting with the LED off.
    pub fn new(mut pin: P) -> Self {
        pin.set_low().unwrap_or_else(|never| match never {});
        Self {
            pin,
            pattern: IndicatorPattern::Off,
            lit: false,
        }
    }

    /// Pattern currently shown.
    pub fn pattern(&self) -> IndicatorPattern {
        self.pattern
    }

    /// LED is currently driven high.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Turn the LED off. Ignored once the fatal pattern is engaged.
    pub fn show_partial(&mut self) {
        if self.pattern != IndicatorPattern::FatalBlink {
            self.pattern = IndicatorPattern::Off;
            self.drive(false);
        }
    }

    /// Turn the LED on. Ignored once the fatal pattern is engaged.
    pub fn show_complete(&mut self) {
        if self.pattern != IndicatorPattern::FatalBlink {
            self.pattern = IndicatorPattern::On;
            self.drive(true);
        }
    }

    /// Latch the fatal pattern. The LED starts lit and only [`blink_step`](Self::blink_step)
    /// changes it from here on.
    pub fn engage_fatal(&mut self) {
        if self.pattern != IndicatorPattern::FatalBlink {
            self.pattern = IndicatorPattern::FatalBlink;
            self.drive(true);
        }
    }

    /// Toggle the LED if the fatal pattern is engaged.
    pub fn blink_step(&mut self) {
        if self.pattern == IndicatorPattern::FatalBlink {
            self.drive(!self.lit);
        }
    }

    /// Terminal fatal loop: blink with `period` between toggles, forever.
    pub fn halt<D: DelayNs>(mut self, delay: &mut D, period: MillisDurationU32) -> ! {
        self.engage_fatal();
        loop {
            self.blink_step();
            delay.delay_ms(period.ticks());
        }
    }

    /// Release the pin.
    #[cfg(test)]
    pub(crate) fn free(self) -> P {
        self.pin
    }

    fn drive(&mut self, high: bool) {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.unwrap_or_else(|never| match never {});
        self.lit = high;
    }
}
