//! Converter activation: regulator, self-calibration, enable.

use embedded_hal::delay::DelayNs;
use fugit::MillisDurationU32;

use crate::{
    config::BringUpTiming,
    converter::{Converter, Duration, Monotonic},
    error::{AcquisitionError, BringUpStage, ConverterId, Result},
};

/// The deadline of [`poll_until`] passed without the condition holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Expired;

/// Outcome of a successful [`activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activation {
    /// The converter was already enabled and left untouched
    AlreadyEnabled,
    /// The full regulator/calibration/enable sequence ran
    Enabled,
}

/// Busy-poll `done` until it returns `true` or `timeout` elapses on `clock`.
///
/// The condition is checked once more after the deadline, so a slow poll loop never reports a
/// condition that did hold as expired.
pub fn poll_until<C, F>(
    clock: &C,
    timeout: MillisDurationU32,
    mut done: F,
) -> core::result::Result<(), Expired>
where
    C: Monotonic + ?Sized,
    F: FnMut() -> bool,
{
    let deadline = clock.now() + Duration::micros(u64::from(timeout.to_micros()));
    loop {
        if done() {
            return Ok(());
        }
        if clock.now() >= deadline {
            return if done() { Ok(()) } else { Err(Expired) };
        }
    }
}

/// Bring `converter` to the ready state.
///
/// Converters that are already enabled are skipped. Otherwise: enable the regulator, wait for it
/// to settle, self-calibrate, wait the calibration-to-enable delay, enable and wait for ready.
/// A poll that exceeds its bound aborts the sequence with
/// [`AcquisitionError::BringUpTimeout`]; nothing is retried.
pub fn activate<A, C, D>(
    converter: &mut A,
    id: ConverterId,
    timing: &BringUpTiming,
    clock: &C,
    delay: &mut D,
) -> Result<Activation>
where
    A: Converter + ?Sized,
    C: Monotonic + ?Sized,
    D: DelayNs + ?Sized,
{
    if converter.is_enabled() {
        debug!("{} already enabled, skipping activation", id);
        return Ok(Activation::AlreadyEnabled);
    }

    converter.enable_regulator();
    delay.delay_ns(timing.cycles_to_ns(timing.regulator_settle_cycles()));

    converter.start_calibration();
    poll_until(clock, timing.calibration_timeout, || {
        !converter.is_calibration_ongoing()
    })
    .map_err(|Expired| AcquisitionError::BringUpTimeout {
        converter: id,
        stage: BringUpStage::Calibration,
    })?;

    delay.delay_ns(timing.cycles_to_ns(timing.calibration_to_enable_cycles));

    converter.enable();
    poll_until(clock, timing.ready_timeout, || converter.is_ready()).map_err(|Expired| {
        AcquisitionError::BringUpTimeout {
            converter: id,
            stage: BringUpStage::Ready,
        }
    })?;

    debug!("{} calibrated and ready", id);
    Ok(Activation::Enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClock, FakeConverter, Op, RecordingDelay};

    #[test]
    fn poll_until_returns_as_soon_as_condition_holds() {
        let clock = FakeClock::new(10);
        let mut calls = 0;
        let result = poll_until(&clock, MillisDurationU32::millis(1), || {
            calls += 1;
            calls == 3
        });
        assert_eq!(result, Ok(()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_until_expires_after_timeout() {
        let clock = FakeClock::new(100);
        let result = poll_until(&clock, MillisDurationU32::millis(1), || false);
        assert_eq!(result, Err(Expired));
        assert!(clock.elapsed_us() >= 1_000);
        assert!(clock.elapsed_us() < 1_200);
    }

    #[test]
    fn full_sequence_runs_in_order() {
        let mut converter = FakeConverter::new();
        converter.calibration_polls = 3;
        let clock = FakeClock::new(5);
        let mut delay = RecordingDelay::default();
        let timing = BringUpTiming::default();

        let result = activate(&mut converter, ConverterId::Primary, &timing, &clock, &mut delay);

        assert_eq!(result, Ok(Activation::Enabled));
        assert_eq!(
            converter.ops,
            [Op::EnableRegulator, Op::StartCalibration, Op::Enable]
        );
        // 10 us regulator settle, then 128 cycles at 64 MHz
        assert_eq!(delay.waits_ns, [10_000, 2_000]);
        assert!(converter.is_enabled());
    }

    #[test]
    fn calibration_timeout_stops_before_enable() {
        let mut converter = FakeConverter::new();
        converter.calibration_polls = usize::MAX;
        let clock = FakeClock::new(50);
        let mut delay = RecordingDelay::default();

        let result = activate(
            &mut converter,
            ConverterId::Primary,
            &BringUpTiming::default(),
            &clock,
            &mut delay,
        );

        assert_eq!(
            result,
            Err(AcquisitionError::BringUpTimeout {
                converter: ConverterId::Primary,
                stage: BringUpStage::Calibration,
            })
        );
        assert!(!converter.ops.contains(&Op::Enable));
        assert_eq!(delay.waits_ns.len(), 1);
    }

    #[test]
    fn ready_timeout_is_reported() {
        let mut converter = FakeConverter::new();
        converter.never_ready = true;
        let clock = FakeClock::new(50);
        let mut delay = RecordingDelay::default();

        let result = activate(
            &mut converter,
            ConverterId::Secondary,
            &BringUpTiming::default(),
            &clock,
            &mut delay,
        );

        assert_eq!(
            result,
            Err(AcquisitionError::BringUpTimeout {
                converter: ConverterId::Secondary,
                stage: BringUpStage::Ready,
            })
        );
        assert_eq!(converter.ops.last(), Some(&Op::Enable));
    }

    #[test]
    fn enabled_converter_is_left_alone() {
        let mut converter = FakeConverter::new();
        converter.enabled = true;
        let clock = FakeClock::new(1);
        let mut delay = RecordingDelay::default();

        let result = activate(
            &mut converter,
            ConverterId::Secondary,
            &BringUpTiming::default(),
            &clock,
            &mut delay,
        );

        assert_eq!(result, Ok(Activation::AlreadyEnabled));
        assert!(converter.ops.is_empty());
        assert!(delay.waits_ns.is_empty());
    }
}
