//! Fault taxonomy of the acquisition pipeline.
//!
//! Every variant is fatal: once [`Acquisition`](crate::pipeline::Acquisition) reports one, it is
//! latched and the pipeline stops reacting to hardware events until the system is reset.

use core::fmt;

/// Shorthand for results returned by the pipeline.
pub type Result<T> = core::result::Result<T, AcquisitionError>;

/// Which converter of the interleaved pair an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConverterId {
    /// Converter that receives the start command and drives the pair.
    Primary,
    /// Hardware-chained converter, never started by software.
    Secondary,
}

/// Bring-up step whose bounded poll expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUpStage {
    /// Self-calibration did not finish.
    Calibration,
    /// The converter never reported ready after being enabled.
    Ready,
}

/// Converter state that prevented a software start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartBlocker {
    /// Converter is disabled.
    NotEnabled,
    /// A disable command is still being processed.
    DisableOngoing,
    /// A conversion sequence is already running.
    ConversionOngoing,
}

/// Errors raised by the acquisition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionError {
    /// Calibration or ready flag not observed before the deadline.
    BringUpTimeout {
        /// Converter being activated
        converter: ConverterId,
        /// Step that timed out
        stage: BringUpStage,
    },
    /// The trigger arrived while the primary converter could not be started.
    PreconditionViolation(StartBlocker),
    /// The DMA engine reported a bus or transfer fault.
    TransferError,
    /// A conversion result was overwritten before the DMA engine read it.
    Overrun,
    /// Configuration was attempted while a converter was enabled.
    ConfiguredWhileEnabled(ConverterId),
    /// The configured converter pair exposed no data source for the DMA channel.
    MissingDmaSource,
}

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConverterId::Primary => f.write_str("primary converter"),
            ConverterId::Secondary => f.write_str("secondary converter"),
        }
    }
}

impl fmt::Display for BringUpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BringUpStage::Calibration => f.write_str("calibration"),
            BringUpStage::Ready => f.write_str("ready flag"),
        }
    }
}

impl fmt::Display for StartBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartBlocker::NotEnabled => f.write_str("converter not enabled"),
            StartBlocker::DisableOngoing => f.write_str("disable in progress"),
            StartBlocker::ConversionOngoing => f.write_str("conversion already running"),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::BringUpTimeout { converter, stage } => {
                write!(f, "{converter}: timed out waiting for {stage}")
            }
            AcquisitionError::PreconditionViolation(blocker) => {
                write!(f, "unable to start conversion: {blocker}")
            }
            AcquisitionError::TransferError => f.write_str("DMA transfer error"),
            AcquisitionError::Overrun => f.write_str("converter overrun"),
            AcquisitionError::ConfiguredWhileEnabled(converter) => {
                write!(f, "{converter} must be disabled during configuration")
            }
            AcquisitionError::MissingDmaSource => {
                f.write_str("converter pair has no DMA source after configuration")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_step() {
        let err = AcquisitionError::BringUpTimeout {
            converter: ConverterId::Secondary,
            stage: BringUpStage::Calibration,
        };
        assert_eq!(
            err.to_string(),
            "secondary converter: timed out waiting for calibration"
        );
        assert_eq!(
            AcquisitionError::PreconditionViolation(StartBlocker::ConversionOngoing).to_string(),
            "unable to start conversion: conversion already running"
        );
    }
}
