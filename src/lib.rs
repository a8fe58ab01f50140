//! Double-buffered acquisition from a pair of interleaved analog-to-digital converters.
//!
//! A circular DMA transfer fills a [`RawCapture`](buffer::RawCapture) of 256 words, each carrying
//! one primary result in its low half and one secondary result in its high half. When either half
//! of the buffer has been written, [`Acquisition`](pipeline::Acquisition) splits it into the two
//! sample arrays while the DMA engine keeps filling the other half. The foreground reads the
//! samples and a tri-state [`TransferStatus`](status::TransferStatus) through the shared
//! [`AcquisitionContext`](pipeline::AcquisitionContext).
//!
//! Every fault is fatal. The controller latches it and the status LED switches to a fast blink
//! that only a reset clears.
//!
//! ## Crate features
//!
//! - `defmt`: Routes log messages through [defmt](https://docs.rs/defmt) instead of
//!   [log](https://docs.rs/log), and derives `defmt::Format` on public types.
//! - `rp2040`: Board support for the Raspberry Pi Pico ([`board`]) and the firmware binary.
//!   Implies `defmt`.
//! - `trace_samples`: Logs every demultiplexed sample pair. Very noisy!
//!
//! ## Demo
//!
//! Driving the controller from host code, with stand-ins for the hardware:
//!
//! ```
//! use core::convert::Infallible;
//! use interleaved_capture::{
//!     components::StatusIndicator,
//!     config::ConverterConfig,
//!     converter::Converter,
//!     pipeline::{Acquisition, AcquisitionContext, Trigger},
//!     status::TransferStatus,
//! };
//!
//! #[derive(Default)]
//! struct Adc {
//!     running: bool,
//! }
//!
//! impl Converter for Adc {
//!     fn configure(&mut self, _: &ConverterConfig) {}
//!     fn is_enabled(&self) -> bool { true }
//!     fn is_disable_ongoing(&self) -> bool { false }
//!     fn is_conversion_ongoing(&self) -> bool { self.running }
//!     fn enable_regulator(&mut self) {}
//!     fn start_calibration(&mut self) {}
//!     fn is_calibration_ongoing(&self) -> bool { false }
//!     fn enable(&mut self) {}
//!     fn is_ready(&self) -> bool { true }
//!     fn start_conversion(&mut self) { self.running = true }
//! }
//!
//! struct Led;
//!
//! impl embedded_hal::digital::ErrorType for Led {
//!     type Error = Infallible;
//! }
//!
//! impl embedded_hal::digital::OutputPin for Led {
//!     fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
//!     fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
//! }
//!
//! static CONTEXT: AcquisitionContext = AcquisitionContext::new();
//!
//! let mut acquisition = Acquisition::new(
//!     &CONTEXT,
//!     Adc::default(),
//!     Adc::default(),
//!     StatusIndicator::new(Led),
//! );
//! assert_eq!(acquisition.on_trigger(), Ok(Trigger::Started));
//! assert_eq!(acquisition.on_trigger(), Ok(Trigger::AlreadyArmed));
//!
//! // Interrupt handlers for the DMA half/full events
//! acquisition.on_half_transfer().unwrap();
//! acquisition.on_full_transfer().unwrap();
//!
//! let (status, first) = CONTEXT.read_samples(|samples| samples.get(0));
//! assert_eq!(status, TransferStatus::Complete);
//! assert_eq!(first, Some((0, 0)));
//! ```

// Copyright 2026 The interleaved_capture authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), feature(doc_auto_cfg), feature(doc_cfg_hide))]

#[macro_use]
mod fmt;

pub mod activation;
#[cfg(feature = "rp2040")]
pub mod board;
pub mod buffer;
pub mod components;
pub mod config;
pub mod converter;
pub mod error;
pub mod interrupt;
pub mod pipeline;
pub mod status;

#[cfg(test)]
mod testing;
