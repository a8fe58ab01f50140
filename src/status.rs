//! Tri-state transfer status shared between interrupt handlers and the foreground loop.

use core::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Progress of the circular DMA transfer.
///
/// The discriminants are the values reported to a debugger watching the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferStatus {
    /// The buffer is being filled and is not fully demultiplexed
    InProgress = 0,
    /// The second half has just been demultiplexed
    Complete = 1,
    /// No trigger has been received yet
    NotStarted = 2,
}

impl TransferStatus {
    /// Decode a stored status byte. Unknown values decode as [`TransferStatus::NotStarted`].
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => TransferStatus::InProgress,
            1 => TransferStatus::Complete,
            _ => TransferStatus::NotStarted,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::InProgress => f.write_str("in progress"),
            TransferStatus::Complete => f.write_str("complete"),
            TransferStatus::NotStarted => f.write_str("not started"),
        }
    }
}

/// Atomic cell holding a [`TransferStatus`].
///
/// Only loads and stores are used, so this works on cores without compare-and-swap.
pub struct SharedStatus(AtomicU8);

impl SharedStatus {
    /// New cell in the [`TransferStatus::NotStarted`] state.
    pub const fn new() -> Self {
        Self(AtomicU8::new(TransferStatus::NotStarted as u8))
    }

    /// Current status.
    pub fn load(&self) -> TransferStatus {
        TransferStatus::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Publish a new status.
    pub fn store(&self, status: TransferStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}
