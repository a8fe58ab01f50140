//! Raw capture buffer and the demultiplexed sample arrays.

use core::{cell::UnsafeCell, fmt, ops::Range, ptr};

use crate::config::{Resolution, BUFFER_LEN, HALF_LEN};

/// One half of the circular raw buffer, matching the DMA half/full transfer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    /// Indices `[0, N/2)`, reported by the half-transfer event
    First,
    /// Indices `[N/2, N)`, reported by the full-transfer event
    Second,
}

impl Half {
    /// Raw buffer indices covered by this half.
    pub const fn range(self) -> Range<usize> {
        match self {
            Half::First => 0..HALF_LEN,
            Half::Second => HALF_LEN..BUFFER_LEN,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::First => f.write_str("first"),
            Half::Second => f.write_str("second"),
        }
    }
}

/// Split a concatenated multimode word into `(primary, secondary)`.
///
/// The primary result occupies the low 16 bits, the secondary result the high 16 bits.
///
/// ```
/// use interleaved_capture::buffer::split_word;
///
/// assert_eq!(split_word(0x0ABC_0123), (0x0123, 0x0ABC));
/// ```
pub const fn split_word(word: u32) -> (u16, u16) {
    (word as u16, (word >> 16) as u16)
}

/// Convert a raw conversion result to millivolts against `vdda_mv`.
pub fn to_millivolts(raw: u16, resolution: Resolution, vdda_mv: u32) -> u32 {
    u32::from(raw) * vdda_mv / resolution.full_scale()
}

/// Circular buffer of concatenated samples, written by the DMA engine.
///
/// Aligned to its own size so a DMA engine with address wrapping can cycle through each half
/// without being reprogrammed.
#[repr(C, align(1024))]
pub struct RawCapture(UnsafeCell<[u32; BUFFER_LEN]>);

const _: () = assert!(core::mem::size_of::<RawCapture>() == BUFFER_LEN * 4);

// SAFETY: software only reads the buffer (volatile), the DMA engine is the only writer.
unsafe impl Sync for RawCapture {}

impl RawCapture {
    /// Zeroed buffer, usable in a `static`.
    pub const fn new() -> Self {
        Self(UnsafeCell::new([0; BUFFER_LEN]))
    }

    /// Address handed to the DMA engine.
    pub fn as_mut_ptr(&self) -> *mut u32 {
        self.0.get().cast()
    }

    /// Read the word at `index`.
    ///
    /// # Panics
    ///
    /// If `index` is outside the buffer.
    pub fn word(&self, index: usize) -> u32 {
        assert!(index < BUFFER_LEN);
        // SAFETY: in bounds, and aligned since the array is
        unsafe { ptr::read_volatile(self.as_mut_ptr().add(index)) }
    }

    /// Words of one half, in acquisition order.
    pub fn half(&self, half: Half) -> impl Iterator<Item = u32> + '_ {
        half.range().map(move |index| self.word(index))
    }

    /// Stand-in for the DMA engine writing one word.
    #[cfg(test)]
    pub(crate) fn store(&self, index: usize, word: u32) {
        assert!(index < BUFFER_LEN);
        // SAFETY: in bounds and aligned; tests have no DMA engine writing concurrently
        unsafe { ptr::write_volatile(self.as_mut_ptr().add(index), word) }
    }
}

impl Default for RawCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-converter sample streams, demultiplexed from [`RawCapture`].
///
/// Index `i` of either array holds the result taken from raw word `i`.
#[derive(Clone)]
pub struct SampleBuffers {
    primary: [u16; BUFFER_LEN],
    secondary: [u16; BUFFER_LEN],
}

impl SampleBuffers {
    /// Zeroed arrays, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            primary: [0; BUFFER_LEN],
            secondary: [0; BUFFER_LEN],
        }
    }

    /// Demultiplex `words` into the indices covered by `half`.
    ///
    /// Extra words beyond the half are ignored.
    pub fn demux<I>(&mut self, half: Half, words: I)
    where
        I: IntoIterator<Item = u32>,
    {
        for (index, word) in half.range().zip(words) {
            let (primary, secondary) = split_word(word);
            self.primary[index] = primary;
            self.secondary[index] = secondary;
        }

        #[cfg(feature = "trace_samples")]
        trace!(
            "{} half demultiplexed:\nprimary {:?}\nsecondary {:?}",
            half,
            &self.primary[half.range()],
            &self.secondary[half.range()]
        );
    }

    /// Results of the primary converter.
    pub fn primary(&self) -> &[u16; BUFFER_LEN] {
        &self.primary
    }

    /// Results of the secondary converter.
    pub fn secondary(&self) -> &[u16; BUFFER_LEN] {
        &self.secondary
    }

    /// `(primary, secondary)` pair at `index`.
    pub fn get(&self, index: usize) -> Option<(u16, u16)> {
        Some((*self.primary.get(index)?, *self.secondary.get(index)?))
    }

    /// Zero the pair at index 0 and nothing else.
    ///
    /// Done on a transfer error. It carries no meaning for the other indices, which keep the
    /// last demultiplexed values.
    pub(crate) fn clear_first(&mut self) {
        self.primary[0] = 0;
        self.secondary[0] = 0;
    }
}

impl Default for SampleBuffers {
    fn default() -> Self {
        Self::new()
    }
}
