//! Utilities to manipulate flash address ranges

#[macro_export]
macro_rules! kb {
    ($val:expr) => {
        $val * 1024
    };
}
#[macro_export]
macro_rules! mb {
    ($val:expr) => {
        $val * 1024 * 1024
    };
}

/// Alignment required of every bulk flash transfer.
pub const BULK_ALIGNMENT: u32 = 16;

/// Size in bytes of a flash word as returned by the gateway.
pub const WORD_SIZE: usize = core::mem::size_of::<u32>();

/// Half open range of absolute flash addresses, `[start, start + len)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub const fn new(start: u32, len: u32) -> Self { Self { start, len } }
    pub const fn empty() -> Self { Self { start: 0, len: 0 } }

    /// First address past the span. Saturates instead of wrapping at the top
    /// of the address space.
    pub const fn end(&self) -> u32 { self.start.saturating_add(self.len) }
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address < self.end()
    }

    /// Whether `other` lies entirely inside this span.
    pub const fn encloses(&self, other: &Span) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Overlapping part of two spans, if any.
    pub fn intersection(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        (start < end).then(|| Span::new(start, end - start))
    }
}

pub const fn is_aligned(address: u32, alignment: u32) -> bool { address % alignment == 0 }
