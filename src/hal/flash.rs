//! Indirect flash access gateway.
//!
//! The flash device is not memory mapped: every access goes through a
//! hardware gateway that reads aligned 32-bit words on request. The gateway
//! is shared by every core that reads flash, so it carries a lock that must
//! be held for the duration of a transfer.
use core::fmt;

/// Reads words through an indirect access gateway.
///
/// Both methods follow `nb` semantics: `WouldBlock` means the hardware is
/// still busy and the call must be repeated with the same arguments, while
/// `Other` is a hard fault that must not be retried.
pub trait Gateway {
    type Error: Clone + Copy + fmt::Debug;

    /// Attempts to take the gateway lock.
    fn try_lock(&mut self) -> nb::Result<(), Self::Error>;

    /// Releases the gateway lock. Only called after a successful `try_lock`.
    fn unlock(&mut self);

    /// Reads `words.len()` words starting at `address`. Each word is returned
    /// so that its little endian byte representation matches flash byte order.
    fn read(&mut self, address: u32, words: &mut [u32]) -> nb::Result<(), Self::Error>;
}
