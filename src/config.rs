//! Board level configuration: where images may live on flash and how long
//! the pipeline may poll hardware before giving up.
//!
//! Ports declare these as constants and verify them at compile time, e.g.
//!
//! ```ignore
//! const_assert!(CONFIGURATION.is_sound());
//! ```
use crate::utilities::memory::{is_aligned, Span, BULK_ALIGNMENT};

/// Sizes of the fixed iTOC structures, needed to sanity check layouts.
const ITOC_HEADER_SIZE: u32 = crate::devices::image::itoc::ITOC_HEADER_SIZE;
const ITOC_ENTRY_SIZE: u32 = crate::devices::image::itoc::ITOC_ENTRY_SIZE;

/// Flash memory map relevant to image discovery.
#[derive(Copy, Clone, Debug)]
pub struct FlashLayout {
    /// Directly addressed flash range that may hold images.
    pub region: Span,
    /// Image start addresses to scan, in order of preference. Conventionally
    /// the primary slots followed by the recovery slot.
    pub candidates: &'static [u32],
    /// Largest authenticated image accepted, excluding its signature.
    pub max_image_size: u32,
    /// Distance between consecutive iTOC header probes, from the image start.
    pub itoc_stride: u32,
    /// Largest offset from the image start at which an iTOC header is probed.
    pub itoc_window: u32,
    /// Bytes from the iTOC header past which no entry is parsed.
    pub itoc_table_size: u32,
}

/// Poll budgets. Every busy wait in the pipeline is bounded by one of these.
#[derive(Copy, Clone, Debug)]
pub struct Budget {
    /// Polls of the flash gateway lock or transfer status before timing out.
    pub gateway_polls: u32,
    /// Polls of a segment flag or engine acknowledgement before declaring
    /// the copy engine stalled.
    pub engine_polls: u32,
}

#[derive(Copy, Clone, Debug)]
pub struct Configuration {
    pub layout: FlashLayout,
    pub budget: Budget,
}

impl FlashLayout {
    // NOTE: Control flow is awkward since this must be usable at compile time.
    pub const fn is_sound(&self) -> bool {
        if self.region.is_empty() || self.region.start.checked_add(self.region.len).is_none() {
            return false;
        }
        if self.candidates.is_empty() || self.max_image_size == 0 {
            return false;
        }
        let mut index = 0usize;
        loop {
            if index == self.candidates.len() {
                break;
            }
            let candidate = self.candidates[index];
            if !is_aligned(candidate, BULK_ALIGNMENT) || !self.region.contains(candidate) {
                return false;
            }
            index += 1;
        }
        self.itoc_stride != 0
            && is_aligned(self.itoc_stride, BULK_ALIGNMENT)
            && self.itoc_window >= self.itoc_stride
            && self.itoc_table_size >= ITOC_HEADER_SIZE + ITOC_ENTRY_SIZE
    }
}

impl Budget {
    pub const fn is_sound(&self) -> bool { self.gateway_polls > 0 && self.engine_polls > 0 }
}

impl Configuration {
    pub const fn is_sound(&self) -> bool { self.layout.is_sound() && self.budget.is_sound() }
}
