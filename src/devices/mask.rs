//! Masking of bytes excluded from the signed content.
//!
//! The signature is computed over the image as it was before the image
//! magic and the signature's own iTOC entry were programmed, so those bytes
//! read back as erased flash for hashing purposes.
use crate::utilities::memory::Span;

/// Value masked bytes take, matching erased flash.
pub const MASK_VALUE: u8 = 0xFF;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct MaskSet {
    regions: [Span; 2],
}

impl MaskSet {
    pub fn new(magic: Span, signature_entry: Span) -> Self { Self { regions: [magic, signature_entry] } }

    pub fn regions(&self) -> &[Span; 2] { &self.regions }

    /// Masks the parts of `chunk`, which holds flash contents starting at
    /// `address`, that fall inside any mask region. Returns the number of
    /// bytes overwritten. Each region is intersected independently, so a
    /// chunk may be touched by both, one or neither.
    pub fn apply(&self, address: u32, chunk: &mut [u8]) -> usize {
        let window = Span::new(address, chunk.len() as u32);
        self.regions
            .iter()
            .filter_map(|region| window.intersection(region))
            .map(|overlap| {
                let from = (overlap.start - address) as usize;
                chunk[from..from + overlap.len as usize].fill(MASK_VALUE);
                overlap.len as usize
            })
            .sum()
    }
}
