//! Dedicated scratchpad slot for the detached image signature.
use crate::{
    devices::{reader::Reader, traits::Flash},
    error::Error,
    utilities::memory::Span,
};

pub struct SignatureSlot<const CAPACITY: usize> {
    bytes: [u8; CAPACITY],
}

impl<const CAPACITY: usize> SignatureSlot<CAPACITY> {
    pub const fn new() -> Self { Self { bytes: [0u8; CAPACITY] } }

    /// Copies the signature section at `span` into the slot. The signature
    /// is never masked.
    pub fn load<G: Flash>(&mut self, reader: &mut Reader<G>, span: Span) -> Result<&[u8], Error> {
        let length = span.len as usize;
        if length > CAPACITY {
            return Err(Error::SignatureTooBig);
        }
        reader.read_bytes(span.start, &mut self.bytes[..length])?;
        Ok(&self.bytes[..length])
    }
}

impl<const CAPACITY: usize> Default for SignatureSlot<CAPACITY> {
    fn default() -> Self { Self::new() }
}
