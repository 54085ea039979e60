//! On-chip scratchpad through which image data is served.
//!
//! The scratchpad is too small to hold an image, so data is handed out one
//! chunk at a time. Chunks are addressed by index: chunk `i` holds image
//! bytes `[i * CHUNK_SIZE, (i + 1) * CHUNK_SIZE)`, with the last chunk
//! possibly shorter. Every chunk has already been masked.
use crate::{
    devices::{image::ImageDescriptor, reader::Reader, traits::Flash},
    error::Error,
};

pub mod offload;
pub mod signature;
pub mod synchronous;

pub use offload::OffloadScratchpad;
pub use signature::SignatureSlot;
pub use synchronous::SyncScratchpad;

pub trait Scratchpad {
    /// Bytes in every chunk but possibly the last.
    const CHUNK_SIZE: usize;

    /// Prepares to serve data from `image`, discarding any previous session.
    fn arm(&mut self, image: &ImageDescriptor) -> Result<(), Error>;

    /// Returns chunk `index` of the armed image.
    ///
    /// Fails with [`Error::NoMoreData`] past the end of the image.
    fn next_chunk<G: Flash>(&mut self, reader: &mut Reader<G>, index: usize) -> Result<&[u8], Error>;

    /// Ends the session. Chunks are no longer served until re-armed.
    fn disarm(&mut self);
}

/// Chunk `index` of an image of `length` bytes served `chunk_size` bytes at
/// a time, as an offset and length. `None` past the end of the image.
pub(crate) fn chunk_bounds(length: u32, chunk_size: usize, index: usize) -> Option<(u32, usize)> {
    let offset = u32::try_from(index.checked_mul(chunk_size)?).ok()?;
    (offset < length).then(|| (offset, chunk_size.min((length - offset) as usize)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chunk_bounds_cover_the_image_exactly() {
        assert_eq!(chunk_bounds(384, 64, 0), Some((0, 64)));
        assert_eq!(chunk_bounds(384, 64, 5), Some((320, 64)));
        assert_eq!(chunk_bounds(384, 64, 6), None);
        assert_eq!(chunk_bounds(400, 64, 6), Some((384, 16)));
        assert_eq!(chunk_bounds(400, 64, usize::MAX), None);
    }
}
