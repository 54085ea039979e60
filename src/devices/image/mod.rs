//! Firmware image discovery.
//!
//! An image starts with a four word magic pattern at one of a few candidate
//! addresses, and carries an image table of contents (iTOC) a short distance
//! after its start. The iTOC describes every section of the image, one of
//! which is the detached signature over all the others.
//!
//! Discovery consults the boot hint first, since the boot ROM has already
//! done this work once, and falls back to scanning when the hint is absent
//! or stale.
use crate::{
    config::FlashLayout,
    devices::{mask::MaskSet, reader::Reader, traits::Flash},
    error::Error,
    hal::hint::BootHint,
    utilities::memory::{is_aligned, Span, BULK_ALIGNMENT},
};
use itoc::{ItocArray, ITOC_ENTRY_SIZE, ITOC_HEADER_SIZE, ITOC_MAGIC};

pub mod itoc;
#[cfg(test)]
pub mod synthetic;

pub type Magic = [u32; 4];

/// Pattern found at the start of every image, stored big endian.
pub const IMAGE_MAGIC: Magic = [0x4D54_4657, 0xABCD_EF00, 0xFADE_1234, 0x5678_DEAD];
pub const MAGIC_SIZE: u32 = 16;

/// How the image start was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Origin {
    Hint,
    /// Index into the layout's candidate list.
    Candidate(usize),
}

/// Image descriptor
#[derive(Clone, Debug)]
pub struct ImageDescriptor {
    start: u32,
    length: u32,
    origin: Origin,
    signature: Span,
    signature_index: usize,
    signature_record: u32,
    itoc: ItocArray,
}

impl ImageDescriptor {
    pub fn start(&self) -> u32 { self.start }
    /// Bytes of authenticated content, from the image start. Excludes the
    /// signature section.
    pub fn length(&self) -> u32 { self.length }
    pub fn span(&self) -> Span { Span::new(self.start, self.length) }
    pub fn origin(&self) -> Origin { self.origin }
    pub fn signature(&self) -> Span { self.signature }
    pub fn signature_index(&self) -> usize { self.signature_index }
    /// Absolute address of the signature's own iTOC entry.
    pub fn signature_record(&self) -> u32 { self.signature_record }
    pub fn itoc(&self) -> &ItocArray { &self.itoc }

    /// Byte ranges that are hashed as erased flash: the image magic and the
    /// signature's iTOC entry.
    pub fn masks(&self) -> MaskSet {
        MaskSet::new(
            Span::new(self.start, MAGIC_SIZE),
            Span::new(self.signature_record, ITOC_ENTRY_SIZE),
        )
    }
}

/// Locates and validates the image, returning its descriptor.
pub fn discover<G: Flash, H: BootHint>(
    reader: &mut Reader<G>,
    hint: &mut H,
    layout: &FlashLayout,
) -> Result<ImageDescriptor, Error> {
    let (start, origin) = locate_image(reader, hint, layout)?;
    let header = locate_itoc(reader, hint, layout, start, origin)?;
    let ceiling = header.saturating_add(layout.itoc_table_size).min(layout.region.end());
    let itoc = ItocArray::parse(reader, header, ceiling)?;

    let end_words = itoc.content_end_words();
    if end_words == 0 {
        return Err(Error::ImageEmpty);
    }
    let length = end_words * 4;
    if length > layout.max_image_size as u64 || start as u64 + length > layout.region.end() as u64 {
        return Err(Error::ImageTooBig);
    }

    let (signature_index, entry) = itoc.signature().map(|(i, e)| (i, *e)).ok_or(Error::NoSignature)?;
    let signature = entry
        .section(start)
        .filter(|s| !s.is_empty() && layout.region.encloses(s))
        .ok_or(Error::NoSignature)?;

    info!("Found {:?} byte image at {:?} ({:?})", length, start, origin);
    Ok(ImageDescriptor {
        start,
        length: length as u32,
        origin,
        signature,
        signature_index,
        signature_record: entry.record,
        itoc,
    })
}

fn magic_at<G: Flash>(
    reader: &mut Reader<G>,
    layout: &FlashLayout,
    address: u32,
    magic: &Magic,
) -> Result<bool, Error> {
    if !is_aligned(address, BULK_ALIGNMENT) || !layout.region.encloses(&Span::new(address, MAGIC_SIZE)) {
        return Ok(false);
    }
    Ok(reader.read_magic(address)? == *magic)
}

fn locate_image<G: Flash, H: BootHint>(
    reader: &mut Reader<G>,
    hint: &mut H,
    layout: &FlashLayout,
) -> Result<(u32, Origin), Error> {
    if let Some(start) = hint.image_start() {
        if magic_at(reader, layout, start, &IMAGE_MAGIC)? {
            return Ok((start, Origin::Hint));
        }
        warn!("Boot hint {:?} does not point at an image, scanning", start);
    }

    for (index, &candidate) in layout.candidates.iter().enumerate() {
        if magic_at(reader, layout, candidate, &IMAGE_MAGIC)? {
            return Ok((candidate, Origin::Candidate(index)));
        }
    }
    Err(Error::NoValidImage)
}

fn locate_itoc<G: Flash, H: BootHint>(
    reader: &mut Reader<G>,
    hint: &mut H,
    layout: &FlashLayout,
    start: u32,
    origin: Origin,
) -> Result<u32, Error> {
    if origin == Origin::Hint {
        if let Some(header) = hint.itoc_offset().and_then(|offset| start.checked_add(offset)) {
            if magic_at(reader, layout, header, &ITOC_MAGIC)? {
                return Ok(header);
            }
            warn!("Boot hint iTOC {:?} is stale, probing", header);
        }
    }

    let probes = layout.itoc_window.checked_div(layout.itoc_stride).unwrap_or(0);
    for k in 1..=probes {
        let header = match k.checked_mul(layout.itoc_stride).and_then(|o| start.checked_add(o)) {
            Some(header) if header.saturating_add(ITOC_HEADER_SIZE) <= layout.region.end() => header,
            _ => break,
        };
        if magic_at(reader, layout, header, &ITOC_MAGIC)? {
            return Ok(header);
        }
    }
    Err(Error::NoValidItoc)
}
