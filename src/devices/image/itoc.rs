//! Image table of contents.
//!
//! The iTOC is a header followed by fixed size entries, each describing one
//! section of the image. All fields are big endian words. Entry layout:
//!
//! | word | contents                                                   |
//! |------|------------------------------------------------------------|
//! | 0    | section type in bits 31..24, section size in words 21..0  |
//! | 1..4 | reserved                                                   |
//! | 5    | section address in words, relative to the image start     |
//! | 6, 7 | entry and section CRCs, not checked here                   |
//!
//! A type of `0xFF` (erased flash) terminates the table.
use arrayvec::ArrayVec;

use crate::{
    devices::{reader::Reader, traits::Flash},
    error::Error,
    utilities::{bitwise::BitField, memory::Span},
};

use super::Magic;

pub const ITOC_MAGIC: Magic = [0x4954_4F43, 0x0408_1516, 0x2342_CAFA, 0xBACA_FE00];
pub const ITOC_HEADER_SIZE: u32 = 0x20;
pub const ITOC_ENTRY_SIZE: u32 = 0x20;
pub const ITOC_ENTRY_WORDS: usize = (ITOC_ENTRY_SIZE / 4) as usize;
/// Maximum number of entries held in an [`ItocArray`].
pub const ITOC_CAPACITY: usize = 32;

const TYPE_FIELD: (u8, u8) = (24, 8);
const SIZE_FIELD: (u8, u8) = (0, 22);
const ADDRESS_WORD: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct SectionType(pub u8);

impl SectionType {
    /// Detached image signature (HMAC).
    pub const SIGNATURE: Self = Self(0x2F);
    pub const END: Self = Self(0xFF);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct ItocEntry {
    pub section: SectionType,
    pub size_words: u32,
    pub address_words: u32,
    /// Absolute flash address of the entry record itself.
    pub record: u32,
}

impl ItocEntry {
    pub fn decode(record: u32, words: &[u32; ITOC_ENTRY_WORDS]) -> Self {
        Self {
            section: SectionType(words[0].field(TYPE_FIELD.0, TYPE_FIELD.1) as u8),
            size_words: words[0].field(SIZE_FIELD.0, SIZE_FIELD.1),
            address_words: words[ADDRESS_WORD],
            record,
        }
    }

    pub fn is_signature(&self) -> bool { self.section == SectionType::SIGNATURE }

    /// Offset past the section, in words from the image start.
    pub fn end_words(&self) -> u64 { self.address_words as u64 + self.size_words as u64 }

    /// Flash range of the section for an image starting at `image_start`,
    /// or `None` if it lies outside the address space.
    pub fn section(&self, image_start: u32) -> Option<Span> {
        let offset = self.address_words.checked_mul(4)?;
        let start = image_start.checked_add(offset)?;
        let len = self.size_words * 4;
        start.checked_add(len)?;
        Some(Span::new(start, len))
    }

    /// Flash range of the entry record.
    pub fn record_span(&self) -> Span { Span::new(self.record, ITOC_ENTRY_SIZE) }
}

/// Parsed table of contents, in flash order.
#[derive(Clone, Debug)]
pub struct ItocArray {
    header: u32,
    entries: ArrayVec<ItocEntry, ITOC_CAPACITY>,
}

impl ItocArray {
    /// Parses entries following the header at `header`, stopping at the
    /// terminator or once the next entry would cross `ceiling`.
    pub fn parse<G: Flash>(reader: &mut Reader<G>, header: u32, ceiling: u32) -> Result<Self, Error> {
        let mut entries = ArrayVec::new();
        let mut signature_seen = false;
        let mut record = header + ITOC_HEADER_SIZE;
        let mut words = [0u32; ITOC_ENTRY_WORDS];

        while record.checked_add(ITOC_ENTRY_SIZE).map_or(false, |end| end <= ceiling) {
            reader.read_words(record, &mut words, true)?;
            let entry = ItocEntry::decode(record, &words);
            if entry.section == SectionType::END {
                break;
            }
            if entry.is_signature() {
                if signature_seen {
                    return Err(Error::DuplicateSignature);
                }
                signature_seen = true;
            }
            entries.try_push(entry).map_err(|_| Error::ItocOverflow)?;
            record += ITOC_ENTRY_SIZE;
        }

        debug!("Parsed {:?} iTOC entries at {:?}", entries.len(), header);
        Ok(Self { header, entries })
    }

    pub fn header(&self) -> u32 { self.header }
    pub fn entries(&self) -> &[ItocEntry] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Index and entry of the signature section.
    ///
    /// Image tooling places it last, so that slot is checked first.
    pub fn signature(&self) -> Option<(usize, &ItocEntry)> {
        match self.entries.last() {
            Some(last) if last.is_signature() => Some((self.entries.len() - 1, last)),
            _ => self
                .entries
                .iter()
                .rposition(ItocEntry::is_signature)
                .map(|index| (index, &self.entries[index])),
        }
    }

    /// Furthest section end among authenticated sections, in words.
    pub fn content_end_words(&self) -> u64 {
        self.entries.iter().filter(|e| !e.is_signature()).map(ItocEntry::end_words).max().unwrap_or(0)
    }
}
