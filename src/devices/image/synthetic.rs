//! In-memory image construction for tests.
use super::{
    itoc::{ItocEntry, SectionType, ITOC_ENTRY_SIZE, ITOC_ENTRY_WORDS, ITOC_HEADER_SIZE, ITOC_MAGIC},
    Magic, IMAGE_MAGIC, MAGIC_SIZE,
};
use crate::{
    config::FlashLayout,
    devices::mask::MASK_VALUE,
    hal::doubles::flash::ERASED,
    utilities::memory::Span,
};

pub fn encode_entry(entry: &ItocEntry) -> [u32; ITOC_ENTRY_WORDS] {
    let mut words = [0u32; ITOC_ENTRY_WORDS];
    words[0] = (entry.section.0 as u32) << 24 | (entry.size_words & 0x003F_FFFF);
    words[5] = entry.address_words;
    words
}

/// Deterministic filler for section contents, so tests can tell any two
/// flash locations apart.
pub fn pattern(address: u32) -> u8 { (address % 251) as u8 ^ (address >> 8) as u8 }

pub struct ImageBuilder {
    start: u32,
    flash: Vec<u8>,
    image_magic: Magic,
    itoc_offset: u32,
    itoc_magic: Option<Magic>,
    sections: Vec<(SectionType, u32, u32)>,
}

/// A built image and where its parts landed, in absolute addresses.
pub struct SyntheticImage {
    pub flash: Vec<u8>,
    pub start: u32,
    pub itoc: u32,
    pub signature: Span,
    pub signature_record: Option<u32>,
}

impl SyntheticImage {
    /// Byte at `offset` from the image start as the verifier must see it.
    pub fn masked(&self, offset: u32) -> u8 {
        let address = self.start + offset;
        let in_record = self
            .signature_record
            .map_or(false, |record| Span::new(record, ITOC_ENTRY_SIZE).contains(address));
        if offset < MAGIC_SIZE || in_record {
            MASK_VALUE
        } else {
            self.flash[address as usize]
        }
    }
}

impl ImageBuilder {
    pub fn new(start: u32) -> Self {
        Self {
            start,
            flash: Vec::new(),
            image_magic: IMAGE_MAGIC,
            itoc_offset: 0x40,
            itoc_magic: Some(ITOC_MAGIC),
            sections: Vec::new(),
        }
    }

    /// Writes over existing flash contents instead of blank flash.
    pub fn over(mut self, flash: Vec<u8>) -> Self {
        self.flash = flash;
        self
    }

    pub fn image_magic(mut self, magic: Magic) -> Self {
        self.image_magic = magic;
        self
    }

    pub fn itoc_at(mut self, offset: u32) -> Self {
        self.itoc_offset = offset;
        self
    }

    pub fn without_itoc(mut self) -> Self {
        self.itoc_magic = None;
        self
    }

    pub fn section(mut self, kind: u8, address_words: u32, size_words: u32) -> Self {
        self.sections.push((SectionType(kind), address_words, size_words));
        self
    }

    pub fn signature(self, address_words: u32, size_words: u32) -> Self {
        self.section(SectionType::SIGNATURE.0, address_words, size_words)
    }

    pub fn build(self) -> SyntheticImage {
        let Self { start, mut flash, image_magic, itoc_offset, itoc_magic, sections } = self;
        let itoc = start + itoc_offset;

        for &(_, address_words, size_words) in &sections {
            let section = start + address_words * 4;
            for address in section..section + size_words * 4 {
                write(&mut flash, address, &[pattern(address)]);
            }
        }

        write_words(&mut flash, start, &image_magic);
        let mut signature = Span::empty();
        let mut signature_record = None;
        if let Some(magic) = itoc_magic {
            write_words(&mut flash, itoc, &magic);
            write_words(&mut flash, itoc + 16, &[0u32; 4]);
            let mut record = itoc + ITOC_HEADER_SIZE;
            for &(section, address_words, size_words) in &sections {
                let entry = ItocEntry { section, size_words, address_words, record };
                write_words(&mut flash, record, &encode_entry(&entry));
                if entry.is_signature() {
                    signature = Span::new(start + address_words * 4, size_words * 4);
                    signature_record = Some(record);
                }
                record += ITOC_ENTRY_SIZE;
            }
            write_words(&mut flash, record, &[u32::MAX; ITOC_ENTRY_WORDS]);
        }

        SyntheticImage { flash, start, itoc, signature, signature_record }
    }
}

fn write(flash: &mut Vec<u8>, address: u32, bytes: &[u8]) {
    let end = address as usize + bytes.len();
    if flash.len() < end {
        flash.resize(end, ERASED);
    }
    flash[address as usize..end].copy_from_slice(bytes);
}

/// Structures are stored big endian.
fn write_words(flash: &mut Vec<u8>, address: u32, words: &[u32]) {
    for (index, word) in words.iter().enumerate() {
        write(flash, address + index as u32 * 4, &word.to_be_bytes());
    }
}

/// Layout fitting every image built with default offsets below 0x4000.
pub const LAYOUT: FlashLayout = FlashLayout {
    region: Span::new(0x0, 0x4000),
    candidates: &[0x0, 0x1000, 0x2000],
    max_image_size: 0x800,
    itoc_stride: 0x40,
    itoc_window: 0x400,
    itoc_table_size: 0x400,
};

/// 384 bytes of authenticated content followed by a 64 byte signature.
pub fn scenario(start: u32) -> ImageBuilder {
    ImageBuilder::new(start).section(0x01, 0x30, 0x30).signature(0x60, 0x10)
}

/// Layout probing for the iTOC every 16 bytes.
pub const FINE_LAYOUT: FlashLayout = FlashLayout { itoc_stride: 0x10, ..LAYOUT };

/// The content of [`scenario`], with the signature listed first in an iTOC
/// at offset 0x50. The signature record then spans 0x70..0x90 from the
/// start, across the 0x80 boundary. Only found with [`FINE_LAYOUT`].
pub fn straddling(start: u32) -> ImageBuilder {
    ImageBuilder::new(start).itoc_at(0x50).signature(0x60, 0x10).section(0x01, 0x30, 0x30)
}
