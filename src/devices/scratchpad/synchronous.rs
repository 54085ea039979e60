//! Scratchpad filled on demand by the requesting core.
//!
//! The scratchpad holds `SLOTS` slots of `SLOT_SIZE` bytes each, and keeps a
//! window of consecutive image data. A request inside the window is served
//! straight from the slots. A request outside it refills every slot,
//! starting at the requested chunk. Once every slot in the window has been
//! served the window is dropped, so the next request refills.
use super::{chunk_bounds, Scratchpad};
use crate::{
    devices::{image::ImageDescriptor, mask::MaskSet, reader::Reader, traits::Flash},
    error::Error,
    utilities::memory::{Span, BULK_ALIGNMENT},
};

pub struct SyncScratchpad<const SLOTS: usize, const SLOT_SIZE: usize> {
    slots: [[u8; SLOT_SIZE]; SLOTS],
    lengths: [usize; SLOTS],
    /// Flash range currently held in the slots.
    window: Span,
    valid: bool,
    /// Slots filled by the last refill.
    write: usize,
    /// Slot following the last one served.
    read: usize,
    armed: Option<(Span, MaskSet)>,
}

impl<const SLOTS: usize, const SLOT_SIZE: usize> SyncScratchpad<SLOTS, SLOT_SIZE> {
    const GEOMETRY: () = assert!(
        SLOTS > 0 && SLOT_SIZE > 0 && SLOT_SIZE % BULK_ALIGNMENT as usize == 0,
        "Scratchpad slots must be non-empty multiples of the bulk alignment"
    );

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::GEOMETRY;
        Self {
            slots: [[0u8; SLOT_SIZE]; SLOTS],
            lengths: [0; SLOTS],
            window: Span::empty(),
            valid: false,
            write: 0,
            read: 0,
            armed: None,
        }
    }

    /// Whether the slots currently hold data for `address`.
    pub fn holds(&self, address: u32) -> bool { self.valid && self.window.contains(address) }

    fn invalidate(&mut self) {
        self.valid = false;
        self.write = 0;
        self.read = 0;
    }

    fn refill<G: Flash>(
        &mut self,
        reader: &mut Reader<G>,
        image: Span,
        masks: &MaskSet,
        from: u32,
    ) -> Result<(), Error> {
        self.invalidate();
        let mut cursor = from;
        while self.write < SLOTS && cursor < image.end() {
            let length = SLOT_SIZE.min((image.end() - cursor) as usize);
            let slot = &mut self.slots[self.write][..length];
            reader.read_bytes(cursor, slot)?;
            masks.apply(cursor, slot);
            self.lengths[self.write] = length;
            self.write += 1;
            cursor += length as u32;
        }
        trace!("Scratchpad refilled with {:?} slots from {:?}", self.write, from);
        self.window = Span::new(from, cursor - from);
        self.valid = true;
        Ok(())
    }
}

impl<const SLOTS: usize, const SLOT_SIZE: usize> Default for SyncScratchpad<SLOTS, SLOT_SIZE> {
    fn default() -> Self { Self::new() }
}

impl<const SLOTS: usize, const SLOT_SIZE: usize> Scratchpad for SyncScratchpad<SLOTS, SLOT_SIZE> {
    const CHUNK_SIZE: usize = SLOT_SIZE;

    fn arm(&mut self, image: &ImageDescriptor) -> Result<(), Error> {
        self.invalidate();
        self.armed = Some((image.span(), image.masks()));
        Ok(())
    }

    fn next_chunk<G: Flash>(&mut self, reader: &mut Reader<G>, index: usize) -> Result<&[u8], Error> {
        let (image, masks) = self.armed.ok_or(Error::NotArmed)?;
        let (offset, _) = chunk_bounds(image.len, SLOT_SIZE, index).ok_or(Error::NoMoreData)?;
        let address = image.start + offset;

        if !self.holds(address) {
            self.refill(reader, image, &masks, address)?;
        }

        let slot = (address - self.window.start) as usize / SLOT_SIZE;
        self.read = slot + 1;
        if self.read == self.write {
            // Window drained.
            self.invalidate();
        }
        Ok(&self.slots[slot][..self.lengths[slot]])
    }

    fn disarm(&mut self) {
        self.invalidate();
        self.armed = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::FlashLayout,
        devices::{
            image::{
                discover,
                synthetic::{straddling, ImageBuilder, SyntheticImage, FINE_LAYOUT},
            },
            mask::MASK_VALUE,
        },
        hal::doubles::{flash::FakeGateway, hint::FakeHint},
    };

    const LAYOUT: FlashLayout = FlashLayout {
        region: Span::new(0x0, 0x4000),
        candidates: &[0x0, 0x1000],
        max_image_size: 0x1000,
        itoc_stride: 0x40,
        itoc_window: 0x400,
        itoc_table_size: 0x400,
    };

    fn session() -> (Reader<FakeGateway>, ImageDescriptor, Vec<u8>) {
        let image =
            ImageBuilder::new(0x1000).section(0x01, 0x30, 0x30).signature(0x60, 0x10).build();
        let flash = image.flash.clone();
        let mut reader = Reader::new(FakeGateway::new(0, image.flash), 4);
        let descriptor = discover(&mut reader, &mut FakeHint::default(), &LAYOUT).unwrap();
        reader.gateway_mut().clear();
        (reader, descriptor, flash)
    }

    fn discovered(
        image: &SyntheticImage,
        layout: &FlashLayout,
    ) -> (Reader<FakeGateway>, ImageDescriptor) {
        let mut reader = Reader::new(FakeGateway::new(0, image.flash.clone()), 4);
        let descriptor = discover(&mut reader, &mut FakeHint::default(), layout).unwrap();
        reader.gateway_mut().clear();
        (reader, descriptor)
    }

    #[test]
    fn serving_a_whole_image_refills_once_per_window() {
        // Given
        let (mut reader, image, flash) = session();
        let mut scratchpad = SyncScratchpad::<2, 64>::new();
        scratchpad.arm(&image).unwrap();
        let mut served = Vec::new();

        // When
        for index in 0..6 {
            served.extend_from_slice(scratchpad.next_chunk(&mut reader, index).unwrap());
        }

        // Then
        assert_eq!(served.len(), 384);
        let addresses: Vec<u32> = reader.gateway().reads.iter().map(|r| r.address).collect();
        assert_eq!(addresses, [0x1000, 0x1040, 0x1080, 0x10C0, 0x1100, 0x1140]);
        assert_eq!(served[..16], [0xFF; 16]);
        assert_eq!(served[16..0x80], flash[0x1010..0x1080]);
        assert_eq!(served[0x80..0xA0], [0xFF; 32]);
        assert_eq!(served[0xA0..], flash[0x10A0..0x1180]);
        assert_eq!(scratchpad.next_chunk(&mut reader, 6).unwrap_err(), Error::NoMoreData);
    }

    #[test]
    fn hits_inside_the_window_do_not_touch_flash() {
        // Given
        let (mut reader, image, _) = session();
        let mut scratchpad = SyncScratchpad::<4, 64>::new();
        scratchpad.arm(&image).unwrap();

        // When
        scratchpad.next_chunk(&mut reader, 0).unwrap();
        scratchpad.next_chunk(&mut reader, 2).unwrap();
        scratchpad.next_chunk(&mut reader, 1).unwrap();

        // Then
        assert_eq!(reader.gateway().reads.len(), 4);
        assert!(scratchpad.holds(0x10C0));
        assert!(!scratchpad.holds(0x1100));

        // When
        scratchpad.next_chunk(&mut reader, 3).unwrap();

        // Then
        assert!(!scratchpad.holds(0x1000));
        scratchpad.next_chunk(&mut reader, 0).unwrap();
        assert_eq!(reader.gateway().reads.len(), 8);
    }

    #[test]
    fn misses_refill_from_the_requested_chunk() {
        // Given
        let (mut reader, image, flash) = session();
        let mut scratchpad = SyncScratchpad::<2, 64>::new();
        scratchpad.arm(&image).unwrap();

        // When
        let chunk = scratchpad.next_chunk(&mut reader, 4).unwrap().to_vec();

        // Then
        assert_eq!(chunk[..], flash[0x1100..0x1140]);
        assert!(!scratchpad.holds(0x10C0));
        assert!(scratchpad.holds(0x1140));
        assert!(!scratchpad.holds(0x1180));
    }

    #[test]
    fn unarmed_scratchpad_serves_nothing() {
        let (mut reader, image, _) = session();
        let mut scratchpad = SyncScratchpad::<2, 64>::new();
        assert_eq!(scratchpad.next_chunk(&mut reader, 0).unwrap_err(), Error::NotArmed);
        scratchpad.arm(&image).unwrap();
        scratchpad.next_chunk(&mut reader, 0).unwrap();
        scratchpad.disarm();
        assert_eq!(scratchpad.next_chunk(&mut reader, 1).unwrap_err(), Error::NotArmed);
    }

    #[test]
    fn rearming_discards_the_previous_window() {
        // Given
        let first =
            ImageBuilder::new(0x1000).section(0x01, 0x30, 0x30).signature(0x60, 0x10).build();
        let second = ImageBuilder::new(0x1000)
            .section(0x02, 0x20, 0x08)
            .section(0x01, 0x30, 0x30)
            .signature(0x60, 0x10)
            .build();
        assert_ne!(first.flash[0x1060..0x1080], second.flash[0x1060..0x1080]);
        let (mut reader, descriptor) = discovered(&first, &LAYOUT);
        let mut scratchpad = SyncScratchpad::<4, 64>::new();
        scratchpad.arm(&descriptor).unwrap();
        scratchpad.next_chunk(&mut reader, 0).unwrap();
        assert!(scratchpad.holds(0x10C0));

        // When
        let (mut reader, descriptor) = discovered(&second, &LAYOUT);
        scratchpad.arm(&descriptor).unwrap();
        let mut served = Vec::new();
        for index in 0..3 {
            served.extend_from_slice(scratchpad.next_chunk(&mut reader, index).unwrap());
        }

        // Then
        assert_eq!(reader.gateway().reads.len(), 4);
        let expected: Vec<u8> = (0..0xC0).map(|offset| second.masked(offset)).collect();
        assert_eq!(served, expected);
        assert_eq!(served[0xA0..0xC0], [MASK_VALUE; 0x20]);
    }

    #[test]
    fn mask_regions_straddling_slots_are_masked_in_both() {
        // Given
        let image = straddling(0x1000).build();
        let (mut reader, descriptor) = discovered(&image, &FINE_LAYOUT);
        let mut scratchpad = SyncScratchpad::<4, 32>::new();
        scratchpad.arm(&descriptor).unwrap();
        let mut served = Vec::new();

        // When
        for index in 0..12 {
            served.extend_from_slice(scratchpad.next_chunk(&mut reader, index).unwrap());
        }

        // Then
        assert_eq!(served[0x70..0x80], [MASK_VALUE; 0x10]);
        assert_eq!(served[0x80..0x90], [MASK_VALUE; 0x10]);
        assert_eq!(served[0x60..0x70], image.flash[0x1060..0x1070]);
        assert_eq!(served[0x90..0xA0], image.flash[0x1090..0x10A0]);
        assert_ne!(served[0x90..0xA0], [MASK_VALUE; 0x10]);
        let expected: Vec<u8> = (0..384).map(|offset| image.masked(offset)).collect();
        assert_eq!(served, expected);
    }
}
