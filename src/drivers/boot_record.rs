//! Driver for the boot record registers written by the previous boot stage.
//!
//! | Offset | Register    | Notes                                        |
//! |--------|-------------|----------------------------------------------|
//! | `0x00` | STATUS      | bit 0 `VALID`, bit 1 `ERROR`                 |
//! | `0x04` | IMAGE_START | Absolute flash address of the image start    |
//! | `0x08` | ITOC_OFFSET | iTOC header offset from the image start      |
use crate::{drivers::registers::RegisterBlock, hal::hint::BootHint, utilities::bitwise::BitFlags};

const STATUS: usize = 0x00;
const IMAGE_START: usize = 0x04;
const ITOC_OFFSET: usize = 0x08;

const VALID_BIT: u8 = 0;
const ERROR_BIT: u8 = 1;

pub struct BootRecord<R: RegisterBlock> {
    registers: R,
}

impl<R: RegisterBlock> BootRecord<R> {
    pub fn new(registers: R) -> Self { Self { registers } }

    fn is_trustworthy(&mut self) -> bool {
        let status = self.registers.read(STATUS);
        status.is_set(VALID_BIT) && status.is_clear(ERROR_BIT)
    }
}

impl<R: RegisterBlock> BootHint for BootRecord<R> {
    fn image_start(&mut self) -> Option<u32> {
        self.is_trustworthy().then(|| self.registers.read(IMAGE_START))
    }

    fn itoc_offset(&mut self) -> Option<u32> {
        if !self.is_trustworthy() {
            return None;
        }
        match self.registers.read(ITOC_OFFSET) {
            0 => None,
            offset => Some(offset),
        }
    }
}
