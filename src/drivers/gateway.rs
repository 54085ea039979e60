//! Driver for the flash indirect access gateway.
//!
//! Register map (byte offsets):
//!
//! | Offset | Register  | Notes                                                  |
//! |--------|-----------|--------------------------------------------------------|
//! | `0x00` | SEMAPHORE | Reads 0 when the reader acquired it, write 0 to release |
//! | `0x04` | CONTROL   | Write `GO` to start a transfer; `BUSY`, `ERROR` status |
//! | `0x08` | ADDRESS   | Byte address of the first word of the transfer         |
//! | `0x10` | DATA[0-3] | Four words filled by each completed transfer           |
use crate::{
    drivers::registers::RegisterBlock,
    error::{self, Convertible},
    hal::flash::Gateway,
    utilities::bitwise::BitFlags,
};
use core::cmp::min;

const SEMAPHORE: usize = 0x00;
const CONTROL: usize = 0x04;
const ADDRESS: usize = 0x08;
const DATA: usize = 0x10;

const GO: u32 = 1 << 0;
const BUSY_BIT: u8 = 0;
const ERROR_BIT: u8 = 1;
const SEMAPHORE_ACQUIRED: u32 = 0;
const SEMAPHORE_RELEASE: u32 = 0;

/// Words delivered by a single gateway transfer.
pub const WORDS_PER_TRANSFER: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    AccessFault,
}

impl Convertible for Error {
    fn into(self) -> error::Error {
        match self {
            Error::AccessFault => error::Error::GatewayFault,
        }
    }
}

/// Progress of a multi transfer read, kept across `WouldBlock` answers.
#[derive(Copy, Clone, Debug)]
struct Transfer {
    address: u32,
    words: usize,
    done: usize,
    in_flight: bool,
}

pub struct IndirectGateway<R: RegisterBlock> {
    registers: R,
    transfer: Option<Transfer>,
}

impl<R: RegisterBlock> IndirectGateway<R> {
    pub fn new(registers: R) -> Self { Self { registers, transfer: None } }

    pub fn release(self) -> R { self.registers }

    fn start(&mut self, address: u32) {
        self.registers.write(ADDRESS, address);
        self.registers.write(CONTROL, GO);
    }
}

impl<R: RegisterBlock> Gateway for IndirectGateway<R> {
    type Error = Error;

    fn try_lock(&mut self) -> nb::Result<(), Self::Error> {
        match self.registers.read(SEMAPHORE) {
            SEMAPHORE_ACQUIRED => Ok(()),
            _ => Err(nb::Error::WouldBlock),
        }
    }

    fn unlock(&mut self) {
        self.transfer = None;
        self.registers.write(SEMAPHORE, SEMAPHORE_RELEASE);
    }

    fn read(&mut self, address: u32, words: &mut [u32]) -> nb::Result<(), Self::Error> {
        let mut transfer = match self.transfer {
            Some(t) if t.address == address && t.words == words.len() => t,
            _ => Transfer { address, words: words.len(), done: 0, in_flight: false },
        };

        while transfer.done < words.len() {
            if !transfer.in_flight {
                self.start(address + (transfer.done * 4) as u32);
                transfer.in_flight = true;
            }

            let status = self.registers.read(CONTROL);
            if status.is_set(ERROR_BIT) {
                self.transfer = None;
                return Err(nb::Error::Other(Error::AccessFault));
            }
            if status.is_set(BUSY_BIT) {
                self.transfer = Some(transfer);
                return Err(nb::Error::WouldBlock);
            }

            let count = min(WORDS_PER_TRANSFER, words.len() - transfer.done);
            for (index, word) in words[transfer.done..transfer.done + count].iter_mut().enumerate()
            {
                *word = self.registers.read(DATA + index * 4);
            }
            transfer.done += count;
            transfer.in_flight = false;
        }

        self.transfer = None;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Behavioural model of the gateway registers over a little flash array.
    struct SimulatedRegisters {
        flash: Vec<u8>,
        semaphore_taken: bool,
        address: u32,
        data: [u32; WORDS_PER_TRANSFER],
        busy_reads_per_transfer: u32,
        busy_remaining: u32,
        fault_address: Option<u32>,
        error: bool,
        transfers: Vec<u32>,
    }

    impl SimulatedRegisters {
        fn new(flash: Vec<u8>) -> Self {
            Self {
                flash,
                semaphore_taken: false,
                address: 0,
                data: [0; WORDS_PER_TRANSFER],
                busy_reads_per_transfer: 0,
                busy_remaining: 0,
                fault_address: None,
                error: false,
                transfers: Vec::new(),
            }
        }

        fn word_at(&self, address: u32) -> u32 {
            let mut bytes = [0xFFu8; 4];
            for (i, byte) in bytes.iter_mut().enumerate() {
                if let Some(b) = self.flash.get(address as usize + i) {
                    *byte = *b;
                }
            }
            u32::from_le_bytes(bytes)
        }
    }

    impl RegisterBlock for SimulatedRegisters {
        fn read(&mut self, offset: usize) -> u32 {
            match offset {
                SEMAPHORE => {
                    let previous = self.semaphore_taken as u32;
                    self.semaphore_taken = true;
                    previous
                }
                CONTROL => {
                    if self.busy_remaining > 0 {
                        self.busy_remaining -= 1;
                        1 << BUSY_BIT
                    } else if self.error {
                        1 << ERROR_BIT
                    } else {
                        0
                    }
                }
                o if (DATA..DATA + 16).contains(&o) => self.data[(o - DATA) / 4],
                _ => 0,
            }
        }

        fn write(&mut self, offset: usize, value: u32) {
            match offset {
                SEMAPHORE => self.semaphore_taken = value != SEMAPHORE_RELEASE,
                ADDRESS => self.address = value,
                CONTROL if value & GO != 0 => {
                    self.transfers.push(self.address);
                    self.busy_remaining = self.busy_reads_per_transfer;
                    self.error = self
                        .fault_address
                        .map_or(false, |f| f >= self.address && f < self.address + 16);
                    for i in 0..WORDS_PER_TRANSFER {
                        self.data[i] = self.word_at(self.address + (i * 4) as u32);
                    }
                }
                _ => {}
            }
        }
    }

    fn flash_contents() -> Vec<u8> { (0..64u8).collect() }

    #[test]
    fn semaphore_is_taken_by_reading_and_released_by_writing() {
        // Given
        let mut gateway = IndirectGateway::new(SimulatedRegisters::new(flash_contents()));

        // Then
        assert_eq!(gateway.try_lock(), Ok(()));
        assert_eq!(gateway.try_lock(), Err(nb::Error::WouldBlock));
        gateway.unlock();
        assert_eq!(gateway.try_lock(), Ok(()));
    }

    #[test]
    fn reads_span_several_transfers() {
        // Given
        let mut gateway = IndirectGateway::new(SimulatedRegisters::new(flash_contents()));
        let mut words = [0u32; 6];

        // When
        gateway.try_lock().unwrap();
        gateway.read(0x10, &mut words).unwrap();

        // Then
        assert_eq!(words[0], u32::from_le_bytes([0x10, 0x11, 0x12, 0x13]));
        assert_eq!(words[5], u32::from_le_bytes([0x24, 0x25, 0x26, 0x27]));
        assert_eq!(gateway.release().transfers, vec![0x10, 0x20]);
    }

    #[test]
    fn busy_hardware_yields_and_resumes_without_restarting() {
        // Given
        let mut registers = SimulatedRegisters::new(flash_contents());
        registers.busy_reads_per_transfer = 2;
        let mut gateway = IndirectGateway::new(registers);
        let mut words = [0u32; 8];
        gateway.try_lock().unwrap();

        // When
        let result = nb::block!(gateway.read(0x00, &mut words));

        // Then
        assert_eq!(result, Ok(()));
        assert_eq!(words[7], u32::from_le_bytes([0x1C, 0x1D, 0x1E, 0x1F]));
        assert_eq!(gateway.release().transfers, vec![0x00, 0x10]);
    }

    #[test]
    fn error_status_is_a_hard_fault() {
        // Given
        let mut registers = SimulatedRegisters::new(flash_contents());
        registers.fault_address = Some(0x24);
        let mut gateway = IndirectGateway::new(registers);
        let mut words = [0u32; 8];
        gateway.try_lock().unwrap();

        // Then
        assert_eq!(
            gateway.read(0x20, &mut words),
            Err(nb::Error::Other(Error::AccessFault))
        );
        assert!(gateway.read(0x00, &mut words[..4]).is_ok());
    }
}
