//! Word level access to the raw flash device through its gateway.
//!
//! Every read takes the gateway lock, transfers, and releases the lock on
//! every return path. Busy hardware is polled up to a fixed budget; running
//! out of budget is reported as [`Error::GatewayTimeout`] rather than
//! spinning forever.
use super::traits::Flash;
use crate::{
    error::Error,
    utilities::{
        buffer::CollectSlice,
        guard::Guard,
        memory::{is_aligned, WORD_SIZE},
    },
};

/// Words moved per gateway transaction when filling byte buffers.
const STAGING_WORDS: usize = 16;

pub struct Reader<G: Flash> {
    gateway: G,
    poll_budget: u32,
}

/// Polls `operation` until it stops blocking, at most `budget` times.
fn poll<T, E>(budget: u32, mut operation: impl FnMut() -> nb::Result<T, E>) -> Result<T, Error>
where
    Error: From<E>,
{
    for _ in 0..budget.max(1) {
        match operation() {
            Ok(value) => return Ok(value),
            Err(nb::Error::Other(e)) => return Err(Error::from(e)),
            Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
        }
    }
    Err(Error::GatewayTimeout)
}

impl<G: Flash> Reader<G> {
    pub fn new(gateway: G, poll_budget: u32) -> Self { Self { gateway, poll_budget } }

    pub fn gateway(&self) -> &G { &self.gateway }
    pub fn gateway_mut(&mut self) -> &mut G { &mut self.gateway }
    pub fn release(self) -> G { self.gateway }

    /// Reads `words.len()` words starting at the word aligned `address`.
    ///
    /// With `swap` set, each word is interpreted big endian, which is how
    /// on-flash structures such as magic patterns and the iTOC are stored.
    /// Without it, each word keeps flash byte order in its little endian
    /// representation, which is what raw data consumers want.
    pub fn read_words(&mut self, address: u32, words: &mut [u32], swap: bool) -> Result<(), Error> {
        if !is_aligned(address, WORD_SIZE as u32) {
            return Err(Error::MisalignedAccess);
        }
        if words.is_empty() {
            return Ok(());
        }
        let budget = self.poll_budget;
        poll(budget, || self.gateway.try_lock())?;
        let mut gateway = Guard::new(&mut self.gateway, |g| g.unlock());
        poll(budget, || gateway.read(address, words))?;
        if swap {
            words.iter_mut().for_each(|w| *w = w.swap_bytes());
        }
        Ok(())
    }

    /// Fills `bytes` with flash contents starting at `address`, in flash
    /// byte order. Both the address and the length must be word aligned.
    pub fn read_bytes(&mut self, address: u32, bytes: &mut [u8]) -> Result<(), Error> {
        if !is_aligned(address, WORD_SIZE as u32) || bytes.len() % WORD_SIZE != 0 {
            return Err(Error::MisalignedAccess);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        trace!("Reading {:?} bytes at {:?}", bytes.len(), address);
        let budget = self.poll_budget;
        poll(budget, || self.gateway.try_lock())?;
        let mut gateway = Guard::new(&mut self.gateway, |g| g.unlock());

        let mut staging = [0u32; STAGING_WORDS];
        let mut cursor = address;
        for chunk in bytes.chunks_mut(STAGING_WORDS * WORD_SIZE) {
            let words = &mut staging[..chunk.len() / WORD_SIZE];
            poll(budget, || gateway.read(cursor, words))?;
            words.iter().flat_map(|w| w.to_le_bytes()).collect_slice(chunk);
            cursor += chunk.len() as u32;
        }
        Ok(())
    }

    /// Reads a four word pattern as stored by the image tooling.
    pub fn read_magic(&mut self, address: u32) -> Result<[u32; 4], Error> {
        let mut magic = [0u32; 4];
        self.read_words(address, &mut magic, true)?;
        Ok(magic)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::flash::{FakeGateway, ReadRecord};

    fn reader_over(flash: Vec<u8>) -> Reader<FakeGateway> {
        Reader::new(FakeGateway::new(0x1000, flash), 8)
    }

    #[test]
    fn words_are_read_in_flash_order_or_swapped() {
        // Given
        let mut reader = reader_over(vec![0x12, 0x34, 0x56, 0x78, 0xAA, 0xBB, 0xCC, 0xDD]);
        let mut words = [0u32; 2];

        // When
        reader.read_words(0x1000, &mut words, false).unwrap();

        // Then
        assert_eq!(words, [0x7856_3412, 0xDDCC_BBAA]);
        assert_eq!(words[0].to_le_bytes(), [0x12, 0x34, 0x56, 0x78]);

        // When
        reader.read_words(0x1000, &mut words, true).unwrap();

        // Then
        assert_eq!(words, [0x1234_5678, 0xAABB_CCDD]);
    }

    #[test]
    fn byte_reads_are_staged_and_release_the_lock() {
        // Given
        let flash: Vec<u8> = (0..=255u8).cycle().take(200).collect();
        let mut reader = reader_over(flash.clone());
        let mut bytes = [0u8; 200];

        // When
        reader.read_bytes(0x1000, &mut bytes).unwrap();

        // Then
        assert_eq!(&bytes[..], &flash[..]);
        let gateway = reader.gateway();
        assert_eq!(gateway.locks, 1);
        assert_eq!(gateway.unlocks, 1);
        assert!(!gateway.is_locked());
        assert_eq!(gateway.reads, vec![
            ReadRecord { address: 0x1000, words: 16 },
            ReadRecord { address: 0x1040, words: 16 },
            ReadRecord { address: 0x1080, words: 16 },
            ReadRecord { address: 0x10C0, words: 2 },
        ]);
    }

    #[test]
    fn misaligned_requests_are_rejected_before_touching_hardware() {
        let mut reader = reader_over(vec![0u8; 16]);
        let mut bytes = [0u8; 8];
        assert_eq!(reader.read_bytes(0x1002, &mut bytes), Err(Error::MisalignedAccess));
        assert_eq!(reader.read_bytes(0x1000, &mut bytes[..6]), Err(Error::MisalignedAccess));
        assert_eq!(reader.read_words(0x1001, &mut [0u32; 1], true), Err(Error::MisalignedAccess));
        assert_eq!(reader.gateway().locks, 0);
    }

    #[test]
    fn busy_gateway_is_polled_within_budget() {
        // Given
        let mut reader = reader_over(vec![0xA5; 16]);
        reader.gateway_mut().busy_polls = 3;

        // Then
        assert_eq!(reader.read_magic(0x1000), Ok([0xA5A5_A5A5; 4]));

        // Given
        reader.gateway_mut().busy_polls = 8;

        // Then
        assert_eq!(reader.read_magic(0x1000), Err(Error::GatewayTimeout));
        assert!(!reader.gateway().is_locked());
    }

    #[test]
    fn contended_lock_times_out() {
        // Given
        let mut reader = reader_over(vec![0u8; 16]);
        let other_core = reader.gateway().share();
        other_core.jam_lock();

        // Then
        assert_eq!(reader.read_magic(0x1000), Err(Error::GatewayTimeout));
        assert_eq!(reader.gateway().unlocks, 0);
    }

    #[test]
    fn gateway_faults_are_reported_and_unlock() {
        // Given
        let mut reader = reader_over(vec![0u8; 64]);
        reader.gateway_mut().fault_at = Some(0x1020);
        let mut bytes = [0u8; 64];

        // Then
        assert_eq!(reader.read_bytes(0x1000, &mut bytes), Err(Error::GatewayFault));
        assert_eq!(reader.gateway().unlocks, 1);
        assert!(!reader.gateway().is_locked());
    }
}
