use super::error::FakeError;
use crate::hal::flash::Gateway;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    vec::Vec,
};

/// Value read back from flash locations that were never programmed.
pub const ERASED: u8 = 0xFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadRecord {
    pub address: u32,
    pub words: usize,
}

/// Gateway over an in-memory flash image starting at `base`.
///
/// Handles obtained through [`FakeGateway::share`] see the same flash
/// contents and contend for the same lock, like two cores sharing the
/// hardware gateway. Each handle records its own reads.
pub struct FakeGateway {
    base: u32,
    flash: Arc<Vec<u8>>,
    lock: Arc<AtomicBool>,
    holding: bool,
    pub reads: Vec<ReadRecord>,
    pub locks: usize,
    pub unlocks: usize,
    /// Number of `WouldBlock` answers given before each read completes.
    pub busy_polls: u32,
    /// Reads touching this address fail with a hard fault.
    pub fault_at: Option<u32>,
    busy_remaining: Option<u32>,
}

impl FakeGateway {
    pub fn new(base: u32, flash: Vec<u8>) -> Self {
        Self {
            base,
            flash: Arc::new(flash),
            lock: Arc::new(AtomicBool::new(false)),
            holding: false,
            reads: Vec::new(),
            locks: 0,
            unlocks: 0,
            busy_polls: 0,
            fault_at: None,
            busy_remaining: None,
        }
    }

    /// A second handle onto the same flash and lock, with fresh records.
    pub fn share(&self) -> Self {
        Self {
            base: self.base,
            flash: self.flash.clone(),
            lock: self.lock.clone(),
            holding: false,
            reads: Vec::new(),
            locks: 0,
            unlocks: 0,
            busy_polls: self.busy_polls,
            fault_at: self.fault_at,
            busy_remaining: None,
        }
    }

    /// Takes the shared lock on behalf of some other agent, forever.
    pub fn jam_lock(&self) { self.lock.store(true, Ordering::SeqCst) }

    pub fn is_locked(&self) -> bool { self.lock.load(Ordering::SeqCst) }

    pub fn clear(&mut self) {
        self.reads.clear();
        self.locks = 0;
        self.unlocks = 0;
    }

    fn byte_at(&self, address: u32) -> u8 {
        address
            .checked_sub(self.base)
            .and_then(|offset| self.flash.get(offset as usize))
            .copied()
            .unwrap_or(ERASED)
    }
}

impl Gateway for FakeGateway {
    type Error = FakeError;

    fn try_lock(&mut self) -> nb::Result<(), Self::Error> {
        match self.lock.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed) {
            Ok(_) => {
                self.holding = true;
                self.locks += 1;
                Ok(())
            }
            Err(_) => Err(nb::Error::WouldBlock),
        }
    }

    fn unlock(&mut self) {
        assert!(self.holding, "Gateway unlocked without holding the lock");
        self.holding = false;
        self.unlocks += 1;
        self.lock.store(false, Ordering::Release);
    }

    fn read(&mut self, address: u32, words: &mut [u32]) -> nb::Result<(), Self::Error> {
        assert!(self.holding, "Gateway read without holding the lock");
        let remaining = self.busy_remaining.get_or_insert(self.busy_polls);
        if *remaining > 0 {
            *remaining -= 1;
            return Err(nb::Error::WouldBlock);
        }
        self.busy_remaining = None;

        let length = (words.len() * 4) as u32;
        if let Some(fault) = self.fault_at {
            if fault >= address && fault < address + length {
                return Err(nb::Error::Other(FakeError));
            }
        }

        self.reads.push(ReadRecord { address, words: words.len() });
        for (index, word) in words.iter_mut().enumerate() {
            let at = address + (index * 4) as u32;
            let bytes = [self.byte_at(at), self.byte_at(at + 1), self.byte_at(at + 2), self.byte_at(at + 3)];
            *word = u32::from_le_bytes(bytes);
        }
        Ok(())
    }
}
