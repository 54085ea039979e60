//! Cortex-M cache maintenance and inter-core events.
use crate::hal::{cache::Coherence, doorbell::Doorbell};
use ::cortex_m::{asm, peripheral::SCB};

/// Data cache maintenance through the System Control Block. Each core
/// owns its own `SCB` instance.
pub struct DataCache {
    scb: SCB,
}

impl DataCache {
    pub fn new(scb: SCB) -> Self { Self { scb } }
}

impl Coherence for DataCache {
    fn clean(&mut self, address: usize, length: usize) {
        self.scb.clean_dcache_by_address(address, length)
    }

    fn invalidate(&mut self, address: usize, length: usize) {
        // NOTE(Safety): Invalidation discards dirty lines. Callers only
        // invalidate memory whose owner, by protocol, is the other core.
        unsafe { self.scb.invalidate_dcache_by_address(address, length) }
    }

    fn clean_invalidate(&mut self, address: usize, length: usize) {
        self.scb.clean_invalidate_dcache_by_address(address, length)
    }
}

/// `SEV`/`WFE` based doorbell.
pub struct EventDoorbell;

impl Doorbell for EventDoorbell {
    fn signal(&mut self) {
        asm::dsb();
        asm::sev();
    }

    fn wait(&mut self) { asm::wfe() }
}
