//! Raw access to memory mapped register blocks.

/// A block of 32-bit registers addressed by byte offset.
///
/// Register reads may have side effects (e.g. semaphores that are taken
/// by reading them), so both directions take `&mut self`.
pub trait RegisterBlock {
    fn read(&mut self, offset: usize) -> u32;
    fn write(&mut self, offset: usize, value: u32);
}

/// Register block living at a fixed physical address.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a register block that is valid for
    /// volatile 32-bit accesses at every offset the owning driver uses, and
    /// no other driver instance may own the same block.
    pub const unsafe fn new(base: usize) -> Self { Self { base } }
}

impl RegisterBlock for Mmio {
    fn read(&mut self, offset: usize) -> u32 {
        // NOTE(Safety): Validity of the address is a precondition of `Mmio::new`.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // NOTE(Safety): Validity of the address is a precondition of `Mmio::new`.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}
