//! Data cache maintenance.
//!
//! The engine-offloaded scratchpad is shared by two cores whose data caches
//! are not kept coherent by hardware. Every hand-off between them is
//! bracketed by explicit maintenance over the memory involved.

/// Data cache maintenance by address range.
pub trait Coherence {
    /// Writes back dirty lines covering the range so other observers see them.
    fn clean(&mut self, address: usize, length: usize);

    /// Discards lines covering the range so later loads observe memory.
    fn invalidate(&mut self, address: usize, length: usize);

    /// Writes back, then discards, lines covering the range.
    fn clean_invalidate(&mut self, address: usize, length: usize);
}

/// Convenience wrappers taking typed references.
pub trait CoherenceExt: Coherence {
    fn clean_object<T: ?Sized>(&mut self, object: &T) {
        self.clean(object as *const T as *const u8 as usize, core::mem::size_of_val(object))
    }

    fn invalidate_object<T: ?Sized>(&mut self, object: &T) {
        self.invalidate(object as *const T as *const u8 as usize, core::mem::size_of_val(object))
    }
}
impl<C: Coherence> CoherenceExt for C {}
