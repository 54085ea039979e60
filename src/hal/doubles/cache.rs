use crate::hal::cache::Coherence;
use std::vec::Vec;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheOp {
    Clean(usize, usize),
    Invalidate(usize, usize),
    CleanInvalidate(usize, usize),
}

/// Coherent host memory needs no maintenance; operations are only recorded.
#[derive(Default)]
pub struct RecordingCache {
    pub operations: Vec<CacheOp>,
}

impl RecordingCache {
    /// Whether some operation of the given flavour covered `[address, address + length)`.
    pub fn covered(&self, op: fn(usize, usize) -> CacheOp, address: usize, length: usize) -> bool {
        self.operations.iter().any(|recorded| {
            let (start, size) = match *recorded {
                CacheOp::Clean(a, l) | CacheOp::Invalidate(a, l) | CacheOp::CleanInvalidate(a, l) => {
                    (a, l)
                }
            };
            core::mem::discriminant(recorded) == core::mem::discriminant(&op(0, 0))
                && start <= address
                && start + size >= address + length
        })
    }
}

impl Coherence for RecordingCache {
    fn clean(&mut self, address: usize, length: usize) {
        self.operations.push(CacheOp::Clean(address, length))
    }
    fn invalidate(&mut self, address: usize, length: usize) {
        self.operations.push(CacheOp::Invalidate(address, length))
    }
    fn clean_invalidate(&mut self, address: usize, length: usize) {
        self.operations.push(CacheOp::CleanInvalidate(address, length))
    }
}
