pub trait CollectSlice: Iterator {
    /// Collects an iterator into a given slice, returning the number of collected items.
    fn collect_slice(&mut self, slice: &mut [Self::Item]) -> usize;
}

impl<I: Iterator> CollectSlice for I {
    fn collect_slice(&mut self, slice: &mut [Self::Item]) -> usize {
        slice.iter_mut().zip(self).fold(0, |count, (dest, item)| {
            *dest = item;
            count + 1
        })
    }
}
