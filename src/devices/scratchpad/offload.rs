//! Scratchpad filled ahead of time by the copy engine.
//!
//! Arming posts the whole image as a single job; the engine then streams it
//! through the ring's segments while this side hands them out. Chunks must
//! be requested in order, since the engine only ever runs ahead. A chunk
//! stays valid until the next request, at which point its segment is given
//! back to the engine.
use super::{chunk_bounds, Scratchpad};
use crate::{
    devices::{
        engine::{Job, SegmentState, SharedRing},
        image::ImageDescriptor,
        reader::Reader,
        traits::Flash,
    },
    error::Error,
    hal::{
        cache::{Coherence, CoherenceExt},
        doorbell::Doorbell,
    },
    utilities::memory::Span,
};

pub struct OffloadScratchpad<'a, C, D, const SEGMENTS: usize, const SIZE: usize>
where
    C: Coherence,
    D: Doorbell,
{
    ring: &'a SharedRing<SEGMENTS, SIZE>,
    cache: C,
    doorbell: D,
    entry: usize,
    core_mask: u32,
    poll_budget: u32,
    image: Option<Span>,
    next_index: usize,
    draining: Option<usize>,
}

impl<'a, C, D, const SEGMENTS: usize, const SIZE: usize> OffloadScratchpad<'a, C, D, SEGMENTS, SIZE>
where
    C: Coherence,
    D: Doorbell,
{
    /// `entry` is where the engine cores start executing when woken, and
    /// `core_mask` selects which of them take the jobs.
    pub fn new(
        ring: &'a SharedRing<SEGMENTS, SIZE>,
        cache: C,
        doorbell: D,
        entry: usize,
        core_mask: u32,
        poll_budget: u32,
    ) -> Self {
        Self {
            ring,
            cache,
            doorbell,
            entry,
            core_mask,
            poll_budget,
            image: None,
            next_index: 0,
            draining: None,
        }
    }

    pub fn cache(&self) -> &C { &self.cache }

    /// Hands the segment served last back to the engine.
    fn release_draining(&mut self) {
        if let Some(segment) = self.draining.take() {
            let flag = self.ring.flag(segment);
            flag.set(SegmentState::Empty);
            self.cache.clean_object(flag);
            self.doorbell.signal();
        }
    }

    fn await_full(&mut self, segment: usize) -> Result<(), Error> {
        let ring = self.ring;
        for _ in 0..self.poll_budget {
            // The engine publishes a segment before acknowledging its job,
            // so the mailbox is sampled first.
            self.cache.invalidate_object(ring.mailbox());
            let fault = ring.mailbox().fault();
            let idle = ring.mailbox().is_idle();
            self.cache.invalidate_object(ring.flag(segment));
            if ring.flag(segment).state() == SegmentState::Full {
                return Ok(());
            }
            if fault.is_some() {
                return Err(Error::EngineFault);
            }
            if idle {
                return Err(Error::EngineStalled);
            }
            self.doorbell.wait();
        }
        Err(Error::EngineStalled)
    }
}

impl<'a, C, D, const SEGMENTS: usize, const SIZE: usize> Scratchpad
    for OffloadScratchpad<'a, C, D, SEGMENTS, SIZE>
where
    C: Coherence,
    D: Doorbell,
{
    const CHUNK_SIZE: usize = SIZE;

    fn arm(&mut self, image: &ImageDescriptor) -> Result<(), Error> {
        self.disarm();
        self.ring.stop(&mut self.cache, &mut self.doorbell, self.poll_budget)?;
        let job = Job { image: image.span(), masks: image.masks() };
        self.ring.post(self.entry, self.core_mask, &job, &mut self.cache, &mut self.doorbell);
        self.image = Some(image.span());
        self.next_index = 0;
        Ok(())
    }

    fn next_chunk<G: Flash>(&mut self, _: &mut Reader<G>, index: usize) -> Result<&[u8], Error> {
        let image = self.image.ok_or(Error::NotArmed)?;
        self.release_draining();
        let (_, length) = chunk_bounds(image.len, SIZE, index).ok_or(Error::NoMoreData)?;
        if index != self.next_index {
            return Err(Error::OutOfSequence);
        }

        let segment = index % SEGMENTS;
        self.await_full(segment)?;
        let ring = self.ring;
        ring.flag(segment).set(SegmentState::Draining);
        let (base, size) = ring.segment_range(segment);
        self.cache.invalidate(base, size);
        self.draining = Some(segment);
        self.next_index += 1;

        // SAFETY: The segment is ours while its flag reads `Draining`.
        Ok(unsafe { &ring.segment(segment)[..length] })
    }

    fn disarm(&mut self) {
        if self.image.take().is_none() {
            return;
        }
        self.release_draining();
        if let Err(e) = self.ring.stop(&mut self.cache, &mut self.doorbell, self.poll_budget) {
            warn!("Failed to stop copy engine on disarm: {:?}", e);
        }
    }
}
