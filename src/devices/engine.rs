//! Copy engine offloaded to a secondary core.
//!
//! The primary core and the engine share a [`SharedRing`]: a mailbox through
//! which jobs are posted and acknowledged, and a ring of scratchpad segments
//! each guarded by a flag. The engine is the only producer and the offloaded
//! scratchpad the only consumer, so a flag is only ever advanced by the side
//! that currently owns it:
//!
//! ```text
//!   Empty --(engine)--> Filling --(engine)--> Full --(consumer)--> Draining
//!     ^                                                                |
//!     +----------------------------(consumer)--------------------------+
//! ```
//!
//! Flags are plain loads and stores with acquire/release ordering. The two
//! cores' data caches are not coherent, so every hand-off also cleans the
//! writer's lines and invalidates the reader's, and every flag and mailbox
//! half sits in its own cache line.
use core::{
    cell::UnsafeCell,
    mem::size_of,
    sync::atomic::{AtomicU32, AtomicUsize, Ordering},
};
use static_assertions::const_assert_eq;

use crate::{
    devices::{mask::MaskSet, reader::Reader, scratchpad::chunk_bounds, traits::Flash},
    error::Error,
    hal::{
        cache::{Coherence, CoherenceExt},
        doorbell::Doorbell,
    },
    utilities::memory::{Span, BULK_ALIGNMENT},
};

pub const CACHE_LINE: usize = 32;

/// Core mask value asking the engine to stop, or reporting it has.
pub const CORE_STOP: u32 = 0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
#[repr(u32)]
pub enum SegmentState {
    Empty = 0,
    Filling = 1,
    Full = 2,
    Draining = 3,
}

#[repr(C, align(32))]
pub struct SegmentFlag(AtomicU32);
const_assert_eq!(size_of::<SegmentFlag>(), CACHE_LINE);

impl SegmentFlag {
    pub const fn new() -> Self { Self(AtomicU32::new(SegmentState::Empty as u32)) }

    pub fn state(&self) -> SegmentState {
        match self.0.load(Ordering::Acquire) {
            1 => SegmentState::Filling,
            2 => SegmentState::Full,
            3 => SegmentState::Draining,
            _ => SegmentState::Empty,
        }
    }

    pub(crate) fn set(&self, state: SegmentState) { self.0.store(state as u32, Ordering::Release) }
}

#[repr(C, align(32))]
pub struct Segment<const SIZE: usize>(UnsafeCell<[u8; SIZE]>);

/// A copy job, as posted to the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub image: Span,
    pub masks: MaskSet,
}

/// Mailbox half written by the primary core.
///
/// `core_mask` is the one field the engine writes too, and only ever to
/// store [`CORE_STOP`] once a job completes.
#[repr(C, align(32))]
pub struct Request {
    entry: AtomicUsize,
    core_mask: AtomicU32,
    generation: AtomicU32,
    start: AtomicU32,
    length: AtomicU32,
    masks: [AtomicU32; 4],
}

/// Mailbox half written by the engine.
#[repr(C, align(32))]
pub struct Response {
    acknowledged: AtomicU32,
    fault: AtomicU32,
}

#[repr(C)]
pub struct Mailbox {
    request: Request,
    response: Response,
}

/// Fault codes reported through the mailbox. Zero means no fault.
pub mod fault {
    use crate::error::Error;

    pub const NONE: u32 = 0;
    pub const GATEWAY: u32 = 1;
    pub const TIMEOUT: u32 = 2;
    pub const OTHER: u32 = 0xFF;

    pub fn code(error: Error) -> u32 {
        match error {
            Error::GatewayFault => GATEWAY,
            Error::GatewayTimeout => TIMEOUT,
            _ => OTHER,
        }
    }
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            request: Request {
                entry: AtomicUsize::new(0),
                core_mask: AtomicU32::new(CORE_STOP),
                generation: AtomicU32::new(0),
                start: AtomicU32::new(0),
                length: AtomicU32::new(0),
                masks: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
            },
            response: Response { acknowledged: AtomicU32::new(0), fault: AtomicU32::new(fault::NONE) },
        }
    }

    /// Address the secondary core jumps to when woken.
    pub fn entry(&self) -> usize { self.request.entry.load(Ordering::Acquire) }
    pub fn core_mask(&self) -> u32 { self.request.core_mask.load(Ordering::Acquire) }
    pub fn generation(&self) -> u32 { self.request.generation.load(Ordering::Acquire) }
    pub fn acknowledged(&self) -> u32 { self.response.acknowledged.load(Ordering::Acquire) }

    /// Whether the engine has acknowledged the latest job.
    pub fn is_idle(&self) -> bool { self.generation() == self.acknowledged() }

    pub fn fault(&self) -> Option<u32> {
        match self.response.fault.load(Ordering::Acquire) {
            fault::NONE => None,
            code => Some(code),
        }
    }

    fn post(&self, entry: usize, core_mask: u32, job: &Job) -> u32 {
        let [magic, record] = job.masks.regions();
        let generation = self.generation().wrapping_add(1);
        self.request.entry.store(entry, Ordering::Relaxed);
        self.request.core_mask.store(core_mask, Ordering::Relaxed);
        self.request.start.store(job.image.start, Ordering::Relaxed);
        self.request.length.store(job.image.len, Ordering::Relaxed);
        let masks = [magic.start, magic.len, record.start, record.len];
        for (field, value) in self.request.masks.iter().zip(masks) {
            field.store(value, Ordering::Relaxed);
        }
        self.response.fault.store(fault::NONE, Ordering::Relaxed);
        self.request.generation.store(generation, Ordering::Release);
        generation
    }

    fn job(&self) -> Job {
        let [a, b, c, d] = &self.request.masks;
        let load = |field: &AtomicU32| field.load(Ordering::Acquire);
        Job {
            image: Span::new(load(&self.request.start), load(&self.request.length)),
            masks: MaskSet::new(Span::new(load(a), load(b)), Span::new(load(c), load(d))),
        }
    }
}

/// Memory shared between the primary core and the copy engine.
///
/// Lives in a `static` on target, placed in the on-chip scratchpad by the
/// linker script.
#[repr(C)]
pub struct SharedRing<const SEGMENTS: usize, const SIZE: usize> {
    mailbox: Mailbox,
    flags: [SegmentFlag; SEGMENTS],
    segments: [Segment<SIZE>; SEGMENTS],
}

// SAFETY: Segment contents are only accessed by the side owning the
// segment's flag, and ownership is handed over through release/acquire
// stores on that flag.
unsafe impl<const SEGMENTS: usize, const SIZE: usize> Sync for SharedRing<SEGMENTS, SIZE> {}

impl<const SEGMENTS: usize, const SIZE: usize> SharedRing<SEGMENTS, SIZE> {
    const GEOMETRY: () = assert!(
        SEGMENTS > 0
            && SIZE > 0
            && SIZE % CACHE_LINE == 0
            && SIZE % BULK_ALIGNMENT as usize == 0,
        "Ring segments must be non-empty multiples of the cache line"
    );

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::GEOMETRY;
        Self {
            mailbox: Mailbox::new(),
            flags: [const { SegmentFlag::new() }; SEGMENTS],
            segments: [const { Segment(UnsafeCell::new([0u8; SIZE])) }; SEGMENTS],
        }
    }

    pub fn mailbox(&self) -> &Mailbox { &self.mailbox }
    pub fn flag(&self, segment: usize) -> &SegmentFlag { &self.flags[segment] }

    /// Address and size of a segment's data, for cache maintenance.
    pub fn segment_range(&self, segment: usize) -> (usize, usize) {
        (self.segments[segment].0.get() as usize, SIZE)
    }

    /// # Safety
    ///
    /// The caller must own the segment, i.e. be the consumer and have moved
    /// its flag to `Draining`.
    pub(crate) unsafe fn segment(&self, segment: usize) -> &[u8; SIZE] {
        &*self.segments[segment].0.get()
    }

    /// # Safety
    ///
    /// The caller must own the segment, i.e. be the engine and have moved
    /// its flag to `Filling`.
    #[allow(clippy::mut_from_ref)]
    unsafe fn segment_mut(&self, segment: usize) -> &mut [u8; SIZE] {
        &mut *self.segments[segment].0.get()
    }

    /// Resets every segment and posts a job to the engine, returning the
    /// job's generation. The engine must be idle.
    pub fn post<C: Coherence, D: Doorbell>(
        &self,
        entry: usize,
        core_mask: u32,
        job: &Job,
        cache: &mut C,
        doorbell: &mut D,
    ) -> u32 {
        self.flags.iter().for_each(|flag| flag.set(SegmentState::Empty));
        cache.clean_object(&self.flags);
        let generation = self.mailbox.post(entry, core_mask, job);
        cache.clean_object(&self.mailbox.request);
        doorbell.signal();
        info!("Posted copy job {:?} to cores {:?}", generation, core_mask);
        generation
    }

    /// Asks the engine to abandon its job, and waits up to `budget` polls
    /// for it to acknowledge.
    pub fn stop<C: Coherence, D: Doorbell>(
        &self,
        cache: &mut C,
        doorbell: &mut D,
        budget: u32,
    ) -> Result<(), Error> {
        cache.invalidate_object(&self.mailbox.response);
        if self.mailbox.is_idle() {
            return Ok(());
        }
        self.mailbox.request.core_mask.store(CORE_STOP, Ordering::Release);
        cache.clean_object(&self.mailbox.request);
        doorbell.signal();
        for _ in 0..budget {
            cache.invalidate_object(&self.mailbox.response);
            if self.mailbox.is_idle() {
                return Ok(());
            }
            doorbell.wait();
        }
        warn!("Copy engine did not acknowledge stop request");
        Err(Error::EngineStalled)
    }
}

impl<const SEGMENTS: usize, const SIZE: usize> Default for SharedRing<SEGMENTS, SIZE> {
    fn default() -> Self { Self::new() }
}

/// How the engine finished a job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Outcome {
    Completed,
    /// The job was not addressed to this core, or was stopped early.
    Cancelled,
    Faulted(Error),
}

/// Producer side of the ring, run by the secondary core.
pub struct CopyEngine<'a, G, C, D, const SEGMENTS: usize, const SIZE: usize>
where
    G: Flash,
    C: Coherence,
    D: Doorbell,
{
    ring: &'a SharedRing<SEGMENTS, SIZE>,
    reader: Reader<G>,
    cache: C,
    doorbell: D,
    core: u32,
}

impl<'a, G, C, D, const SEGMENTS: usize, const SIZE: usize> CopyEngine<'a, G, C, D, SEGMENTS, SIZE>
where
    G: Flash,
    C: Coherence,
    D: Doorbell,
{
    /// `core` is this core's bit in the mailbox core mask.
    pub fn new(
        ring: &'a SharedRing<SEGMENTS, SIZE>,
        reader: Reader<G>,
        cache: C,
        doorbell: D,
        core: u32,
    ) -> Self {
        Self { ring, reader, cache, doorbell, core }
    }

    pub fn release(self) -> (Reader<G>, C, D) { (self.reader, self.cache, self.doorbell) }

    /// Serves jobs forever.
    pub fn run(mut self) -> ! {
        loop {
            let outcome = self.serve();
            debug!("Copy job finished: {:?}", outcome);
        }
    }

    /// Sleeps until a job is posted, runs it and acknowledges it.
    pub fn serve(&mut self) -> Outcome {
        let ring = self.ring;
        let generation = self.await_job();
        let job = ring.mailbox.job();

        let outcome = if self.selected() {
            self.copy(&job).unwrap_or_else(Outcome::Faulted)
        } else {
            Outcome::Cancelled
        };

        let mailbox = &ring.mailbox;
        match outcome {
            Outcome::Completed => {
                mailbox.request.core_mask.store(CORE_STOP, Ordering::Release);
                self.cache.clean_object(&mailbox.request);
            }
            Outcome::Faulted(error) => {
                error!("Copy engine fault: {:?}", error);
                mailbox.response.fault.store(fault::code(error), Ordering::Release);
            }
            Outcome::Cancelled => (),
        }
        mailbox.response.acknowledged.store(generation, Ordering::Release);
        self.cache.clean_object(&mailbox.response);
        self.doorbell.signal();
        outcome
    }

    fn await_job(&mut self) -> u32 {
        let mailbox = &self.ring.mailbox;
        loop {
            self.cache.invalidate_object(&mailbox.request);
            let generation = mailbox.generation();
            if generation != mailbox.acknowledged() {
                return generation;
            }
            self.doorbell.wait();
        }
    }

    fn selected(&mut self) -> bool {
        self.cache.invalidate_object(&self.ring.mailbox.request);
        self.ring.mailbox.core_mask() & self.core != 0
    }

    /// Waits for a segment to be released. `false` if asked to stop instead.
    fn claim(&mut self, segment: usize) -> bool {
        loop {
            if !self.selected() {
                return false;
            }
            self.cache.invalidate_object(self.ring.flag(segment));
            if self.ring.flag(segment).state() == SegmentState::Empty {
                return true;
            }
            self.doorbell.wait();
        }
    }

    fn copy(&mut self, job: &Job) -> Result<Outcome, Error> {
        let ring = self.ring;
        let mut index = 0;
        while let Some((offset, length)) = chunk_bounds(job.image.len, SIZE, index) {
            let segment = index % SEGMENTS;
            if !self.claim(segment) {
                return Ok(Outcome::Cancelled);
            }
            let flag = ring.flag(segment);
            flag.set(SegmentState::Filling);
            let (base, size) = ring.segment_range(segment);
            self.cache.clean_invalidate(base, size);

            let address = job.image.start + offset;
            // SAFETY: The segment is ours while its flag reads `Filling`.
            let bytes = unsafe { &mut ring.segment_mut(segment)[..length] };
            self.reader.read_bytes(address, bytes)?;
            job.masks.apply(address, bytes);

            self.cache.clean(base, size);
            flag.set(SegmentState::Full);
            self.cache.clean_object(flag);
            self.doorbell.signal();
            index += 1;
        }
        Ok(Outcome::Completed)
    }
}
