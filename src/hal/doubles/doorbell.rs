use crate::hal::doorbell::Doorbell;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Doorbell for cores simulated as host threads. Waiting yields the thread.
#[derive(Clone, Default)]
pub struct ThreadDoorbell {
    rings: Arc<AtomicUsize>,
}

impl ThreadDoorbell {
    pub fn rings(&self) -> usize { self.rings.load(Ordering::SeqCst) }
}

impl Doorbell for ThreadDoorbell {
    fn signal(&mut self) { self.rings.fetch_add(1, Ordering::SeqCst); }
    fn wait(&mut self) { std::thread::yield_now() }
}
