//! RAII guard that holds exclusive access to an item and calls a given
//! function when it drops out of scope.
//!
//! Useful for ensuring a hardware resource is released no matter the
//! return path, e.g. the flash gateway semaphore.
//!
//! Example
//! ```
//! # use imgauth::utilities::guard::Guard;
//! let mut released = false;
//! {
//!     let guard = Guard::new(&mut released, |r| *r = true);
//!     assert!(!*guard);
//! }
//! assert!(released);
//! ```

use core::ops::{Deref, DerefMut};

pub struct Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    item: &'a mut T,
    on_exit: Option<G>,
}

impl<'a, T, G> Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    /// Wraps an already acquired item. `on_exit` runs exactly once, on drop.
    pub fn new(item: &'a mut T, on_exit: G) -> Self { Self { item, on_exit: Some(on_exit) } }
}

impl<'a, T, G> Deref for Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    type Target = T;
    fn deref(&self) -> &T { self.item }
}

impl<'a, T, G> DerefMut for Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    fn deref_mut(&mut self) -> &mut T { self.item }
}

impl<'a, T, G> Drop for Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(self.item);
        }
    }
}
