//! Hardware Abstraction Layer, containing interfaces
//! for low level drivers.

pub mod flash;
pub mod cache;
pub mod doorbell;
pub mod hint;

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles;
