//! Driver implementations for the hardware interfaces in `hal`. Register
//! level drivers are written against [`registers::RegisterBlock`] so they
//! can be exercised on the host.

pub mod registers;
pub mod gateway;
pub mod boot_record;

#[cfg(target_arch = "arm")]
pub mod cortex_m;

