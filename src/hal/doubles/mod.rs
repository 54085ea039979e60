//! Host doubles for the hardware interfaces, used by tests.

pub mod cache;
pub mod doorbell;
pub mod error;
pub mod flash;
pub mod hint;
