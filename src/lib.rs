//! # Firmware Image Authentication Pipeline
//!
//! This crate locates a firmware image stored raw on a directly addressed
//! flash device, parses its image table of contents (iTOC) and streams the
//! image, chunk by chunk, through a small on-chip scratchpad so an external
//! verifier can hash it. Bytes excluded from the signed content are masked
//! before they are handed out.
//!
//! Two scratchpad flavours exist: a synchronous one that fills on demand,
//! and an engine-offloaded one where a secondary core copies flash into the
//! scratchpad concurrently with the consumer.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

extern crate static_assertions;

#[macro_use]
pub mod utilities {
    #[macro_use]
    mod macros;
    pub mod bitwise;
    pub mod buffer;
    pub mod guard;
    #[macro_use]
    pub mod memory;
}

pub mod hal;
pub mod devices;
pub mod drivers;
pub mod ports;
pub mod error;
pub mod config;
