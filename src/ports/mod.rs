//! Full project ports for specific targets. They mainly provide the
//! memory map, scratchpad geometry and a method to construct an
//! authenticator from concrete drivers.

pub mod reference;
