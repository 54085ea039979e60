//! Complex modules with business logic related to the problem
//! domain, that lay on top of abstract drivers. Devices are
//! generic, while board specifics (memory map, scratchpad geometry)
//! are handled in the `ports` module.

pub mod engine;
pub mod image;
pub mod mask;
pub mod reader;
pub mod scratchpad;
pub mod session;

/// General purpose traits that summarize requirements on devices.
pub mod traits {
    use crate::{error, hal::flash};
    use marker_blanket::marker_blanket;

    /// A supported flash gateway must be able to lock, read, and report
    /// errors to the authentication pipeline.
    #[marker_blanket]
    pub trait Flash: flash::Gateway<Error: error::Convertible> {}
}
