//! Logging macros for the crate.
//!
//! On the target, log frames go through `defmt` and the final binary picks
//! the transport. Host builds forward to the `log` facade instead, since
//! there is no defmt global logger to link against there.
//!
//! Arguments must be both `defmt::Format` and `Debug`, and should be
//! interpolated with `{:?}`.
#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "arm")]
        ::defmt::trace!($($arg)*);
        #[cfg(not(target_arch = "arm"))]
        ::log::trace!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "arm")]
        ::defmt::debug!($($arg)*);
        #[cfg(not(target_arch = "arm"))]
        ::log::debug!($($arg)*);
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "arm")]
        ::defmt::info!($($arg)*);
        #[cfg(not(target_arch = "arm"))]
        ::log::info!($($arg)*);
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "arm")]
        ::defmt::warn!($($arg)*);
        #[cfg(not(target_arch = "arm"))]
        ::log::warn!($($arg)*);
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "arm")]
        ::defmt::error!($($arg)*);
        #[cfg(not(target_arch = "arm"))]
        ::log::error!($($arg)*);
    }};
}
