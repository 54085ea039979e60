//! Error types for the image authentication pipeline as a whole.

use ufmt::{uWrite, uwriteln};

/// Top level error type. Driver specific errors are folded into it
/// through [`Convertible`], so `?` works across layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Error {
    /// Error caused by a low level peripheral driver
    DriverError(&'static str),
    /// Error caused by a faulty configuration
    ConfigurationError(&'static str),
    /// A bulk transfer was requested at an address without the required alignment.
    MisalignedAccess,
    /// The signature section does not fit the scratchpad's signature slot.
    SignatureTooBig,
    /// The iTOC holds more entries than the iTOC array can store.
    ItocOverflow,
    /// No candidate address carries the image magic pattern.
    NoValidImage,
    /// The image has no iTOC header within the probe window.
    NoValidItoc,
    /// The iTOC has no signature entry, or its section is empty.
    NoSignature,
    /// More than one iTOC entry is tagged as the signature section.
    DuplicateSignature,
    /// The iTOC describes no authenticated content.
    ImageEmpty,
    /// The image extends past the maximum image size of the flash region.
    ImageTooBig,
    /// The flash gateway reported an access failure.
    GatewayFault,
    /// The flash gateway did not complete within the poll budget.
    GatewayTimeout,
    /// The copy engine reported a fault while filling a segment.
    EngineFault,
    /// The copy engine did not fill or release a segment within the poll budget.
    EngineStalled,
    /// All image data has been served for this session.
    NoMoreData,
    /// The scratchpad has not been armed for a session.
    NotArmed,
    /// The signature blob was already served in this session.
    HashParamConsumed,
    /// Data chunks were requested out of order from the copy engine.
    OutOfSequence,
}

/// Broad error categories. Configuration errors are fatal, content errors
/// mean the image must not be booted, hardware errors come from the flash
/// gateway or the copy engine, and request errors are caller misuse or
/// exhaustion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Kind {
    Configuration,
    Content,
    Hardware,
    Request,
}

pub trait Convertible {
    fn into(self) -> Error;
}
impl<T: Convertible> From<T> for Error {
    fn from(t: T) -> Self { t.into() }
}

impl Error {
    pub fn kind(&self) -> Kind {
        match self {
            Error::ConfigurationError(_)
            | Error::MisalignedAccess
            | Error::SignatureTooBig
            | Error::ItocOverflow => Kind::Configuration,
            Error::NoValidImage
            | Error::NoValidItoc
            | Error::NoSignature
            | Error::DuplicateSignature
            | Error::ImageEmpty
            | Error::ImageTooBig => Kind::Content,
            Error::DriverError(_)
            | Error::GatewayFault
            | Error::GatewayTimeout
            | Error::EngineFault
            | Error::EngineStalled => Kind::Hardware,
            Error::NoMoreData | Error::NotArmed | Error::HashParamConsumed | Error::OutOfSequence => {
                Kind::Request
            }
        }
    }

    /// Whether the session must be abandoned without retrying.
    pub fn is_fatal(&self) -> bool { self.kind() == Kind::Configuration }

    /// Reports error via an abstract console
    pub fn report<W: uWrite>(&self, console: &mut W) -> Result<(), W::Error> {
        match self {
            Error::DriverError(text) => uwriteln!(console, "[Driver Error] -> {}", *text),
            Error::ConfigurationError(text) => {
                uwriteln!(console, "[Configuration Error] -> {}", *text)
            }
            Error::MisalignedAccess => {
                uwriteln!(console, "[Configuration Error] -> Misaligned bulk flash access")
            }
            Error::SignatureTooBig => {
                uwriteln!(console, "[Configuration Error] -> Signature exceeds its scratchpad slot")
            }
            Error::ItocOverflow => {
                uwriteln!(console, "[Configuration Error] -> iTOC exceeds entry capacity")
            }
            Error::NoValidImage => uwriteln!(console, "[Content Error] -> No valid image found"),
            Error::NoValidItoc => uwriteln!(console, "[Content Error] -> No valid iTOC found"),
            Error::NoSignature => {
                uwriteln!(console, "[Content Error] -> Image has no signature section")
            }
            Error::DuplicateSignature => {
                uwriteln!(console, "[Content Error] -> Image has more than one signature section")
            }
            Error::ImageEmpty => uwriteln!(console, "[Content Error] -> Image is empty"),
            Error::ImageTooBig => uwriteln!(console, "[Content Error] -> Firmware image too big"),
            Error::GatewayFault => uwriteln!(console, "[Hardware Error] -> Flash gateway fault"),
            Error::GatewayTimeout => {
                uwriteln!(console, "[Hardware Error] -> Flash gateway timed out")
            }
            Error::EngineFault => uwriteln!(console, "[Hardware Error] -> Copy engine fault"),
            Error::EngineStalled => uwriteln!(console, "[Hardware Error] -> Copy engine stalled"),
            Error::NoMoreData => uwriteln!(console, "[Request Error] -> No more image data"),
            Error::NotArmed => uwriteln!(console, "[Request Error] -> Scratchpad not armed"),
            Error::HashParamConsumed => {
                uwriteln!(console, "[Request Error] -> Signature already served")
            }
            Error::OutOfSequence => {
                uwriteln!(console, "[Request Error] -> Data requested out of sequence")
            }
        }
    }
}
