//! Authentication sessions.
//!
//! A session is what the external verifier drives: it checks integrity once,
//! then pulls the signature and the masked image data through the
//! scratchpad. Only one session exists at a time, since it borrows the
//! [`Authenticator`] mutably. Dropping it disarms the scratchpad and stops
//! the copy engine if one is running.
use crate::{
    config::{Configuration, FlashLayout},
    devices::{
        image::{discover, ImageDescriptor},
        reader::Reader,
        scratchpad::{Scratchpad, SignatureSlot},
        traits::Flash,
    },
    error::Error,
    hal::hint::BootHint,
};

/// Status codes reported to the verifier, one per call outcome.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Status {
    Success,
    /// No valid image, iTOC or signature entry was found.
    IntegrityCheckFailure,
    /// The signature could not be served.
    HashParamFailure,
    /// No data left, or the scratchpad is not armed.
    DataParamFailure,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Call {
    CheckIntegrity,
    GetHashParam,
    GetDataParam,
}

impl Call {
    pub fn status<T>(self, result: &Result<T, Error>) -> Status {
        match (self, result) {
            (_, Ok(_)) => Status::Success,
            (Call::CheckIntegrity, Err(_)) => Status::IntegrityCheckFailure,
            (Call::GetHashParam, Err(_)) => Status::HashParamFailure,
            (Call::GetDataParam, Err(_)) => Status::DataParamFailure,
        }
    }
}

pub struct Authenticator<G, H, S, const SIGNATURE: usize>
where
    G: Flash,
    H: BootHint,
    S: Scratchpad,
{
    reader: Reader<G>,
    hint: H,
    scratchpad: S,
    signature: SignatureSlot<SIGNATURE>,
    layout: FlashLayout,
    sound: bool,
}

pub struct Session<'a, G, H, S, const SIGNATURE: usize>
where
    G: Flash,
    H: BootHint,
    S: Scratchpad,
{
    authenticator: &'a mut Authenticator<G, H, S, SIGNATURE>,
    image: ImageDescriptor,
    signature_served: bool,
}

impl<G, H, S, const SIGNATURE: usize> Authenticator<G, H, S, SIGNATURE>
where
    G: Flash,
    H: BootHint,
    S: Scratchpad,
{
    /// Takes ownership of the pipeline's resources. An unsound
    /// `configuration` is accepted here but fails every integrity check.
    pub fn new(gateway: G, hint: H, scratchpad: S, configuration: Configuration) -> Self {
        Self {
            reader: Reader::new(gateway, configuration.budget.gateway_polls),
            hint,
            scratchpad,
            signature: SignatureSlot::new(),
            layout: configuration.layout,
            sound: configuration.is_sound(),
        }
    }

    /// Locates and validates the image, then arms the scratchpad to serve it.
    pub fn check_integrity(&mut self) -> Result<Session<'_, G, H, S, SIGNATURE>, Error> {
        if !self.sound {
            error!("Refusing to authenticate with an unsound configuration");
            return Err(Error::ConfigurationError("Unsound flash layout or poll budget"));
        }
        let image = discover(&mut self.reader, &mut self.hint, &self.layout)
            .and_then(|image| self.scratchpad.arm(&image).map(|_| image))
            .map_err(|e| {
                warn!("Integrity check failed: {:?}", e);
                e
            })?;
        Ok(Session { authenticator: self, image, signature_served: false })
    }

    pub fn release(self) -> (G, H, S) { (self.reader.release(), self.hint, self.scratchpad) }
}

impl<'a, G, H, S, const SIGNATURE: usize> Session<'a, G, H, S, SIGNATURE>
where
    G: Flash,
    H: BootHint,
    S: Scratchpad,
{
    pub fn image(&self) -> &ImageDescriptor { &self.image }

    /// Bytes of authenticated content, excluding the signature.
    pub fn image_length(&self) -> usize { self.image.length() as usize }

    /// Returns the signature blob. Served once per session.
    pub fn get_hash_param(&mut self) -> Result<&[u8], Error> {
        if self.signature_served {
            return Err(Error::HashParamConsumed);
        }
        let Authenticator { reader, signature, .. } = &mut *self.authenticator;
        match signature.load(reader, self.image.signature()) {
            Ok(blob) => {
                self.signature_served = true;
                Ok(blob)
            }
            Err(e) => {
                warn!("Signature unavailable: {:?}", e);
                Err(e)
            }
        }
    }

    /// Returns masked data chunk `index`.
    pub fn get_data_param(&mut self, index: usize) -> Result<&[u8], Error> {
        let Authenticator { reader, scratchpad, .. } = &mut *self.authenticator;
        scratchpad.next_chunk(reader, index)
    }
}

impl<'a, G, H, S, const SIGNATURE: usize> Drop for Session<'a, G, H, S, SIGNATURE>
where
    G: Flash,
    H: BootHint,
    S: Scratchpad,
{
    fn drop(&mut self) { self.authenticator.scratchpad.disarm() }
}
