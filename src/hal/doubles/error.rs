use crate::error::{Convertible, Error};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FakeError;

impl Convertible for FakeError {
    fn into(self) -> Error { Error::GatewayFault }
}
