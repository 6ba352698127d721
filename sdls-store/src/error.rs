use std::error::Error;
use std::fmt;

/// Stable error taxonomy for SA-store, key-ring, and managed-parameter
/// operations, matching the integer taxonomy spec'd for the facade (see
/// `sdls-core::error::SdlsError::code`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    SaNotFound { spi: u16 },
    NoOperationalSa,
    InvalidTransition { from: &'static str, to: &'static str },
    Duplicate { spi: u16 },
    StoreUnavailable(String),
    KeyNotFound { id: u16 },
    KeyStateInvalid { id: u16, state: &'static str },
    ManagedParamNotFound,
    ManagedParamDuplicate,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SaNotFound { spi } => write!(f, "no SA with spi {spi}"),
            StoreError::NoOperationalSa => write!(f, "no operational SA for requested channel"),
            StoreError::InvalidTransition { from, to } => {
                write!(f, "invalid SA state transition {from} -> {to}")
            }
            StoreError::Duplicate { spi } => write!(f, "spi {spi} already exists"),
            StoreError::StoreUnavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::KeyNotFound { id } => write!(f, "no key with id {id}"),
            StoreError::KeyStateInvalid { id, state } => {
                write!(f, "key {id} is {state}, not usable here")
            }
            StoreError::ManagedParamNotFound => write!(f, "no managed parameter for gvcid"),
            StoreError::ManagedParamDuplicate => {
                write!(f, "managed parameter already registered for (tfvn, scid, vcid)")
            }
        }
    }
}

impl Error for StoreError {}
